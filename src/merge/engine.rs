//! Merge engine.
//!
//! # Responsibilities
//! - Combine one configuration per provider into a single configuration
//! - Apply the resource strategy to duplicate keys
//! - Drop and report keys that cannot be reconciled

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::dynamic::{
    Configuration, HttpConfiguration, TcpConfiguration, TlsConfiguration, UdpConfiguration,
};
use crate::merge::resource::{try_merge, Resource};
use crate::merge::tracker::{Collection, Conflict, ConflictTracker};
use crate::merge::ResourceStrategy;
use crate::observability::metrics;

/// Merge provider configurations into one.
///
/// Conflicting keys are dropped and logged; see [`merge_with_conflicts`].
pub fn merge<S: BuildHasher>(
    configurations: &HashMap<String, Configuration, S>,
    strategy: ResourceStrategy,
) -> Configuration {
    merge_with_conflicts(configurations, strategy).0
}

/// Merge provider configurations and return the dropped keys alongside.
pub fn merge_with_conflicts<S: BuildHasher>(
    configurations: &HashMap<String, Configuration, S>,
    strategy: ResourceStrategy,
) -> (Configuration, Vec<Conflict>) {
    let mut providers: Vec<&String> = configurations.keys().collect();
    providers.sort();

    let mut merged = Configuration::empty();
    let mut pass = MergePass {
        strategy,
        tracker: ConflictTracker::new(),
    };

    for provider in providers {
        let source = &configurations[provider];
        if let Some(http) = &source.http {
            pass.merge_http(merged.http_mut(), provider, http);
        }
        if let Some(tcp) = &source.tcp {
            pass.merge_tcp(merged.tcp_mut(), provider, tcp);
        }
        if let Some(udp) = &source.udp {
            pass.merge_udp(merged.udp_mut(), provider, udp);
        }
        if let Some(tls) = &source.tls {
            pass.merge_tls(merged.tls_mut(), provider, tls);
        }
    }

    let conflicts = pass.tracker.resolve(&mut merged);
    metrics::record_merge(configurations.len(), merged.resource_count());

    tracing::debug!(
        providers = configurations.len(),
        resources = merged.resource_count(),
        conflicts = conflicts.len(),
        strategy = %strategy,
        "Merged provider configurations"
    );

    (merged, conflicts)
}

struct MergePass {
    strategy: ResourceStrategy,
    tracker: ConflictTracker,
}

impl MergePass {
    fn merge_http(
        &mut self,
        target: &mut HttpConfiguration,
        provider: &str,
        source: &HttpConfiguration,
    ) {
        self.collection(Collection::HttpRouters, &mut target.routers, provider, &source.routers);
        self.collection(Collection::HttpServices, &mut target.services, provider, &source.services);
        self.collection(
            Collection::HttpMiddlewares,
            &mut target.middlewares,
            provider,
            &source.middlewares,
        );
        self.collection(
            Collection::HttpServersTransports,
            &mut target.servers_transports,
            provider,
            &source.servers_transports,
        );
    }

    fn merge_tcp(
        &mut self,
        target: &mut TcpConfiguration,
        provider: &str,
        source: &TcpConfiguration,
    ) {
        self.collection(Collection::TcpRouters, &mut target.routers, provider, &source.routers);
        self.collection(Collection::TcpServices, &mut target.services, provider, &source.services);
        self.collection(
            Collection::TcpMiddlewares,
            &mut target.middlewares,
            provider,
            &source.middlewares,
        );
        self.collection(
            Collection::TcpServersTransports,
            &mut target.servers_transports,
            provider,
            &source.servers_transports,
        );
    }

    fn merge_udp(
        &mut self,
        target: &mut UdpConfiguration,
        provider: &str,
        source: &UdpConfiguration,
    ) {
        self.collection(Collection::UdpRouters, &mut target.routers, provider, &source.routers);
        self.collection(Collection::UdpServices, &mut target.services, provider, &source.services);
    }

    fn merge_tls(
        &mut self,
        target: &mut TlsConfiguration,
        provider: &str,
        source: &TlsConfiguration,
    ) {
        self.collection(
            Collection::TlsCertificates,
            &mut target.certificates,
            provider,
            &source.certificates,
        );
        self.collection(Collection::TlsOptions, &mut target.options, provider, &source.options);
        self.collection(Collection::TlsStores, &mut target.stores, provider, &source.stores);
    }

    fn collection<T: Resource>(
        &mut self,
        collection: Collection,
        target: &mut BTreeMap<String, T>,
        provider: &str,
        source: &BTreeMap<String, T>,
    ) {
        for (key, value) in source {
            self.tracker.record_origin(collection, key, provider);

            match target.entry(key.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(value.clone());
                }
                Entry::Occupied(mut entry) => match self.strategy {
                    ResourceStrategy::SkipDuplicates => {
                        tracing::debug!(
                            kind = collection.kind(),
                            key = %key,
                            provider = %provider,
                            "Duplicate resource skipped, keeping first definition"
                        );
                    }
                    ResourceStrategy::Merge => {
                        if !try_merge(entry.get_mut(), value) {
                            self.tracker.mark_conflict(collection, key);
                        }
                    }
                },
            }
        }
    }
}
