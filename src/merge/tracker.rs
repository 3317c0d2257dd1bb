//! Per-merge-pass conflict bookkeeping.
//!
//! # Responsibilities
//! - Remember which providers contributed each (collection, key)
//! - Remember which keys could not be reconciled
//! - At the end of the pass, delete those keys and report them
//!
//! # Design Decisions
//! - Built fresh for every merge call, never shared
//! - Keys are scoped by `Collection`, so equal names in different
//!   collections or planes never collide

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::dynamic::Configuration;
use crate::observability::metrics;

/// Every resource collection the merge engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    HttpRouters,
    HttpServices,
    HttpMiddlewares,
    HttpServersTransports,
    TcpRouters,
    TcpServices,
    TcpMiddlewares,
    TcpServersTransports,
    UdpRouters,
    UdpServices,
    TlsCertificates,
    TlsOptions,
    TlsStores,
}

impl Collection {
    /// Human-readable resource type name for diagnostics.
    pub fn kind(self) -> &'static str {
        match self {
            Collection::HttpRouters => "HTTP router",
            Collection::HttpServices => "HTTP service",
            Collection::HttpMiddlewares => "HTTP middleware",
            Collection::HttpServersTransports => "HTTP servers transport",
            Collection::TcpRouters => "TCP router",
            Collection::TcpServices => "TCP service",
            Collection::TcpMiddlewares => "TCP middleware",
            Collection::TcpServersTransports => "TCP servers transport",
            Collection::UdpRouters => "UDP router",
            Collection::UdpServices => "UDP service",
            Collection::TlsCertificates => "TLS certificate",
            Collection::TlsOptions => "TLS options",
            Collection::TlsStores => "TLS store",
        }
    }

    /// Remove `key` from this collection of `configuration`.
    pub fn remove(self, configuration: &mut Configuration, key: &str) -> bool {
        let Configuration { http, tcp, udp, tls } = configuration;
        match self {
            Collection::HttpRouters => {
                http.as_mut().map_or(false, |c| c.routers.remove(key).is_some())
            }
            Collection::HttpServices => {
                http.as_mut().map_or(false, |c| c.services.remove(key).is_some())
            }
            Collection::HttpMiddlewares => {
                http.as_mut().map_or(false, |c| c.middlewares.remove(key).is_some())
            }
            Collection::HttpServersTransports => {
                http.as_mut().map_or(false, |c| c.servers_transports.remove(key).is_some())
            }
            Collection::TcpRouters => {
                tcp.as_mut().map_or(false, |c| c.routers.remove(key).is_some())
            }
            Collection::TcpServices => {
                tcp.as_mut().map_or(false, |c| c.services.remove(key).is_some())
            }
            Collection::TcpMiddlewares => {
                tcp.as_mut().map_or(false, |c| c.middlewares.remove(key).is_some())
            }
            Collection::TcpServersTransports => {
                tcp.as_mut().map_or(false, |c| c.servers_transports.remove(key).is_some())
            }
            Collection::UdpRouters => {
                udp.as_mut().map_or(false, |c| c.routers.remove(key).is_some())
            }
            Collection::UdpServices => {
                udp.as_mut().map_or(false, |c| c.services.remove(key).is_some())
            }
            Collection::TlsCertificates => {
                tls.as_mut().map_or(false, |c| c.certificates.remove(key).is_some())
            }
            Collection::TlsOptions => {
                tls.as_mut().map_or(false, |c| c.options.remove(key).is_some())
            }
            Collection::TlsStores => tls.as_mut().map_or(false, |c| c.stores.remove(key).is_some()),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A key dropped from the merged output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub collection: Collection,
    pub key: String,
    /// Contributing providers, in merge order.
    pub providers: Vec<String>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' defined differently by providers [{}]",
            self.collection,
            self.key,
            self.providers.join(", ")
        )
    }
}

/// Origins and conflicts of one merge pass.
#[derive(Debug, Default)]
pub struct ConflictTracker {
    origins: HashMap<(Collection, String), Vec<String>>,
    to_delete: BTreeSet<(Collection, String)>,
}

impl ConflictTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that `provider` defines `key` in `collection`.
    pub fn record_origin(&mut self, collection: Collection, key: &str, provider: &str) {
        let providers = self
            .origins
            .entry((collection, key.to_string()))
            .or_default();
        if !providers.iter().any(|p| p == provider) {
            providers.push(provider.to_string());
        }
    }

    pub fn mark_conflict(&mut self, collection: Collection, key: &str) {
        self.to_delete.insert((collection, key.to_string()));
    }

    /// Delete every conflicted key from `merged` and report them.
    pub fn resolve(mut self, merged: &mut Configuration) -> Vec<Conflict> {
        let mut conflicts = Vec::with_capacity(self.to_delete.len());

        for (collection, key) in std::mem::take(&mut self.to_delete) {
            collection.remove(merged, &key);
            let providers = self.origins.remove(&(collection, key.clone())).unwrap_or_default();

            tracing::warn!(
                kind = collection.kind(),
                key = %key,
                providers = ?providers,
                "Resource defined differently by several providers, dropping it"
            );
            metrics::record_conflict(collection.kind());

            conflicts.push(Conflict {
                collection,
                key,
                providers,
            });
        }

        conflicts
    }
}
