//! Aggregation of provider snapshots.
//!
//! # Data Flow
//! ```text
//! watch loops ──ProviderMessage──┐
//!                                ▼
//!               ConfigurationAggregator::run
//!                 → accept() (latest snapshot per provider)
//!                 → debounce window (optional)
//!                 → publish(): merge → fingerprint changed?
//!                 → ConfigurationSink::apply(Arc<Configuration>)
//! ```
//!
//! # Design Decisions
//! - The aggregator is the only caller of `merge`, so merges never race
//! - Each publish recomputes from all latest snapshots; nothing is incremental
//! - A provider that never reported contributes nothing

pub mod sink;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::config::schema::AggregatorConfig;
use crate::dynamic::Configuration;
use crate::merge::{merge_with_conflicts, Conflict, ResourceStrategy};
use crate::provider::ProviderMessage;

pub use sink::{ConfigurationSink, FileSink};

/// Collects provider snapshots and publishes their merge.
pub struct ConfigurationAggregator<S: ConfigurationSink> {
    strategy: ResourceStrategy,
    debounce: Duration,
    configurations: HashMap<String, Configuration>,
    last_fingerprint: Option<String>,
    last_conflicts: Vec<Conflict>,
    sink: S,
}

impl<S: ConfigurationSink> ConfigurationAggregator<S> {
    pub fn new(strategy: ResourceStrategy, sink: S) -> Self {
        Self {
            strategy,
            debounce: Duration::ZERO,
            configurations: HashMap::new(),
            last_fingerprint: None,
            last_conflicts: Vec::new(),
            sink,
        }
    }

    pub fn from_config(config: &AggregatorConfig, sink: S) -> Self {
        Self::new(config.strategy, sink).with_debounce(config.debounce())
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Record a provider snapshot. Returns false if it repeats the previous one.
    pub fn accept(&mut self, message: ProviderMessage) -> bool {
        if self.configurations.get(&message.provider_name) == Some(&message.configuration) {
            tracing::debug!(provider = %message.provider_name, "Ignoring repeated snapshot");
            return false;
        }
        tracing::debug!(
            provider = %message.provider_name,
            resources = message.configuration.resource_count(),
            "Provider snapshot accepted"
        );
        self.configurations.insert(message.provider_name, message.configuration);
        true
    }

    /// Forget a provider. Returns false if it was unknown.
    pub fn remove(&mut self, provider_name: &str) -> bool {
        self.configurations.remove(provider_name).is_some()
    }

    pub fn provider_count(&self) -> usize {
        self.configurations.len()
    }

    /// Conflicts found by the most recent merge.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.last_conflicts
    }

    /// Merge all snapshots and hand the result to the sink if it changed.
    pub fn publish(&mut self) -> Option<Arc<Configuration>> {
        let (merged, conflicts) = merge_with_conflicts(&self.configurations, self.strategy);
        self.last_conflicts = conflicts;

        let fingerprint = merged.fingerprint();
        if self.last_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            tracing::debug!("Merged configuration unchanged, not publishing");
            return None;
        }

        tracing::info!(
            providers = self.configurations.len(),
            resources = merged.resource_count(),
            conflicts = self.last_conflicts.len(),
            "Publishing merged configuration"
        );
        let merged = Arc::new(merged);
        self.sink.apply(merged.clone());
        self.last_fingerprint = Some(fingerprint);
        Some(merged)
    }

    /// Fan-in loop. Ends on shutdown or once every sender is gone.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<ProviderMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(strategy = %self.strategy, debounce = ?self.debounce, "Aggregator started");

        loop {
            let message = tokio::select! {
                _ = shutdown.recv() => break,
                message = input.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            let mut changed = self.accept(message);

            if !self.debounce.is_zero() {
                let window = time::sleep(self.debounce);
                tokio::pin!(window);
                loop {
                    tokio::select! {
                        _ = &mut window => break,
                        _ = shutdown.recv() => {
                            tracing::info!("Aggregator stopped");
                            return;
                        }
                        message = input.recv() => match message {
                            Some(message) => changed |= self.accept(message),
                            None => break,
                        },
                    }
                }
            }

            if changed {
                self.publish();
            }
        }

        tracing::info!("Aggregator stopped");
    }
}
