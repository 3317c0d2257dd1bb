//! Startup orchestration.
//!
//! # Responsibilities
//! - Build backends from the validated configuration
//! - Initialize each backend once, in declaration order
//! - Spawn one watch loop per backend and the aggregator behind them
//! - Join everything after shutdown
//!
//! # Design Decisions
//! - Fail fast: a backend that cannot initialize is fatal
//! - Every task subscribes to shutdown before it is spawned, so a trigger
//!   issued right after `start` returns is never missed
//! - The live configuration is an `ArcSwap` readers load without locking

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::aggregator::{ConfigurationAggregator, ConfigurationSink, FileSink};
use crate::config::ControlPlaneConfig;
use crate::dynamic::Configuration;
use crate::lifecycle::Shutdown;
use crate::merge::{merge, ResourceStrategy};
use crate::provider::{Backend, FileBackend, ProviderError, WatchLoop, WatchSettings};

/// Error raised while bringing providers up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Provider '{name}' failed to initialize: {source}")]
    Init { name: String, source: ProviderError },

    #[error("Provider '{name}' failed to produce a snapshot: {source}")]
    Snapshot { name: String, source: ProviderError },

    #[error("Provider '{0}' is registered more than once")]
    DuplicateProvider(String),
}

/// Assembles providers and the aggregator from static configuration.
pub struct ControlPlane {
    config: ControlPlaneConfig,
    current: Arc<ArcSwap<Configuration>>,
}

impl ControlPlane {
    pub fn new(config: ControlPlaneConfig) -> Self {
        Self {
            config,
            current: Arc::new(ArcSwap::from_pointee(Configuration::empty())),
        }
    }

    /// Live merged configuration.
    pub fn current(&self) -> Arc<ArcSwap<Configuration>> {
        self.current.clone()
    }

    /// Backends declared in the configuration file.
    pub fn backends_from_config(config: &ControlPlaneConfig) -> Vec<Box<dyn Backend>> {
        config
            .providers
            .file
            .iter()
            .map(|file| Box::new(FileBackend::from(file)) as Box<dyn Backend>)
            .collect()
    }

    /// Start with the configured outputs only.
    pub fn start(
        self,
        backends: Vec<Box<dyn Backend>>,
        shutdown: &Shutdown,
    ) -> Result<RunningControlPlane, StartupError> {
        self.start_with_sink(backends, None::<FileSink>, shutdown)
    }

    /// Start and additionally publish every merged configuration to `sink`.
    pub fn start_with_sink<S>(
        self,
        mut backends: Vec<Box<dyn Backend>>,
        sink: S,
        shutdown: &Shutdown,
    ) -> Result<RunningControlPlane, StartupError>
    where
        S: ConfigurationSink + 'static,
    {
        init_backends(&mut backends)?;

        let file_sink = self.config.output.path.as_ref().map(|path| FileSink::new(path));
        let sinks = (self.current.clone(), (file_sink, sink));
        let aggregator = ConfigurationAggregator::from_config(&self.config.aggregator, sinks);

        let (tx, rx) = mpsc::channel(self.config.aggregator.channel_capacity);
        let settings = WatchSettings::from(&self.config.providers);

        let mut providers = JoinSet::new();
        for backend in backends {
            let watch = WatchLoop::new(backend, settings.clone());
            let name = watch.provider_name();
            let output = tx.clone();
            let shutdown_rx = shutdown.subscribe();
            providers.spawn(async move { (name, watch.provide(output, shutdown_rx).await) });
        }
        drop(tx);

        let aggregator = tokio::spawn(aggregator.run(rx, shutdown.subscribe()));

        tracing::info!(providers = providers.len(), "Control plane started");
        Ok(RunningControlPlane {
            current: self.current,
            providers,
            aggregator,
        })
    }
}

/// Handle to a started control plane.
pub struct RunningControlPlane {
    current: Arc<ArcSwap<Configuration>>,
    providers: JoinSet<(String, Result<(), ProviderError>)>,
    aggregator: JoinHandle<()>,
}

impl RunningControlPlane {
    pub fn current(&self) -> Arc<ArcSwap<Configuration>> {
        self.current.clone()
    }

    /// Wait for every task to finish. Call after triggering shutdown.
    pub async fn wait(mut self) {
        while let Some(joined) = self.providers.join_next().await {
            match joined {
                Ok((name, Ok(()))) => tracing::debug!(provider = %name, "Provider stopped"),
                Ok((name, Err(e))) => {
                    tracing::warn!(provider = %name, error = %e, "Provider exited with error")
                }
                Err(e) => tracing::error!(error = %e, "Provider task panicked"),
            }
        }

        if let Err(e) = self.aggregator.await {
            tracing::error!(error = %e, "Aggregator task panicked");
        }
        tracing::info!("Control plane stopped");
    }
}

/// Take one snapshot from every backend and merge them, without watching.
pub async fn snapshot_once(
    mut backends: Vec<Box<dyn Backend>>,
    strategy: ResourceStrategy,
) -> Result<Configuration, StartupError> {
    init_backends(&mut backends)?;

    let mut configurations = HashMap::new();
    for backend in backends.iter_mut() {
        let name = backend.provider_name();
        let configuration = backend
            .snapshot()
            .await
            .map_err(|source| StartupError::Snapshot { name: name.clone(), source })?;
        configurations.insert(name, configuration);
    }

    Ok(merge(&configurations, strategy))
}

fn init_backends(backends: &mut [Box<dyn Backend>]) -> Result<(), StartupError> {
    let mut seen = HashSet::new();
    for backend in backends.iter_mut() {
        let name = backend.provider_name();
        if !seen.insert(name.clone()) {
            return Err(StartupError::DuplicateProvider(name));
        }
        backend.init().map_err(|source| StartupError::Init { name: name.clone(), source })?;
        tracing::debug!(provider = %name, "Provider initialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileProviderConfig;
    use crate::dynamic::http::Router;
    use crate::provider::MemoryBackend;

    fn with_router(name: &str) -> Configuration {
        let mut config = Configuration::default();
        config.http_mut().routers.insert(name.into(), Router::default());
        config
    }

    #[test]
    fn test_backends_from_config() {
        let mut config = ControlPlaneConfig::default();
        config.providers.file.push(FileProviderConfig {
            name: "file".into(),
            path: "/tmp/a.toml".into(),
            namespace: Some("ns".into()),
        });

        let backends = ControlPlane::backends_from_config(&config);
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].provider_name(), "file@ns");
    }

    #[tokio::test]
    async fn test_snapshot_once_merges() {
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(MemoryBackend::new("a", with_router("r1"))),
            Box::new(MemoryBackend::new("b", with_router("r2"))),
        ];

        let merged = snapshot_once(backends, ResourceStrategy::Merge).await.unwrap();
        assert_eq!(merged.http.unwrap().routers.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_provider_rejected() {
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(MemoryBackend::new("a", with_router("r1"))),
            Box::new(MemoryBackend::new("a", with_router("r2"))),
        ];

        let result = snapshot_once(backends, ResourceStrategy::Merge).await;
        assert!(matches!(result, Err(StartupError::DuplicateProvider(name)) if name == "a"));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut config = ControlPlaneConfig::default();
        config.providers.throttle_ms = 0;

        let shutdown = Shutdown::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backends: Vec<Box<dyn Backend>> =
            vec![Box::new(MemoryBackend::new("a", with_router("r1")))];

        let running = ControlPlane::new(config)
            .start_with_sink(backends, tx, &shutdown)
            .unwrap();
        let published = rx.recv().await.unwrap();
        assert_eq!(published.resource_count(), 1);
        assert_eq!(running.current().load().resource_count(), 1);

        shutdown.trigger();
        running.wait().await;
    }
}
