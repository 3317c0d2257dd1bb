//! Provider watch loop.
//!
//! # Responsibilities
//! - Connect to a backend, retrying with backoff while it is unavailable
//! - Back off a stream that keeps breaking; reset only after it stays healthy
//! - Turn bursts of change signals into one recomputation per throttle window
//! - Emit a snapshot only when its content changed
//! - Stop promptly on shutdown at every await point

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};

use crate::config::schema::BackoffConfig;
use crate::config::ProvidersConfig;
use crate::observability::metrics;
use crate::provider::{Backend, ChangeStream, ProviderError, ProviderMessage};
use crate::resilience::backoff::Backoff;

/// Timing settings of a watch loop.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Window over which change signals are collapsed (zero disables).
    pub throttle: Duration,
    /// Reconnect backoff, stream error delay and reset interval.
    pub backoff: BackoffConfig,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self::from(&ProvidersConfig::default())
    }
}

impl From<&ProvidersConfig> for WatchSettings {
    fn from(config: &ProvidersConfig) -> Self {
        Self {
            throttle: config.throttle(),
            backoff: config.backoff.clone(),
        }
    }
}

/// Drives one backend and pushes its snapshots to the aggregator.
pub struct WatchLoop {
    backend: Box<dyn Backend>,
    settings: WatchSettings,
}

impl WatchLoop {
    pub fn new(backend: Box<dyn Backend>, settings: WatchSettings) -> Self {
        Self { backend, settings }
    }

    pub fn provider_name(&self) -> String {
        self.backend.provider_name()
    }

    /// Run until `shutdown` fires.
    ///
    /// Returns `Ok(())` on shutdown and `Err(ProviderError::Closed)` if the
    /// aggregator stopped listening.
    pub async fn provide(
        self,
        output: mpsc::Sender<ProviderMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ProviderError> {
        let mut runner = Runner {
            name: self.backend.provider_name(),
            backoff: Backoff::from(&self.settings.backoff),
            backend: self.backend,
            settings: self.settings,
            output,
            shutdown,
            last_fingerprint: None,
            connected_at: None,
            detached: false,
        };
        runner.run().await
    }
}

enum WatchState {
    Connecting,
    Watching(ChangeStream),
    Throttling(ChangeStream),
    Error,
    Stopped,
}

enum Refresh {
    Emitted,
    Unchanged,
    Failed,
    Stopped,
}

struct Runner {
    name: String,
    backend: Box<dyn Backend>,
    settings: WatchSettings,
    backoff: Backoff,
    output: mpsc::Sender<ProviderMessage>,
    shutdown: broadcast::Receiver<()>,
    last_fingerprint: Option<String>,
    connected_at: Option<Instant>,
    detached: bool,
}

impl Runner {
    async fn run(&mut self) -> Result<(), ProviderError> {
        tracing::info!(provider = %self.name, "Provider watch loop starting");

        let mut state = WatchState::Connecting;
        loop {
            state = match state {
                WatchState::Connecting => self.connect().await,
                WatchState::Watching(stream) => self.watch(stream).await,
                WatchState::Throttling(stream) => self.throttle(stream).await,
                WatchState::Error => self.recover().await,
                WatchState::Stopped => break,
            };
        }

        if self.detached {
            tracing::warn!(
                provider = %self.name,
                "Aggregator channel closed, provider watch loop exiting"
            );
            return Err(ProviderError::Closed);
        }
        tracing::info!(provider = %self.name, "Provider watch loop stopped");
        Ok(())
    }

    async fn connect(&mut self) -> WatchState {
        loop {
            let observed = tokio::select! {
                result = self.backend.observe() => result,
                _ = self.shutdown.recv() => return WatchState::Stopped,
            };

            match observed {
                Ok(stream) => {
                    tracing::info!(provider = %self.name, "Provider connected");
                    self.connected_at = Some(Instant::now());
                    return match self.refresh().await {
                        Refresh::Stopped => WatchState::Stopped,
                        _ => WatchState::Watching(stream),
                    };
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        provider = %self.name,
                        error = %e,
                        attempt = self.backoff.attempt(),
                        delay = ?delay,
                        "Provider unavailable, retrying"
                    );
                    metrics::record_reconnect(&self.name);
                    if !self.pause(delay).await {
                        return WatchState::Stopped;
                    }
                }
            }
        }
    }

    async fn watch(&mut self, mut stream: ChangeStream) -> WatchState {
        tokio::select! {
            _ = self.shutdown.recv() => WatchState::Stopped,
            signal = stream.next() => match signal {
                Some(Ok(())) => WatchState::Throttling(stream),
                Some(Err(e)) => {
                    tracing::warn!(provider = %self.name, error = %e, "Change stream failed");
                    WatchState::Error
                }
                None => {
                    tracing::warn!(provider = %self.name, "Change stream closed");
                    WatchState::Error
                }
            },
        }
    }

    /// Collapse signals until the window elapses, then recompute once.
    async fn throttle(&mut self, mut stream: ChangeStream) -> WatchState {
        let mut broken = false;

        if !self.settings.throttle.is_zero() {
            let window = time::sleep(self.settings.throttle);
            tokio::pin!(window);
            let mut collapsed = 0u32;

            loop {
                tokio::select! {
                    _ = &mut window => break,
                    _ = self.shutdown.recv() => return WatchState::Stopped,
                    signal = stream.next() => match signal {
                        Some(Ok(())) => collapsed += 1,
                        Some(Err(e)) => {
                            tracing::warn!(
                                provider = %self.name,
                                error = %e,
                                "Change stream failed"
                            );
                            broken = true;
                            break;
                        }
                        None => {
                            tracing::warn!(provider = %self.name, "Change stream closed");
                            broken = true;
                            break;
                        }
                    },
                }
            }

            if collapsed > 0 {
                tracing::debug!(provider = %self.name, collapsed, "Collapsed change signals");
            }
        }

        match self.refresh().await {
            Refresh::Stopped => WatchState::Stopped,
            _ if broken => WatchState::Error,
            _ => WatchState::Watching(stream),
        }
    }

    /// Wait before reconnecting a broken stream.
    ///
    /// The wait grows with consecutive failures unless the connection that
    /// just broke had stayed up for the stable interval.
    async fn recover(&mut self) -> WatchState {
        let healthy_for = self.connected_at.take().map(|since| since.elapsed());
        if healthy_for.is_some_and(|up| up >= self.settings.backoff.stable_interval()) {
            self.backoff.reset();
        }

        let delay = self.settings.backoff.reconnect_delay().max(self.backoff.next_delay());
        tracing::warn!(
            provider = %self.name,
            attempt = self.backoff.attempt(),
            delay = ?delay,
            "Reconnecting provider"
        );
        metrics::record_reconnect(&self.name);

        if self.pause(delay).await {
            WatchState::Connecting
        } else {
            WatchState::Stopped
        }
    }

    /// Take a snapshot and emit it if its content changed.
    async fn refresh(&mut self) -> Refresh {
        let snapshot = tokio::select! {
            result = self.backend.snapshot() => result,
            _ = self.shutdown.recv() => return Refresh::Stopped,
        };

        let configuration = match snapshot {
            Ok(configuration) => configuration,
            Err(e) => {
                tracing::warn!(
                    provider = %self.name,
                    error = %e,
                    "Failed to build snapshot, keeping previous configuration"
                );
                return Refresh::Failed;
            }
        };

        let fingerprint = configuration.fingerprint();
        if self.last_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            tracing::debug!(provider = %self.name, "Snapshot unchanged, skipping");
            metrics::record_snapshot_suppressed(&self.name);
            return Refresh::Unchanged;
        }

        let resources = configuration.resource_count();
        let message = ProviderMessage {
            provider_name: self.name.clone(),
            configuration,
        };
        tokio::select! {
            sent = self.output.send(message) => {
                if sent.is_err() {
                    self.detached = true;
                    return Refresh::Stopped;
                }
            }
            _ = self.shutdown.recv() => return Refresh::Stopped,
        }

        tracing::debug!(
            provider = %self.name,
            resources,
            fingerprint = %fingerprint,
            "Snapshot emitted"
        );
        metrics::record_snapshot_emitted(&self.name);
        self.last_fingerprint = Some(fingerprint);
        Refresh::Emitted
    }

    /// Sleep unless shutdown fires first. Returns false on shutdown.
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = time::sleep(delay) => true,
            _ = self.shutdown.recv() => false,
        }
    }
}
