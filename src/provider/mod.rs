//! Provider subsystem.
//!
//! # Data Flow
//! ```text
//! Backend (file, memory, ...)
//!     → observe(): change-signal stream
//!     → watch.rs state machine:
//!         Connecting → Watching → Throttling → Watching ...
//!         stream error → Error → Connecting (backoff preserved)
//!         shutdown → Stopped
//!     → snapshot(): Configuration
//!     → fingerprint changed? → ProviderMessage on the aggregator channel
//! ```
//!
//! # Design Decisions
//! - One watch loop task per backend, no state shared between loops
//! - Change signals carry no payload; the loop always re-reads full state
//! - Signal channels hold at most one pending signal
//! - Each loop owns its last-emitted fingerprint

pub mod file;
pub mod memory;
pub mod watch;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::dynamic::Configuration;

pub use file::FileBackend;
pub use memory::{MemoryBackend, MemoryHandle};
pub use watch::{WatchLoop, WatchSettings};

/// Error type for backend operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Output channel closed")]
    Closed,
}

/// One change notification. `Err` means the stream itself failed.
pub type ChangeSignal = Result<(), ProviderError>;

/// A live subscription to a backend's change notifications.
///
/// Dropping the stream releases the underlying subscription.
pub struct ChangeStream {
    // Dropped before the subscription so a sender blocked on it is released.
    signals: mpsc::Receiver<ChangeSignal>,
    _subscription: Option<Box<dyn Send>>,
}

impl ChangeStream {
    pub fn new(signals: mpsc::Receiver<ChangeSignal>) -> Self {
        Self {
            signals,
            _subscription: None,
        }
    }

    /// A stream that keeps `subscription` alive until dropped.
    pub fn with_subscription<T>(signals: mpsc::Receiver<ChangeSignal>, subscription: T) -> Self
    where
        T: Send + 'static,
    {
        Self {
            signals,
            _subscription: Some(Box::new(subscription)),
        }
    }

    /// Next signal, or `None` once the backend closed the stream.
    pub async fn next(&mut self) -> Option<ChangeSignal> {
        self.signals.recv().await
    }
}

impl std::fmt::Debug for ChangeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStream")
            .field("subscribed", &self._subscription.is_some())
            .finish()
    }
}

/// A snapshot attributed to a provider.
#[derive(Debug, Clone)]
pub struct ProviderMessage {
    pub provider_name: String,
    pub configuration: Configuration,
}

/// A source of configuration snapshots.
#[async_trait]
pub trait Backend: Send {
    /// Stable name, used as the aggregation key.
    fn name(&self) -> &str;

    /// Slice of infrastructure this backend serves, if any.
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Name under which snapshots are aggregated (`name@namespace`).
    fn provider_name(&self) -> String {
        match self.namespace() {
            Some(namespace) => format!("{}@{}", self.name(), namespace),
            None => self.name().to_string(),
        }
    }

    /// One-time setup before the first watch loop runs.
    fn init(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Subscribe to change notifications.
    async fn observe(&mut self) -> Result<ChangeStream, ProviderError>;

    /// Build a configuration from current backend state.
    async fn snapshot(&mut self) -> Result<Configuration, ProviderError>;
}
