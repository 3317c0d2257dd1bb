//! In-memory backend.
//!
//! Holds a configuration that callers replace through a [`MemoryHandle`].
//! Used for programmatic configuration and to drive watch loops in tests.

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::dynamic::Configuration;
use crate::provider::{Backend, ChangeSignal, ChangeStream, ProviderError};

#[derive(Debug, Default)]
struct State {
    configuration: Configuration,
    subscriber: Option<mpsc::Sender<ChangeSignal>>,
    failing_observes: u32,
    observe_count: u32,
    snapshot_count: u32,
}

/// Backend whose state lives in process memory.
#[derive(Debug)]
pub struct MemoryBackend {
    name: String,
    namespace: Option<String>,
    state: Arc<Mutex<State>>,
}

/// Cloneable handle for mutating a [`MemoryBackend`] from outside its loop.
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>, initial: Configuration) -> Self {
        let state = State {
            configuration: initial,
            ..Default::default()
        };
        Self {
            name: name.into(),
            namespace: None,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            state: self.state.clone(),
        }
    }
}

impl MemoryHandle {
    /// Replace the configuration and signal a change.
    pub fn set(&self, configuration: Configuration) {
        let mut state = self.state.lock().expect("memory backend mutex poisoned");
        state.configuration = configuration;
        Self::signal(&state, Ok(()));
    }

    /// Signal a change without touching the configuration.
    pub fn notify(&self) {
        let state = self.state.lock().expect("memory backend mutex poisoned");
        Self::signal(&state, Ok(()));
    }

    /// Report a failure on the current change stream.
    pub fn break_stream(&self, reason: &str) {
        let state = self.state.lock().expect("memory backend mutex poisoned");
        Self::signal(&state, Err(ProviderError::Watch(reason.to_string())));
    }

    /// Close the current change stream.
    pub fn disconnect(&self) {
        let mut state = self.state.lock().expect("memory backend mutex poisoned");
        state.subscriber = None;
    }

    /// Make the next `count` subscription attempts fail.
    pub fn fail_next_observe(&self, count: u32) {
        let mut state = self.state.lock().expect("memory backend mutex poisoned");
        state.failing_observes = count;
    }

    pub fn observe_count(&self) -> u32 {
        self.state.lock().expect("memory backend mutex poisoned").observe_count
    }

    pub fn snapshot_count(&self) -> u32 {
        self.state.lock().expect("memory backend mutex poisoned").snapshot_count
    }

    fn signal(state: &State, signal: ChangeSignal) {
        if let Some(subscriber) = &state.subscriber {
            // A full channel already holds a pending signal.
            let _ = subscriber.try_send(signal);
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    async fn observe(&mut self) -> Result<ChangeStream, ProviderError> {
        let mut state = self.state.lock().expect("memory backend mutex poisoned");
        state.observe_count += 1;

        if state.failing_observes > 0 {
            state.failing_observes -= 1;
            return Err(ProviderError::Unavailable(format!("{} is not reachable", self.name)));
        }

        let (tx, rx) = mpsc::channel(1);
        state.subscriber = Some(tx);
        Ok(ChangeStream::new(rx))
    }

    async fn snapshot(&mut self) -> Result<Configuration, ProviderError> {
        let mut state = self.state.lock().expect("memory backend mutex poisoned");
        state.snapshot_count += 1;
        Ok(state.configuration.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::http::Router;

    #[tokio::test]
    async fn test_snapshot_returns_current_configuration() {
        let mut backend = MemoryBackend::new("mem", Configuration::default());
        let handle = backend.handle();

        let mut config = Configuration::default();
        config.http_mut().routers.insert("r1".into(), Router::default());
        handle.set(config.clone());

        assert_eq!(backend.snapshot().await.unwrap(), config);
        assert_eq!(handle.snapshot_count(), 1);
    }

    #[tokio::test]
    async fn test_signals_collapse_into_one_pending() {
        let mut backend = MemoryBackend::new("mem", Configuration::default());
        let handle = backend.handle();
        let mut stream = backend.observe().await.unwrap();

        handle.notify();
        handle.notify();
        handle.notify();

        assert!(stream.next().await.unwrap().is_ok());
        handle.disconnect();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_failing_observes() {
        let mut backend = MemoryBackend::new("mem", Configuration::default());
        backend.handle().fail_next_observe(2);

        assert!(matches!(backend.observe().await, Err(ProviderError::Unavailable(_))));
        assert!(backend.observe().await.is_err());
        assert!(backend.observe().await.is_ok());
        assert_eq!(backend.handle().observe_count(), 3);
    }

    #[tokio::test]
    async fn test_break_stream_reports_error() {
        let mut backend = MemoryBackend::new("mem", Configuration::default());
        let handle = backend.handle();
        let mut stream = backend.observe().await.unwrap();

        handle.break_stream("lost lease");
        assert!(matches!(stream.next().await, Some(Err(ProviderError::Watch(_)))));
    }

    #[test]
    fn test_provider_name_includes_namespace() {
        let backend = MemoryBackend::new("mem", Configuration::default());
        assert_eq!(backend.provider_name(), "mem");

        let backend = backend.with_namespace("blue");
        assert_eq!(backend.provider_name(), "mem@blue");
    }
}
