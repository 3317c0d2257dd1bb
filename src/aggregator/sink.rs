//! Destinations for merged configurations.

use std::path::PathBuf;
use std::sync::Arc;
use arc_swap::ArcSwap;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

use crate::dynamic::Configuration;

/// Receives every merged configuration the aggregator publishes.
pub trait ConfigurationSink: Send {
    fn apply(&mut self, configuration: Arc<Configuration>);
}

/// Atomically swapped current configuration, read lock-free by consumers.
impl ConfigurationSink for Arc<ArcSwap<Configuration>> {
    fn apply(&mut self, configuration: Arc<Configuration>) {
        self.store(configuration);
    }
}

impl ConfigurationSink for mpsc::UnboundedSender<Arc<Configuration>> {
    fn apply(&mut self, configuration: Arc<Configuration>) {
        if self.send(configuration).is_err() {
            tracing::debug!("Configuration receiver dropped");
        }
    }
}

impl<T: ConfigurationSink> ConfigurationSink for Option<T> {
    fn apply(&mut self, configuration: Arc<Configuration>) {
        if let Some(sink) = self {
            sink.apply(configuration);
        }
    }
}

impl<A: ConfigurationSink, B: ConfigurationSink> ConfigurationSink for (A, B) {
    fn apply(&mut self, configuration: Arc<Configuration>) {
        self.0.apply(configuration.clone());
        self.1.apply(configuration);
    }
}

/// Writes each merged configuration to a JSON file.
///
/// The file is replaced by rename so readers never observe a partial write.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn write(&self, configuration: &Configuration) -> std::io::Result<()> {
        let body = serde_json::to_vec_pretty(configuration)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl ConfigurationSink for FileSink {
    /// Writes synchronously so the file is current once `apply` returns.
    /// On a multi-threaded runtime the worker hands its other tasks off first.
    fn apply(&mut self, configuration: Arc<Configuration>) {
        let on_worker = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        let result = if on_worker {
            tokio::task::block_in_place(|| self.write(&configuration))
        } else {
            self.write(&configuration)
        };

        match result {
            Ok(()) => tracing::debug!(path = ?self.path, "Merged configuration written"),
            Err(e) => tracing::error!(
                path = ?self.path,
                error = %e,
                "Failed to write merged configuration"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::http::Router;
    use tempfile::TempDir;

    fn sample() -> Arc<Configuration> {
        let mut config = Configuration::empty();
        config.http_mut().routers.insert("r1".into(), Router::default());
        Arc::new(config)
    }

    #[test]
    fn test_arc_swap_sink_stores() {
        let current = Arc::new(ArcSwap::from_pointee(Configuration::empty()));
        let mut sink = current.clone();
        sink.apply(sample());
        assert_eq!(current.load().resource_count(), 1);
    }

    #[test]
    fn test_tuple_sink_fans_out() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let current = Arc::new(ArcSwap::from_pointee(Configuration::empty()));
        let mut sink = (current.clone(), Some(tx));

        sink.apply(sample());
        assert_eq!(current.load().resource_count(), 1);
        assert_eq!(rx.try_recv().unwrap().resource_count(), 1);
    }

    #[test]
    fn test_file_sink_writes_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged.json");
        let mut sink = FileSink::new(&path);

        sink.apply(sample());

        let written: Configuration =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, *sample());
        assert!(!dir.path().join("merged.json.tmp").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_sink_on_multi_thread_runtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged.json");
        let mut sink = FileSink::new(&path);

        sink.apply(sample());
        sink.apply(Arc::new(Configuration::empty()));

        let written: Configuration =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn test_file_sink_on_current_thread_runtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged.json");
        let mut sink = FileSink::new(&path);

        sink.apply(sample());
        assert!(path.exists());
    }
}
