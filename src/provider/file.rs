//! File backend.
//!
//! Reads a dynamic configuration from a single file and watches it for
//! changes. Files ending in `.json` are parsed as JSON, anything else as TOML.
//!
//! The parent directory is watched instead of the file itself so that
//! editors and tools that replace the file by rename keep being observed.

use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::FileProviderConfig;
use crate::dynamic::Configuration;
use crate::provider::{Backend, ChangeSignal, ChangeStream, ProviderError};

/// Backend serving the content of one configuration file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    name: String,
    namespace: Option<String>,
    path: PathBuf,
}

impl FileBackend {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            path: path.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, err: &std::io::Error) -> ProviderError {
        ProviderError::Unavailable(format!("{}: {}", self.path.display(), err))
    }
}

impl From<&FileProviderConfig> for FileBackend {
    fn from(config: &FileProviderConfig) -> Self {
        let backend = Self::new(config.name.clone(), config.path.clone());
        match &config.namespace {
            Some(namespace) => backend.with_namespace(namespace.clone()),
            None => backend,
        }
    }
}

/// Parse a dynamic configuration, choosing the format from the file extension.
pub fn parse_configuration(path: &Path, content: &str) -> Result<Configuration, ProviderError> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(content).map_err(|e| ProviderError::Parse(e.to_string()))
    } else {
        toml::from_str(content).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// Turn one watcher callback into a change signal.
///
/// Runs on the watcher's own thread. A change is dropped while another is
/// still pending, but an error waits for room so the loop always sees it.
fn forward_event(
    tx: &mpsc::Sender<ChangeSignal>,
    file_name: Option<&OsStr>,
    res: notify::Result<Event>,
) {
    match res {
        Ok(event) => {
            let kind = event.kind;
            let relevant = kind.is_modify() || kind.is_create() || kind.is_remove();
            let ours = event.paths.iter().any(|p| p.file_name() == file_name);
            if relevant && ours {
                let _ = tx.try_send(Ok(()));
            }
        }
        Err(e) => {
            tracing::error!(error = ?e, "File watch error");
            let _ = tx.blocking_send(Err(ProviderError::Watch(e.to_string())));
        }
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    async fn observe(&mut self) -> Result<ChangeStream, ProviderError> {
        let path = match tokio::fs::canonicalize(&self.path).await {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.unavailable(&e)),
            Err(e) => return Err(e.into()),
        };
        let directory = path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ProviderError::Watch(format!("{} has no parent directory", path.display()))
        })?;
        let file_name: Option<OsString> = path.file_name().map(OsStr::to_os_string);

        let (tx, rx) = mpsc::channel::<ChangeSignal>(1);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| forward_event(&tx, file_name.as_deref(), res),
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| ProviderError::Watch(e.to_string()))?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| ProviderError::Watch(e.to_string()))?;

        tracing::info!(
            provider = %self.provider_name(),
            path = ?path,
            "File watcher started"
        );
        Ok(ChangeStream::with_subscription(rx, watcher))
    }

    async fn snapshot(&mut self) -> Result<Configuration, ProviderError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.unavailable(&e)),
            Err(e) => return Err(e.into()),
        };

        let configuration = parse_configuration(&self.path, &content)?;
        if configuration.is_empty() {
            tracing::warn!(
                provider = %self.provider_name(),
                path = ?self.path,
                "Configuration file defines no resources"
            );
        }
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use notify::EventKind;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    const TOML_CONFIG: &str = r#"
[http.routers.api]
rule = "Host(`api.example.com`)"
service = "api"

[http.services.api.load_balancer]
servers = [{ url = "http://10.0.0.1:8080" }]
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_snapshot_parses_toml() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "dynamic.toml", TOML_CONFIG);

        let mut backend = FileBackend::new("file", path);
        let config = backend.snapshot().await.unwrap();
        let http = config.http.unwrap();
        assert_eq!(http.routers["api"].service, "api");
        assert_eq!(
            http.services["api"].load_balancer.as_ref().unwrap().servers[0].url,
            "http://10.0.0.1:8080"
        );
    }

    #[tokio::test]
    async fn test_snapshot_parses_json() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        let body = r#"{"tcp": {"routers": {"db": {"rule": "HostSNI(`*`)", "service": "db"}}}}"#;
        file.write_all(body.as_bytes()).unwrap();

        let mut backend = FileBackend::new("file", file.path());
        let config = backend.snapshot().await.unwrap();
        assert_eq!(config.tcp.unwrap().routers["db"].service, "db");
        assert!(config.http.is_none());
    }

    #[tokio::test]
    async fn test_invalid_content_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.toml", "[http.routers.api\nrule = ");

        let mut backend = FileBackend::new("file", path);
        assert!(matches!(backend.snapshot().await, Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut backend = FileBackend::new("file", dir.path().join("absent.toml"));

        assert!(matches!(backend.snapshot().await, Err(ProviderError::Unavailable(_))));
        assert!(matches!(backend.observe().await, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_observe_signals_modification() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "dynamic.toml", TOML_CONFIG);

        let mut backend = FileBackend::new("file", path.clone());
        let mut stream = backend.observe().await.unwrap();

        std::fs::write(&path, TOML_CONFIG.replace("api.example.com", "www.example.com")).unwrap();

        let signal = tokio::time::timeout(Duration::from_secs(10), stream.next())
            .await
            .expect("no change signal received");
        assert!(matches!(signal, Some(Ok(()))));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_configuration() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.toml", "");

        let mut backend = FileBackend::new("file", path);
        assert!(backend.snapshot().await.unwrap().is_empty());
    }

    #[test]
    fn test_forward_event_filters_other_files() {
        let (tx, mut rx) = mpsc::channel(1);
        let name = OsString::from("dynamic.toml");

        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path("/etc/other.toml".into());
        forward_event(&tx, Some(&name), Ok(other));
        assert!(rx.try_recv().is_err());

        let access = Event::new(EventKind::Access(AccessKind::Any))
            .add_path("/etc/dynamic.toml".into());
        forward_event(&tx, Some(&name), Ok(access));
        assert!(rx.try_recv().is_err());

        let ours = Event::new(EventKind::Create(CreateKind::File))
            .add_path("/etc/dynamic.toml".into());
        forward_event(&tx, Some(&name), Ok(ours));
        assert!(matches!(rx.try_recv(), Ok(Ok(()))));
    }

    #[test]
    fn test_watch_error_waits_behind_pending_change() {
        let (tx, mut rx) = mpsc::channel(1);
        let name = OsString::from("dynamic.toml");

        let change = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path("/etc/dynamic.toml".into());
        forward_event(&tx, Some(&name), Ok(change));

        let watcher_thread = std::thread::spawn(move || {
            let err = notify::Error::generic("inotify queue overflow");
            forward_event(&tx, Some(&name), Err(err));
        });

        assert!(matches!(rx.blocking_recv(), Some(Ok(()))));
        assert!(matches!(rx.blocking_recv(), Some(Err(ProviderError::Watch(_)))));
        watcher_thread.join().unwrap();
    }

    #[test]
    fn test_from_provider_config() {
        let config = FileProviderConfig {
            name: "file".into(),
            path: "/etc/routes.toml".into(),
            namespace: Some("edge".into()),
        };
        let backend = FileBackend::from(&config);
        assert_eq!(backend.provider_name(), "file@edge");
        assert_eq!(backend.path(), Path::new("/etc/routes.toml"));
    }
}
