//! End-to-end tests: backends → watch loops → aggregator → sinks.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use provider_aggregator::dynamic::Configuration;
use provider_aggregator::lifecycle::{ControlPlane, Shutdown};
use provider_aggregator::merge::ResourceStrategy;
use provider_aggregator::provider::{Backend, FileBackend, MemoryBackend};

mod common;

fn rule(config: &Configuration, router: &str) -> Option<String> {
    config
        .http
        .as_ref()
        .and_then(|http| http.routers.get(router))
        .map(|r| r.rule.clone())
}

/// Replace a file by rename so watchers never see it half written.
fn write_atomic(path: &Path, content: &str) {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content).unwrap();
    std::fs::rename(&tmp, path).unwrap();
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Arc<Configuration>>) -> Arc<Configuration> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a merged configuration")
        .expect("sink closed")
}

#[tokio::test]
async fn test_providers_are_merged() {
    let shutdown = Shutdown::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let backends: Vec<Box<dyn Backend>> = vec![
        Box::new(MemoryBackend::new("a", common::router_config("r1", "Host(`a`)", "svc"))),
        Box::new(MemoryBackend::new("b", common::service_config("svc", &["http://10.0.0.1"]))),
    ];

    let plane = ControlPlane::new(common::fast_config());
    let current = plane.current();
    let running = plane.start_with_sink(backends, tx, &shutdown).unwrap();

    let found = common::wait_for(Duration::from_secs(5), || {
        let current = current.clone();
        async move { current.load().resource_count() == 2 }
    })
    .await;
    assert!(found, "both providers should contribute");

    let merged = current.load_full();
    assert_eq!(rule(&merged, "r1").as_deref(), Some("Host(`a`)"));
    assert!(merged.http.as_ref().unwrap().services.contains_key("svc"));
    while rx.try_recv().is_ok() {}

    shutdown.trigger();
    running.wait().await;
}

#[tokio::test]
async fn test_conflict_drops_then_recovers() {
    let shutdown = Shutdown::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let a = MemoryBackend::new("a", common::router_config("r1", "RuleA", "svc"));
    let b = MemoryBackend::new("b", common::router_config("r1", "RuleB", "svc"));
    let b_handle = b.handle();

    let running = ControlPlane::new(common::fast_config())
        .start_with_sink(vec![Box::new(a), Box::new(b)], tx, &shutdown)
        .unwrap();

    // Wait until both providers reported and the router got dropped.
    loop {
        let merged = next(&mut rx).await;
        let routers = &merged.http.as_ref().unwrap().routers;
        if routers.is_empty() {
            break;
        }
    }

    b_handle.set(common::router_config("r1", "RuleA", "svc"));
    let merged = next(&mut rx).await;
    assert_eq!(rule(&merged, "r1").as_deref(), Some("RuleA"));

    shutdown.trigger();
    running.wait().await;
}

#[tokio::test]
async fn test_services_union_servers() {
    let shutdown = Shutdown::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let backends: Vec<Box<dyn Backend>> = vec![
        Box::new(MemoryBackend::new("a", common::service_config("svc", &["http://10.0.0.1"]))),
        Box::new(MemoryBackend::new("b", common::service_config("svc", &["http://10.0.0.2"]))),
    ];

    let plane = ControlPlane::new(common::fast_config());
    let current = plane.current();
    let running = plane.start_with_sink(backends, tx, &shutdown).unwrap();

    let found = common::wait_for(Duration::from_secs(5), || {
        let current = current.clone();
        async move {
            current
                .load()
                .http
                .as_ref()
                .and_then(|http| http.services.get("svc"))
                .and_then(|svc| svc.load_balancer.as_ref())
                .map(|lb| lb.servers.len() == 2)
                .unwrap_or(false)
        }
    })
    .await;
    assert!(found, "servers from both providers should be united");

    shutdown.trigger();
    running.wait().await;
}

#[tokio::test]
async fn test_skip_duplicates_keeps_first_provider() {
    let shutdown = Shutdown::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let backends: Vec<Box<dyn Backend>> = vec![
        Box::new(MemoryBackend::new("a", common::router_config("r1", "RuleA", "svc"))),
        Box::new(MemoryBackend::new("b", common::router_config("r1", "RuleB", "svc"))),
    ];

    let mut config = common::fast_config();
    config.aggregator.strategy = ResourceStrategy::SkipDuplicates;
    config.aggregator.debounce_ms = 200;
    let plane = ControlPlane::new(config);
    let current = plane.current();
    let running = plane.start_with_sink(backends, tx, &shutdown).unwrap();

    let found = common::wait_for(Duration::from_secs(5), || {
        let current = current.clone();
        async move { rule(&current.load(), "r1").as_deref() == Some("RuleA") }
    })
    .await;
    assert!(found);

    shutdown.trigger();
    running.wait().await;
}

#[tokio::test]
async fn test_file_provider_follows_edits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dynamic.toml");
    let body = "[http.routers.web]\nrule = \"Host(`old`)\"\nservice = \"web\"\n";
    std::fs::write(&path, body).unwrap();

    let output = dir.path().join("merged.json");
    let mut config = common::fast_config();
    config.output.path = Some(output.to_string_lossy().into_owned());

    let shutdown = Shutdown::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let backends: Vec<Box<dyn Backend>> = vec![Box::new(FileBackend::new("file", &path))];
    let running = ControlPlane::new(config).start_with_sink(backends, tx, &shutdown).unwrap();

    let merged = next(&mut rx).await;
    assert_eq!(rule(&merged, "web").as_deref(), Some("Host(`old`)"));

    write_atomic(&path, "[http.routers.web]\nrule = \"Host(`new`)\"\nservice = \"web\"\n");
    let merged = next(&mut rx).await;
    assert_eq!(rule(&merged, "web").as_deref(), Some("Host(`new`)"));

    let written: Configuration = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(rule(&written, "web").as_deref(), Some("Host(`new`)"));

    shutdown.trigger();
    running.wait().await;
}

#[tokio::test]
async fn test_file_provider_waits_for_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("late.json");

    let shutdown = Shutdown::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let backends: Vec<Box<dyn Backend>> = vec![Box::new(FileBackend::new("file", &path))];
    let running = ControlPlane::new(common::fast_config())
        .start_with_sink(backends, tx, &shutdown)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    write_atomic(&path, r#"{"http": {"routers": {"late": {"rule": "Path(`/late`)"}}}}"#);

    let merged = next(&mut rx).await;
    assert_eq!(rule(&merged, "late").as_deref(), Some("Path(`/late`)"));

    shutdown.trigger();
    running.wait().await;
}

#[tokio::test]
async fn test_shutdown_without_providers() {
    let shutdown = Shutdown::new();
    let running = ControlPlane::new(common::fast_config()).start(Vec::new(), &shutdown).unwrap();

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), running.wait())
        .await
        .expect("control plane should stop promptly");
}
