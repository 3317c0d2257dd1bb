//! Shared utilities for integration tests.

use std::future::Future;
use std::time::Duration;

use provider_aggregator::config::ControlPlaneConfig;
use provider_aggregator::dynamic::http::{Router, Service};
use provider_aggregator::dynamic::Configuration;

/// A configuration holding a single HTTP router.
pub fn router_config(name: &str, rule: &str, service: &str) -> Configuration {
    let mut config = Configuration::default();
    config.http_mut().routers.insert(
        name.into(),
        Router {
            rule: rule.into(),
            service: service.into(),
            ..Default::default()
        },
    );
    config
}

/// A configuration holding a single load-balanced HTTP service.
#[allow(dead_code)]
pub fn service_config(name: &str, urls: &[&str]) -> Configuration {
    let mut config = Configuration::default();
    config.http_mut().services.insert(name.into(), Service::with_servers(urls));
    config
}

/// Control plane settings tuned for fast tests.
#[allow(dead_code)]
pub fn fast_config() -> ControlPlaneConfig {
    let mut config = ControlPlaneConfig::default();
    config.providers.throttle_ms = 50;
    config.providers.backoff.base_delay_ms = 20;
    config.providers.backoff.max_delay_ms = 200;
    config.providers.backoff.reconnect_delay_ms = 50;
    config
}

/// Poll `check` until it holds or `timeout` elapses.
#[allow(dead_code)]
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
