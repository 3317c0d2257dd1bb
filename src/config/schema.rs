//! Configuration schema definitions.
//!
//! This module defines the static configuration of the control plane: which
//! providers to run, how their watch loops retry and throttle, and how the
//! aggregator merges and publishes. All types derive Serde traits for
//! deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::merge::ResourceStrategy;

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Provider definitions and watch-loop settings.
    pub providers: ProvidersConfig,

    /// Merge and publish settings.
    pub aggregator: AggregatorConfig,

    /// Where the merged configuration is written.
    pub output: OutputConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Provider definitions and the settings shared by their watch loops.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Throttle window in milliseconds (0 disables throttling).
    pub throttle_ms: u64,

    /// Reconnect backoff.
    pub backoff: BackoffConfig,

    /// File-backed providers.
    pub file: Vec<FileProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 2000,
            backoff: BackoffConfig::default(),
            file: Vec::new(),
        }
    }
}

impl ProvidersConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Exponential backoff for reconnecting to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Minimum delay before reconnecting after a change stream breaks.
    pub reconnect_delay_ms: u64,

    /// A stream that stays healthy this long resets the backoff.
    pub stable_interval_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            reconnect_delay_ms: 1000,
            stable_interval_ms: 10_000,
        }
    }
}

impl BackoffConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn stable_interval(&self) -> Duration {
        Duration::from_millis(self.stable_interval_ms)
    }
}

/// A provider backed by a dynamic configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileProviderConfig {
    /// Provider name, used as the aggregation key.
    pub name: String,

    /// Path to the dynamic configuration file (`.json` or TOML).
    pub path: String,

    /// Optional namespace label appended to the provider name.
    #[serde(default)]
    pub namespace: Option<String>,
}

impl FileProviderConfig {
    /// Name under which this provider's snapshots are aggregated.
    pub fn provider_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}@{}", self.name, namespace),
            None => self.name.clone(),
        }
    }
}

/// Aggregator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Duplicate-key strategy.
    pub strategy: ResourceStrategy,

    /// Batch provider updates arriving within this window (0 disables).
    pub debounce_ms: u64,

    /// Capacity of the provider → aggregator channel.
    pub channel_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            strategy: ResourceStrategy::Merge,
            debounce_ms: 0,
            channel_capacity: 64,
        }
    }
}

impl AggregatorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Write each merged configuration as JSON to this path.
    pub path: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ControlPlaneConfig = toml::from_str("").unwrap();
        assert_eq!(config.providers.throttle(), Duration::from_secs(2));
        assert_eq!(config.aggregator.strategy, ResourceStrategy::Merge);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(config.output.path.is_none());
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            [providers]
            throttle_ms = 250

            [providers.backoff]
            base_delay_ms = 100
            max_delay_ms = 5000

            [[providers.file]]
            name = "edge"
            path = "/etc/proxy/edge.toml"
            namespace = "public"

            [[providers.file]]
            name = "internal"
            path = "/etc/proxy/internal.json"

            [aggregator]
            strategy = "skip_duplicates"
            debounce_ms = 50

            [observability]
            log_format = "json"
        "#;
        let config: ControlPlaneConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.providers.throttle_ms, 250);
        assert_eq!(config.providers.backoff.reconnect_delay_ms, 1000);
        assert_eq!(config.providers.backoff.stable_interval(), Duration::from_secs(10));
        assert_eq!(config.providers.file.len(), 2);
        assert_eq!(config.providers.file[0].provider_name(), "edge@public");
        assert_eq!(config.providers.file[1].provider_name(), "internal");
        assert_eq!(config.aggregator.strategy, ResourceStrategy::SkipDuplicates);
        assert_eq!(config.aggregator.debounce(), Duration::from_millis(50));
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
