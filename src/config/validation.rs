//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Detect providers that would share an aggregation key
//! - Validate value ranges (delays, capacities, addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlPlaneConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ControlPlaneConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("provider name must not be empty")]
    EmptyProviderName,

    #[error("duplicate provider name '{0}'")]
    DuplicateProvider(String),

    #[error("provider '{0}' has an empty path")]
    EmptyProviderPath(String),

    #[error("backoff base delay must be greater than zero")]
    ZeroBaseDelay,

    #[error("backoff max delay {max_ms}ms is below base delay {base_ms}ms")]
    InvalidBackoff { base_ms: u64, max_ms: u64 },

    #[error("aggregator channel capacity must be greater than zero")]
    ZeroChannelCapacity,

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ControlPlaneConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for provider in &config.providers.file {
        if provider.name.trim().is_empty() {
            errors.push(ValidationError::EmptyProviderName);
            continue;
        }
        let name = provider.provider_name();
        if provider.path.trim().is_empty() {
            errors.push(ValidationError::EmptyProviderPath(name.clone()));
        }
        if !seen.insert(name.clone()) {
            errors.push(ValidationError::DuplicateProvider(name));
        }
    }

    let backoff = &config.providers.backoff;
    if backoff.base_delay_ms == 0 {
        errors.push(ValidationError::ZeroBaseDelay);
    } else if backoff.max_delay_ms < backoff.base_delay_ms {
        errors.push(ValidationError::InvalidBackoff {
            base_ms: backoff.base_delay_ms,
            max_ms: backoff.max_delay_ms,
        });
    }

    if config.aggregator.channel_capacity == 0 {
        errors.push(ValidationError::ZeroChannelCapacity);
    }

    let observability = &config.observability;
    let address_valid = observability.metrics_address.parse::<SocketAddr>().is_ok();
    if observability.metrics_enabled && !address_valid {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
