//! Provider aggregation control plane.
//!
//! Configuration providers each describe part of the routing configuration
//! (routers, services, middlewares, TLS material). Every provider runs its
//! own watch loop; the aggregator merges their latest snapshots into one
//! configuration, dropping resources that providers define differently.

pub mod aggregator;
pub mod config;
pub mod dynamic;
pub mod lifecycle;
pub mod merge;
pub mod observability;
pub mod provider;
pub mod resilience;

pub use aggregator::{ConfigurationAggregator, ConfigurationSink};
pub use config::schema::ControlPlaneConfig;
pub use dynamic::Configuration;
pub use lifecycle::{ControlPlane, Shutdown};
pub use merge::{merge, ResourceStrategy};
pub use provider::{Backend, ProviderMessage};
