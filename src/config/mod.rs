//! Static configuration of the control plane.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControlPlaneConfig (validated, immutable)
//!     → lifecycle/startup.rs builds providers, watch loops and aggregator
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routing changes arrive through providers
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ControlPlaneConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProvidersConfig;
pub use schema::FileProviderConfig;
