//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → build backends → init each backend
//!     → spawn one watch loop per backend → spawn aggregator
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every watch loop and the aggregator leave their select
//!     → RunningControlPlane::wait() joins them
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - A backend that fails `init` aborts startup
//! - Backends that are merely unreachable do not; their loops retry
//! - Tasks subscribe to shutdown before they are spawned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{ControlPlane, RunningControlPlane, StartupError};
