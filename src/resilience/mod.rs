//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Backend connect attempt fails:
//!     → backoff.rs (next jittered delay, bounded)
//!     → watch loop sleeps (cancellable), then retries
//! Stream breaks:
//!     → backoff.rs reset, only if the stream stayed up for the stable interval
//!     → watch loop waits max(reconnect delay, next backoff delay)
//! ```
//!
//! # Design Decisions
//! - Backend unavailability is retried forever, never fatal
//! - Jittered backoff prevents thundering herd on a shared API server
//! - Backoff state survives broken streams so a flapping backend backs off

pub mod backoff;
