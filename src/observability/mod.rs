//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Watch loops, merge engine, aggregator produce:
//!     → logging.rs (structured log events: retries, conflicts, emissions)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Provider name flows through every watch-loop event
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
