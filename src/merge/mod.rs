//! Configuration merge subsystem.
//!
//! # Data Flow
//! ```text
//! { provider name → Configuration }
//!     → sort provider names
//!     → engine.rs (walk every plane and collection)
//!         → resource.rs (absorb or compare same-keyed values)
//!         → tracker.rs (record origins, mark conflicts)
//!     → tracker.rs resolves: drop conflicted keys, log diagnostics
//!     → merged Configuration (all planes present)
//! ```
//!
//! # Design Decisions
//! - Pure function of its inputs; no I/O, no shared state
//! - Provider order is lexicographic, never arrival order
//! - Conflicts never abort a merge; the contended key is dropped
//! - Collections are enumerated explicitly (`Collection`), no struct walking

pub mod engine;
pub mod resource;
pub mod tracker;

use serde::{Deserialize, Serialize};

pub use engine::{merge, merge_with_conflicts};
pub use resource::{Absorb, Resource};
pub use tracker::{Collection, Conflict, ConflictTracker};

/// How duplicate keys across providers are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStrategy {
    /// Union mergeable resources, drop irreconcilable ones.
    #[default]
    Merge,
    /// Keep the first-seen value for a duplicate key, never union.
    SkipDuplicates,
}

impl std::fmt::Display for ResourceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStrategy::Merge => write!(f, "merge"),
            ResourceStrategy::SkipDuplicates => write!(f, "skip_duplicates"),
        }
    }
}
