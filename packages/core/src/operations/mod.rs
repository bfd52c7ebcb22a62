//! Nested-set operations
//!
//! Pure interval arithmetic shared by the service and the stores:
//!
//! - `IntervalDiff` / `BoundRemap` - one atomic structural change
//! - `check_forest` - the forest invariant checker
//! - `ConflictRetry` - re-planning on revision conflicts

pub mod conflict_retry;
pub mod interval_diff;
pub mod invariants;

pub use conflict_retry::ConflictRetry;
pub use interval_diff::{BoundRemap, IntervalChange, IntervalDiff};
pub use invariants::{check_forest, InvariantViolation};
