//! NodeStore Trait - Persistence Abstraction Layer
//!
//! This module defines the `NodeStore` trait, the narrow interface between
//! `TreeOrderingService` (ordering logic) and whatever keeps the nodes. The
//! ordering algorithm only ever reads nodes and hands back a complete
//! `IntervalDiff`, so a backend needs no knowledge of nested sets beyond
//! applying that diff atomically.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async so embedded and networked
//!    backends fit the same trait
//! 2. **Whole-diff writes**: structural changes arrive as one `IntervalDiff`;
//!    a backend applies all of it or none of it
//! 3. **Optimistic revision check**: each diff names the revision it was
//!    planned against; a mismatch is `DatabaseError::RevisionConflict`
//! 4. **Attribute writes bypass the revision**: `update_text` touches no
//!    bounds, so it never conflicts with structural work

use crate::db::DatabaseError;
use crate::models::{Node, TextField};
use crate::operations::IntervalDiff;
use async_trait::async_trait;

/// Result of a successfully applied diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDiff {
    /// Store revision after the diff
    pub revision: u64,
    /// IDs of nodes the diff removed
    pub removed: Vec<String>,
}

/// Abstraction layer for node persistence
///
/// Implementations must be `Send + Sync` so the service can be shared across
/// request handlers.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Get a node by ID; `Ok(None)` if it does not exist
    async fn load_node(&self, id: &str) -> Result<Option<Node>, DatabaseError>;

    /// Direct children of `parent_id` (roots for `None`), ascending `left_bound`
    ///
    /// Does not check that the parent exists; an unknown parent simply has no
    /// children.
    async fn load_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>, DatabaseError>;

    /// Every node, ascending `left_bound`
    async fn load_all(&self) -> Result<Vec<Node>, DatabaseError>;

    /// Current structural revision
    async fn revision(&self) -> Result<u64, DatabaseError>;

    /// Apply a structural diff atomically
    ///
    /// # Errors
    ///
    /// - `RevisionConflict` if the store moved past `diff.expected_revision`
    /// - `NodeNotFound` / `StaleDiff` if the diff references nodes or bounds
    ///   that no longer match
    /// - `IntegrityViolation` if the result would break a forest invariant
    ///
    /// On any error the store is unchanged.
    async fn apply_interval_diff(&self, diff: IntervalDiff) -> Result<AppliedDiff, DatabaseError>;

    /// Write the tree text of one node without touching its bounds
    async fn update_text(
        &self,
        id: &str,
        field: &TextField,
        text: String,
    ) -> Result<Node, DatabaseError>;
}
