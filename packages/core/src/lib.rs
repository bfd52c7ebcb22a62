//! TreeAdmin Core
//!
//! Ordering engine for a materialized nested-set forest, the data behind a
//! drag-and-drop admin tree.
//!
//! # Architecture
//!
//! - **Nested set**: every node stores `[left_bound, right_bound]` on one
//!   forest-wide number line; containment encodes ancestry
//! - **Whole-diff writes**: each create, move or delete is planned as a single
//!   `IntervalDiff` and applied atomically by the store
//! - **Serialized structure**: structural mutations share one bounded-wait lock
//!   plus an optimistic store revision; renames bypass both
//!
//! # Modules
//!
//! - [`models`] - `Node`, `NodeSpan`, `TextField`
//! - [`operations`] - interval diffs, invariant checker, conflict retry
//! - [`db`] - `NodeStore` trait and the in-memory backend
//! - [`services`] - `TreeOrderingService` and its configuration

pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, MemoryStore, NodeStore, TreeEvent};
pub use models::*;
pub use services::*;
