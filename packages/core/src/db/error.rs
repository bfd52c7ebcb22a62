//! Database Error Types
//!
//! Errors raised by `NodeStore` implementations while reading nodes or
//! applying interval diffs.

use crate::operations::InvariantViolation;
use std::path::PathBuf;
use thiserror::Error;

/// Store operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Another writer changed the forest since the diff was planned
    #[error("Revision conflict: diff planned against revision {expected}, store is at {actual}")]
    RevisionConflict { expected: u64, actual: u64 },

    /// A node referenced by a diff or update does not exist
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// A node with this ID already exists
    #[error("Node already exists: {id}")]
    DuplicateNode { id: String },

    /// The diff no longer matches the stored bounds
    #[error("Stale interval diff: {reason}")]
    StaleDiff { reason: String },

    /// Applying the diff would leave the forest malformed
    #[error("Forest integrity violated: {0}")]
    IntegrityViolation(#[from] InvariantViolation),

    /// Failed to read or write the snapshot file
    #[error("Snapshot I/O failed for {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot file contents could not be (de)serialized
    #[error("Snapshot format error: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}

impl DatabaseError {
    pub fn revision_conflict(expected: u64, actual: u64) -> Self {
        Self::RevisionConflict { expected, actual }
    }

    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    pub fn duplicate_node(id: impl Into<String>) -> Self {
        Self::DuplicateNode { id: id.into() }
    }

    pub fn stale_diff(reason: impl Into<String>) -> Self {
        Self::StaleDiff {
            reason: reason.into(),
        }
    }

    pub fn snapshot_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SnapshotIo {
            path: path.into(),
            source,
        }
    }
}
