//! Service Layer Error Types
//!
//! Every failure a `TreeOrderingService` operation can report. All of them are
//! recoverable at the request boundary; none leave a partial structural write
//! behind.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Tree service operation errors
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Move would put a node under itself or one of its descendants
    #[error("Invalid move: {reason}")]
    InvalidMove { reason: String },

    /// Non-cascading delete of a node that still has children
    #[error("Node {id} has {descendant_count} descendant(s) and cannot be deleted without cascade")]
    HasChildren { id: String, descendant_count: i64 },

    /// The forest changed under a structural mutation and retries ran out
    #[error("Concurrent modification: expected revision {expected_revision}, found {actual_revision}")]
    ConcurrentModification {
        expected_revision: u64,
        actual_revision: u64,
    },

    /// Label or other input failed validation
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// The structural lock was not acquired within the configured wait
    #[error("Timed out after {waited_ms}ms waiting for the tree lock ({operation})")]
    LockTimeout {
        operation: &'static str,
        waited_ms: u64,
    },

    /// Storage failure
    #[error("Database operation failed: {0}")]
    DatabaseError(DatabaseError),
}

impl TreeServiceError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    pub fn invalid_move(reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            reason: reason.into(),
        }
    }

    pub fn has_children(id: impl Into<String>, descendant_count: i64) -> Self {
        Self::HasChildren {
            id: id.into(),
            descendant_count,
        }
    }

    pub fn concurrent_modification(expected_revision: u64, actual_revision: u64) -> Self {
        Self::ConcurrentModification {
            expected_revision,
            actual_revision,
        }
    }

    pub fn lock_timeout(operation: &'static str, waited_ms: u64) -> Self {
        Self::LockTimeout {
            operation,
            waited_ms,
        }
    }

    /// True for errors a caller may resolve by retrying the same request
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<DatabaseError> for TreeServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::RevisionConflict { expected, actual } => {
                Self::concurrent_modification(expected, actual)
            }
            DatabaseError::NodeNotFound { id } => Self::NodeNotFound { id },
            other => Self::DatabaseError(other),
        }
    }
}
