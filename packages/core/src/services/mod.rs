//! Business Services
//!
//! - `TreeOrderingService` - children listing, moves, renames, creates and
//!   deletes over the nested-set forest
//! - `TreeConfig` - text field, delete policy, lock and retry settings
//!
//! Services coordinate between the persistence layer and request adapters,
//! enforcing the ordering rules and serializing structural mutations.

pub mod config;
pub mod error;
pub mod tree_service;


pub use config::{ConfigError, DeletePolicy, TreeConfig};
pub use error::TreeServiceError;
pub use tree_service::{DeleteOutcome, TreeOrderingService};
