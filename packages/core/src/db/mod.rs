//! Persistence Layer
//!
//! - `NodeStore` - the narrow async interface the ordering service talks to
//! - `MemoryStore` - in-memory backend with an optional JSON snapshot file
//! - `TreeEvent` - domain events for subscribers
//!
//! The nested-set arithmetic itself lives in `operations`; a store only
//! applies the `IntervalDiff`s it is handed.

mod error;
pub mod events;
mod memory_store;
mod node_store;

pub use error::DatabaseError;
pub use events::TreeEvent;
pub use memory_store::MemoryStore;
pub use node_store::{AppliedDiff, NodeStore};
