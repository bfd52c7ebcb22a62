//! Data Models
//!
//! - `Node` - a node of the nested-set forest with its interval and depth
//! - `NodeSpan` - the `[left, right]` interval itself
//! - `TextField` - accessor for the attribute shown as tree text

mod node;
mod text_field;

pub use node::{Node, NodeSpan, ValidationError};
pub use text_field::TextField;
