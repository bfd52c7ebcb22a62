//! Domain Events for the tree
//!
//! `TreeOrderingService` emits one event per successful mutation on a tokio
//! broadcast channel. Events are sent only after the store accepted the
//! write, so subscribers never see a change that was rolled back.

use crate::models::Node;
use serde::{Deserialize, Serialize};

/// Domain events emitted by `TreeOrderingService`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeEvent {
    /// A new node was inserted
    NodeCreated { node: Node },

    /// A node (with its subtree) changed position or parent
    #[serde(rename_all = "camelCase")]
    NodeMoved {
        id: String,
        parent_id: Option<String>,
        index: usize,
    },

    /// The tree text of a node changed
    NodeRenamed { id: String, text: String },

    /// A node was removed; `removed` counts the node plus any cascaded descendants
    NodeDeleted { id: String, removed: usize },
}

impl TreeEvent {
    /// ID of the node the event is about
    pub fn node_id(&self) -> &str {
        match self {
            Self::NodeCreated { node } => &node.id,
            Self::NodeMoved { id, .. }
            | Self::NodeRenamed { id, .. }
            | Self::NodeDeleted { id, .. } => id,
        }
    }

    /// Get a string representation of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NodeCreated { .. } => "node_created",
            Self::NodeMoved { .. } => "node_moved",
            Self::NodeRenamed { .. } => "node_renamed",
            Self::NodeDeleted { .. } => "node_deleted",
        }
    }
}
