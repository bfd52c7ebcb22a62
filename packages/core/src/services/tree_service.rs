//! Tree Ordering Service
//!
//! Business logic for the admin tree over a nested-set forest:
//!
//! - Listing children in sibling order
//! - Moving a node (with its subtree) to any position under any parent
//! - Relative moves (`move_by`, `move_up`, `move_down`)
//! - Creating, renaming and deleting nodes
//!
//! # Serialization
//!
//! Structural mutations (move, create, delete) run under one service-wide
//! lock acquired with a bounded wait. Inside the lock each mutation reads the
//! store revision, reads the bounds it needs, plans one `IntervalDiff` and
//! hands it to the store together with that revision. If a writer outside
//! this service instance got there first the diff is re-planned from fresh
//! bounds (see `ConflictRetry`).
//!
//! Renames touch no bounds; they take neither the lock nor the revision.
//!
//! # Sibling positions
//!
//! A target index always refers to the destination's child list with the
//! moved node taken out, in ascending `left_bound` order at the time of the
//! request. An index past the end appends.

use crate::db::{DatabaseError, NodeStore, TreeEvent};
use crate::models::Node;
use crate::operations::{check_forest, BoundRemap, ConflictRetry, IntervalDiff};
use crate::services::config::{ConfigError, DeletePolicy, TreeConfig};
use crate::services::error::TreeServiceError;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::instrument;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of a delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub id: String,
    /// Number of nodes removed, including cascaded descendants
    pub removed: usize,
}

/// Where a relocation should put the node
#[derive(Debug, Clone, Copy)]
enum Placement<'a> {
    Absolute {
        parent_id: Option<&'a str>,
        index: usize,
    },
    Relative {
        delta: i64,
    },
}

struct Relocation {
    node: Node,
    index: usize,
    moved: bool,
}

/// Ordering service over a `NodeStore`
#[derive(Clone)]
pub struct TreeOrderingService {
    store: Arc<dyn NodeStore>,
    config: TreeConfig,
    retry: ConflictRetry,
    structure_lock: Arc<Mutex<()>>,
    event_tx: broadcast::Sender<TreeEvent>,
}

impl TreeOrderingService {
    /// Create a service over `store`; the configuration is validated here
    pub fn new(store: Arc<dyn NodeStore>, config: TreeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            store,
            retry: ConflictRetry::new(config.max_conflict_retries),
            config,
            structure_lock: Arc::new(Mutex::new(())),
            event_tx,
        })
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Subscribe to mutation events
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: TreeEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Tree text of `node` through the configured text field
    pub fn text_of(&self, node: &Node) -> String {
        self.config.text_field.read(node)
    }

    pub fn has_children(&self, node: &Node) -> bool {
        node.has_children()
    }

    pub async fn get_node(&self, id: &str) -> Result<Node, TreeServiceError> {
        self.store
            .load_node(id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(id))
    }

    /// Direct children of `parent_id`, or the roots for `None`, in sibling order
    pub async fn get_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>, TreeServiceError> {
        if let Some(parent_id) = parent_id {
            self.get_node(parent_id).await?;
        }
        Ok(self.store.load_children(parent_id).await?)
    }

    /// Move `node_id` with its subtree to be child number `target_index`
    /// (0-based) of `new_parent_id`, or of the forest for `None`
    ///
    /// Moving a node to where it already is succeeds without writing.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if the node or the new parent does not exist
    /// - `InvalidMove` if the new parent is the node itself or a descendant
    #[instrument(skip(self))]
    pub async fn move_to_position(
        &self,
        node_id: &str,
        new_parent_id: Option<&str>,
        target_index: usize,
    ) -> Result<Node, TreeServiceError> {
        self.relocate(
            node_id,
            Placement::Absolute {
                parent_id: new_parent_id,
                index: target_index,
            },
        )
        .await
    }

    /// Shift a node among its current siblings; positive `delta` moves it
    /// later. The resulting index is clamped to the sibling range.
    #[instrument(skip(self))]
    pub async fn move_by(&self, node_id: &str, delta: i64) -> Result<Node, TreeServiceError> {
        self.relocate(node_id, Placement::Relative { delta }).await
    }

    pub async fn move_up(&self, node_id: &str, steps: u32) -> Result<Node, TreeServiceError> {
        self.move_by(node_id, -i64::from(steps)).await
    }

    pub async fn move_down(&self, node_id: &str, steps: u32) -> Result<Node, TreeServiceError> {
        self.move_by(node_id, i64::from(steps)).await
    }

    /// Change the tree text; no structural change
    #[instrument(skip(self))]
    pub async fn rename(&self, node_id: &str, text: &str) -> Result<Node, TreeServiceError> {
        let label = self.config.validate_label(text)?;
        let node = self
            .store
            .update_text(node_id, &self.config.text_field, label)
            .await?;

        tracing::info!("Renamed node {}", node_id);
        self.emit_event(TreeEvent::NodeRenamed {
            id: node.id.clone(),
            text: self.text_of(&node),
        });
        Ok(node)
    }

    /// Insert a new last child of `parent_id`, or a new last root for `None`
    #[instrument(skip(self))]
    pub async fn create(&self, parent_id: Option<&str>, text: &str) -> Result<Node, TreeServiceError> {
        let label = self.config.validate_label(text)?;
        let label = label.as_str();

        let _guard = self.lock_structure("create").await?;
        let node = self
            .retry
            .run(parent_id.unwrap_or("<root>"), move || {
                self.try_create(parent_id, label)
            })
            .await?;

        tracing::info!(
            "Created node {} under {:?} at [{}, {}]",
            node.id,
            parent_id,
            node.left_bound,
            node.right_bound
        );
        self.emit_event(TreeEvent::NodeCreated { node: node.clone() });
        Ok(node)
    }

    /// Delete a node
    ///
    /// With `cascade` the whole subtree goes. Without it, a leaf is removed
    /// and a node with children is handled by `TreeConfig::delete_policy`.
    #[instrument(skip(self))]
    pub async fn delete(&self, node_id: &str, cascade: bool) -> Result<DeleteOutcome, TreeServiceError> {
        let _guard = self.lock_structure("delete").await?;
        let outcome = self
            .retry
            .run(node_id, move || self.try_delete(node_id, cascade))
            .await?;

        tracing::info!("Deleted node {} ({} removed)", node_id, outcome.removed);
        self.emit_event(TreeEvent::NodeDeleted {
            id: outcome.id.clone(),
            removed: outcome.removed,
        });
        Ok(outcome)
    }

    /// Run the forest invariant checker over the whole store
    pub async fn verify(&self) -> Result<(), TreeServiceError> {
        let nodes = self.store.load_all().await?;
        check_forest(&nodes).map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn lock_structure(&self, operation: &'static str) -> Result<MutexGuard<'_, ()>, TreeServiceError> {
        tokio::time::timeout(self.config.lock_timeout(), self.structure_lock.lock())
            .await
            .map_err(|_| {
                tracing::warn!(
                    "Gave up waiting {}ms for the tree lock ({})",
                    self.config.lock_timeout_ms,
                    operation
                );
                TreeServiceError::lock_timeout(operation, self.config.lock_timeout_ms)
            })
    }

    /// First bound past the last root
    async fn forest_end(&self) -> Result<i64, TreeServiceError> {
        let roots = self.store.load_children(None).await?;
        Ok(roots.last().map_or(1, |root| root.right_bound + 1))
    }

    async fn relocate(&self, node_id: &str, placement: Placement<'_>) -> Result<Node, TreeServiceError> {
        let _guard = self.lock_structure("move").await?;
        let relocation = self
            .retry
            .run(node_id, move || self.try_relocate(node_id, placement))
            .await?;

        if relocation.moved {
            tracing::info!(
                "Moved node {} to index {} under {:?}",
                node_id,
                relocation.index,
                relocation.node.parent_id
            );
            self.emit_event(TreeEvent::NodeMoved {
                id: relocation.node.id.clone(),
                parent_id: relocation.node.parent_id.clone(),
                index: relocation.index,
            });
        }
        Ok(relocation.node)
    }

    async fn try_relocate(
        &self,
        node_id: &str,
        placement: Placement<'_>,
    ) -> Result<Relocation, TreeServiceError> {
        let revision = self.store.revision().await?;
        let node = self.get_node(node_id).await?;

        let (parent_id, index) = match placement {
            Placement::Absolute { parent_id, index } => (parent_id.map(str::to_string), index),
            Placement::Relative { delta } => {
                let siblings = self.store.load_children(node.parent_id.as_deref()).await?;
                let current = siblings
                    .iter()
                    .position(|s| s.id == node.id)
                    .ok_or_else(|| {
                        DatabaseError::stale_diff(format!(
                            "node '{}' is missing from its parent's children",
                            node.id
                        ))
                    })?;
                let last = siblings.len() as i64 - 1;
                let target = (current as i64).saturating_add(delta).clamp(0, last);
                (node.parent_id.clone(), target as usize)
            }
        };

        let (append_at, new_depth) = match parent_id.as_deref() {
            Some(pid) => {
                if pid == node.id {
                    return Err(TreeServiceError::invalid_move(format!(
                        "Cannot move node {} under itself",
                        node.id
                    )));
                }
                let parent = self.get_node(pid).await?;
                if node.is_ancestor_of(&parent) {
                    return Err(TreeServiceError::invalid_move(format!(
                        "Cannot move node {} under its descendant {}",
                        node.id, pid
                    )));
                }
                (parent.right_bound, parent.depth + 1)
            }
            None => (self.forest_end().await?, 0),
        };

        let siblings: Vec<Node> = self
            .store
            .load_children(parent_id.as_deref())
            .await?
            .into_iter()
            .filter(|s| s.id != node.id)
            .collect();
        let target = siblings.get(index).map_or(append_at, |s| s.left_bound);
        let final_index = index.min(siblings.len());

        // an identity remap only happens when the parent is unchanged
        if BoundRemap::new(node.span(), target).is_identity() && node.parent_id == parent_id {
            tracing::debug!("Node {} already at index {}, nothing to move", node.id, final_index);
            return Ok(Relocation {
                node,
                index: final_index,
                moved: false,
            });
        }

        let diff = IntervalDiff::relocate(revision, &node, parent_id, target, new_depth);
        self.store.apply_interval_diff(diff).await?;

        Ok(Relocation {
            node: self.get_node(node_id).await?,
            index: final_index,
            moved: true,
        })
    }

    async fn try_create(&self, parent_id: Option<&str>, label: &str) -> Result<Node, TreeServiceError> {
        let revision = self.store.revision().await?;

        let (gap, depth) = match parent_id {
            Some(pid) => {
                let parent = self.get_node(pid).await?;
                (parent.right_bound, parent.depth + 1)
            }
            None => (self.forest_end().await?, 0),
        };

        let mut node = Node::new(label.to_string(), parent_id.map(str::to_string), gap, depth);
        self.config.text_field.write(&mut node, label.to_string());

        self.store
            .apply_interval_diff(IntervalDiff::insert(revision, node.clone()))
            .await?;
        Ok(node)
    }

    async fn try_delete(&self, node_id: &str, cascade: bool) -> Result<DeleteOutcome, TreeServiceError> {
        let revision = self.store.revision().await?;
        let node = self.get_node(node_id).await?;

        let diff = if cascade || !node.has_children() {
            IntervalDiff::remove_subtree(revision, &node)
        } else {
            match self.config.delete_policy {
                DeletePolicy::Reject => {
                    let descendants = node.span().descendant_count();
                    return Err(TreeServiceError::has_children(node.id, descendants));
                }
                DeletePolicy::Reparent => IntervalDiff::remove_lifting(revision, &node),
            }
        };

        let applied = self.store.apply_interval_diff(diff).await?;
        Ok(DeleteOutcome {
            id: node.id,
            removed: applied.removed.len(),
        })
    }

    #[cfg(test)]
    pub(crate) async fn hold_structure_lock(&self) -> MutexGuard<'_, ()> {
        self.structure_lock.lock().await
    }
}
