//! In-memory `NodeStore` with optional JSON snapshot file
//!
//! The forest lives in a `BTreeMap` behind a `tokio::sync::RwLock`. Every
//! write is applied to a scratch copy, checked against the forest invariants,
//! written to the snapshot file (when configured) and only then published, so
//! readers never observe a half-applied diff and a failed write leaves both
//! memory and disk untouched.

use crate::db::{AppliedDiff, DatabaseError, NodeStore};
use crate::models::{Node, TextField};
use crate::operations::{check_forest, IntervalDiff};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
struct ForestState {
    revision: u64,
    nodes: BTreeMap<String, Node>,
}

impl ForestState {
    fn from_nodes(revision: u64, nodes: Vec<Node>) -> Result<Self, DatabaseError> {
        let mut map = BTreeMap::new();
        for node in nodes {
            if map.contains_key(&node.id) {
                return Err(DatabaseError::duplicate_node(node.id));
            }
            map.insert(node.id.clone(), node);
        }
        check_forest(map.values())?;
        Ok(Self {
            revision,
            nodes: map,
        })
    }

    fn ordered(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.left_bound);
        nodes
    }
}

/// On-disk snapshot layout
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    revision: u64,
    nodes: Vec<Node>,
}

/// In-memory node store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<ForestState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing forest, validated up front
    pub fn with_nodes(nodes: Vec<Node>) -> Result<Self, DatabaseError> {
        Ok(Self {
            state: RwLock::new(ForestState::from_nodes(0, nodes)?),
            snapshot_path: None,
        })
    }

    /// Store backed by a snapshot file
    ///
    /// Loads the file if it exists (and validates the forest it contains),
    /// otherwise starts empty. Every later write rewrites the file.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        let path = path.into();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                ForestState::from_nodes(snapshot.revision, snapshot.nodes)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ForestState::default(),
            Err(e) => return Err(DatabaseError::snapshot_io(path, e)),
        };

        tracing::info!(
            "Opened tree snapshot {} ({} nodes, revision {})",
            path.display(),
            state.nodes.len(),
            state.revision
        );

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    async fn persist(&self, state: &ForestState) -> Result<(), DatabaseError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot = Snapshot {
            revision: state.revision,
            nodes: state.ordered(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DatabaseError::snapshot_io(parent, e))?;
        }

        // write-then-rename so a crash never leaves a truncated snapshot
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| DatabaseError::snapshot_io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| DatabaseError::snapshot_io(path, e))?;

        Ok(())
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn load_node(&self, id: &str) -> Result<Option<Node>, DatabaseError> {
        Ok(self.state.read().await.nodes.get(id).cloned())
    }

    async fn load_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>, DatabaseError> {
        let state = self.state.read().await;
        let mut children: Vec<Node> = state
            .nodes
            .values()
            .filter(|n| n.parent_id.as_deref() == parent_id)
            .cloned()
            .collect();
        children.sort_by_key(|n| n.left_bound);
        Ok(children)
    }

    async fn load_all(&self) -> Result<Vec<Node>, DatabaseError> {
        Ok(self.state.read().await.ordered())
    }

    async fn revision(&self) -> Result<u64, DatabaseError> {
        Ok(self.state.read().await.revision)
    }

    async fn apply_interval_diff(&self, diff: IntervalDiff) -> Result<AppliedDiff, DatabaseError> {
        let mut state = self.state.write().await;

        if diff.expected_revision != state.revision {
            return Err(DatabaseError::revision_conflict(
                diff.expected_revision,
                state.revision,
            ));
        }

        let mut nodes = state.nodes.clone();
        let removed = diff.apply_to(&mut nodes)?;
        check_forest(nodes.values())?;

        let next = ForestState {
            revision: state.revision + 1,
            nodes,
        };
        self.persist(&next).await?;
        *state = next;

        tracing::debug!(
            "Applied interval diff for '{}' at revision {}",
            diff.subject_id(),
            state.revision
        );

        Ok(AppliedDiff {
            revision: state.revision,
            removed,
        })
    }

    async fn update_text(
        &self,
        id: &str,
        field: &TextField,
        text: String,
    ) -> Result<Node, DatabaseError> {
        let mut state = self.state.write().await;

        let mut next = state.clone();
        let node = next
            .nodes
            .get_mut(id)
            .ok_or_else(|| DatabaseError::node_not_found(id))?;
        field.write(node, text);
        node.modified_at = Utc::now();
        let updated = node.clone();

        self.persist(&next).await?;
        *state = next;

        Ok(updated)
    }
}
