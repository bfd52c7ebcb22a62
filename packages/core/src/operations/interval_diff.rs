//! Interval diffs for structural mutations
//!
//! Every structural change to the forest (create, move, delete) is planned as
//! one `IntervalDiff` and handed to the store, which applies it atomically.
//! The diff is expressed as rules over bound values rather than a list of
//! rows, so an SQL backend can translate it to a handful of range `UPDATE`s
//! and the in-memory backend can apply it in a single pass.
//!
//! # Moving a block
//!
//! A move relocates the contiguous block `[l, r]` (a node and its subtree) so
//! that it starts at insertion bound `p`. Detaching the block, closing its gap,
//! opening a gap at `p` and re-basing the block collapse into one mapping:
//!
//! ```text
//! p > r + 1:  [l, r] -> +(p - r - 1)     (r, p)  -> -w
//! p < l:      [l, r] -> -(l - p)         [p, l)  -> +w
//! otherwise:  identity
//! ```
//!
//! where `w = r - l + 1`. Bounds outside the affected range never move.

use crate::db::DatabaseError;
use crate::models::{Node, NodeSpan};
use chrono::Utc;
use std::collections::BTreeMap;

/// Closed-form bound mapping for relocating one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundRemap {
    block: NodeSpan,
    target: i64,
}

impl BoundRemap {
    /// `target` is the bound the block's left edge is inserted before,
    /// expressed in current (pre-move) coordinates
    pub fn new(block: NodeSpan, target: i64) -> Self {
        Self { block, target }
    }

    pub fn block(&self) -> NodeSpan {
        self.block
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    /// True when the block is already at the insertion point
    pub fn is_identity(&self) -> bool {
        self.target >= self.block.left && self.target <= self.block.right + 1
    }

    /// Distance every bound inside the block travels
    pub fn block_offset(&self) -> i64 {
        if self.is_identity() {
            0
        } else if self.target > self.block.right {
            self.target - self.block.right - 1
        } else {
            self.target - self.block.left
        }
    }

    pub fn apply(&self, bound: i64) -> i64 {
        if self.is_identity() {
            return bound;
        }

        let NodeSpan { left, right } = self.block;
        let width = self.block.width();

        if self.block.covers(bound) {
            bound + self.block_offset()
        } else if self.target > right && bound > right && bound < self.target {
            bound - width
        } else if self.target < left && bound >= self.target && bound < left {
            bound + width
        } else {
            bound
        }
    }
}

/// The structural change carried by a diff
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalChange {
    /// Open a 2-wide gap at `node.left_bound` and store the new leaf there
    Insert { node: Node },

    /// Move a node's block and re-parent the node
    Relocate {
        node_id: String,
        new_parent_id: Option<String>,
        remap: BoundRemap,
        depth_delta: i64,
    },

    /// Remove a node with its whole subtree and close the gap
    RemoveSubtree { node_id: String, span: NodeSpan },

    /// Remove only the node; its children take its place under `new_parent_id`
    RemoveLifting {
        node_id: String,
        span: NodeSpan,
        new_parent_id: Option<String>,
    },
}

/// One atomic structural update, planned against a known store revision
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalDiff {
    pub expected_revision: u64,
    pub change: IntervalChange,
}

impl IntervalDiff {
    pub fn insert(expected_revision: u64, node: Node) -> Self {
        Self {
            expected_revision,
            change: IntervalChange::Insert { node },
        }
    }

    pub fn relocate(
        expected_revision: u64,
        node: &Node,
        new_parent_id: Option<String>,
        target: i64,
        new_depth: u32,
    ) -> Self {
        Self {
            expected_revision,
            change: IntervalChange::Relocate {
                node_id: node.id.clone(),
                new_parent_id,
                remap: BoundRemap::new(node.span(), target),
                depth_delta: i64::from(new_depth) - i64::from(node.depth),
            },
        }
    }

    pub fn remove_subtree(expected_revision: u64, node: &Node) -> Self {
        Self {
            expected_revision,
            change: IntervalChange::RemoveSubtree {
                node_id: node.id.clone(),
                span: node.span(),
            },
        }
    }

    pub fn remove_lifting(expected_revision: u64, node: &Node) -> Self {
        Self {
            expected_revision,
            change: IntervalChange::RemoveLifting {
                node_id: node.id.clone(),
                span: node.span(),
                new_parent_id: node.parent_id.clone(),
            },
        }
    }

    /// ID of the node the diff is about
    pub fn subject_id(&self) -> &str {
        match &self.change {
            IntervalChange::Insert { node } => &node.id,
            IntervalChange::Relocate { node_id, .. }
            | IntervalChange::RemoveSubtree { node_id, .. }
            | IntervalChange::RemoveLifting { node_id, .. } => node_id,
        }
    }

    /// Apply the change to a node map in place, returning the removed IDs.
    ///
    /// The map is left partially updated on error, so stores must apply diffs
    /// to a scratch copy and only publish it on success.
    pub fn apply_to(&self, nodes: &mut BTreeMap<String, Node>) -> Result<Vec<String>, DatabaseError> {
        match &self.change {
            IntervalChange::Insert { node } => {
                apply_insert(nodes, node)?;
                Ok(Vec::new())
            }
            IntervalChange::Relocate {
                node_id,
                new_parent_id,
                remap,
                depth_delta,
            } => {
                apply_relocate(nodes, node_id, new_parent_id, remap, *depth_delta)?;
                Ok(Vec::new())
            }
            IntervalChange::RemoveSubtree { node_id, span } => {
                apply_remove_subtree(nodes, node_id, *span)
            }
            IntervalChange::RemoveLifting {
                node_id,
                span,
                new_parent_id,
            } => {
                apply_remove_lifting(nodes, node_id, *span, new_parent_id)?;
                Ok(vec![node_id.clone()])
            }
        }
    }
}

fn expect_span(
    nodes: &BTreeMap<String, Node>,
    node_id: &str,
    span: NodeSpan,
) -> Result<(), DatabaseError> {
    let stored = nodes
        .get(node_id)
        .ok_or_else(|| DatabaseError::node_not_found(node_id))?;
    if stored.span() != span {
        return Err(DatabaseError::stale_diff(format!(
            "node '{}' spans [{}, {}], diff expected [{}, {}]",
            node_id, stored.left_bound, stored.right_bound, span.left, span.right
        )));
    }
    Ok(())
}

fn shift_depth(depth: u32, delta: i64) -> Result<u32, DatabaseError> {
    u32::try_from(i64::from(depth) + delta)
        .map_err(|_| DatabaseError::stale_diff(format!("depth {} cannot shift by {}", depth, delta)))
}

fn apply_insert(nodes: &mut BTreeMap<String, Node>, node: &Node) -> Result<(), DatabaseError> {
    if nodes.contains_key(&node.id) {
        return Err(DatabaseError::duplicate_node(&node.id));
    }

    let gap = node.left_bound;
    let expected_gap = match &node.parent_id {
        Some(parent_id) => {
            nodes
                .get(parent_id)
                .ok_or_else(|| DatabaseError::node_not_found(parent_id))?
                .right_bound
        }
        None => nodes.values().map(|n| n.right_bound).max().unwrap_or(0) + 1,
    };
    if gap != expected_gap {
        return Err(DatabaseError::stale_diff(format!(
            "insert of '{}' at bound {} but the append point is {}",
            node.id, gap, expected_gap
        )));
    }

    for existing in nodes.values_mut() {
        if existing.left_bound >= gap {
            existing.left_bound += 2;
        }
        if existing.right_bound >= gap {
            existing.right_bound += 2;
        }
    }
    nodes.insert(node.id.clone(), node.clone());
    Ok(())
}

fn apply_relocate(
    nodes: &mut BTreeMap<String, Node>,
    node_id: &str,
    new_parent_id: &Option<String>,
    remap: &BoundRemap,
    depth_delta: i64,
) -> Result<(), DatabaseError> {
    expect_span(nodes, node_id, remap.block())?;
    if let Some(parent_id) = new_parent_id {
        if !nodes.contains_key(parent_id) {
            return Err(DatabaseError::node_not_found(parent_id));
        }
    }

    let block = remap.block();
    for existing in nodes.values_mut() {
        if block.covers(existing.left_bound) {
            existing.depth = shift_depth(existing.depth, depth_delta)?;
        }
        existing.left_bound = remap.apply(existing.left_bound);
        existing.right_bound = remap.apply(existing.right_bound);
    }

    if let Some(moved) = nodes.get_mut(node_id) {
        moved.parent_id = new_parent_id.clone();
        moved.modified_at = Utc::now();
    }
    Ok(())
}

fn apply_remove_subtree(
    nodes: &mut BTreeMap<String, Node>,
    node_id: &str,
    span: NodeSpan,
) -> Result<Vec<String>, DatabaseError> {
    expect_span(nodes, node_id, span)?;

    let removed: Vec<String> = nodes
        .values()
        .filter(|n| span.covers(n.left_bound))
        .map(|n| n.id.clone())
        .collect();
    for id in &removed {
        nodes.remove(id);
    }

    let width = span.width();
    for existing in nodes.values_mut() {
        if existing.left_bound > span.right {
            existing.left_bound -= width;
        }
        if existing.right_bound > span.right {
            existing.right_bound -= width;
        }
    }
    Ok(removed)
}

fn apply_remove_lifting(
    nodes: &mut BTreeMap<String, Node>,
    node_id: &str,
    span: NodeSpan,
    new_parent_id: &Option<String>,
) -> Result<(), DatabaseError> {
    expect_span(nodes, node_id, span)?;
    nodes.remove(node_id);

    let now = Utc::now();
    let lift = |bound: i64| {
        if bound > span.right {
            bound - 2
        } else if bound > span.left {
            bound - 1
        } else {
            bound
        }
    };

    for existing in nodes.values_mut() {
        if span.encloses(&existing.span()) {
            existing.depth = shift_depth(existing.depth, -1)?;
        }
        if existing.parent_id.as_deref() == Some(node_id) {
            existing.parent_id = new_parent_id.clone();
            existing.modified_at = now;
        }
        existing.left_bound = lift(existing.left_bound);
        existing.right_bound = lift(existing.right_bound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::check_forest;

    fn node(id: &str, parent: Option<&str>, left: i64, right: i64, depth: u32) -> Node {
        let mut n = Node::new_with_id(
            id.to_string(),
            id.to_string(),
            parent.map(str::to_string),
            left,
            depth,
        );
        n.right_bound = right;
        n
    }

    /// A(B, C(D))
    fn fixture() -> BTreeMap<String, Node> {
        [
            node("A", None, 1, 8, 0),
            node("B", Some("A"), 2, 3, 1),
            node("C", Some("A"), 4, 7, 1),
            node("D", Some("C"), 5, 6, 2),
        ]
        .into_iter()
        .map(|n| (n.id.clone(), n))
        .collect()
    }

    fn span_of(nodes: &BTreeMap<String, Node>, id: &str) -> (i64, i64) {
        let n = &nodes[id];
        (n.left_bound, n.right_bound)
    }

    #[test]
    fn test_remap_moving_later() {
        // X[2,3] Y[4,5] inside P[1,6], X appended after Y
        let remap = BoundRemap::new(NodeSpan::new(2, 3), 6);
        assert_eq!(remap.target(), 6);
        assert_eq!(remap.block(), NodeSpan::new(2, 3));
        assert!(!remap.is_identity());
        assert_eq!(remap.block_offset(), 2);
        assert_eq!(remap.apply(2), 4);
        assert_eq!(remap.apply(3), 5);
        assert_eq!(remap.apply(4), 2);
        assert_eq!(remap.apply(5), 3);
        assert_eq!(remap.apply(1), 1);
        assert_eq!(remap.apply(6), 6);
    }

    #[test]
    fn test_remap_moving_earlier() {
        let remap = BoundRemap::new(NodeSpan::new(3, 4), 1);
        assert_eq!(remap.block_offset(), -2);
        assert_eq!(remap.apply(3), 1);
        assert_eq!(remap.apply(4), 2);
        assert_eq!(remap.apply(1), 3);
        assert_eq!(remap.apply(2), 4);
        assert_eq!(remap.apply(5), 5);
    }

    #[test]
    fn test_remap_identity_at_own_edges() {
        let block = NodeSpan::new(4, 7);
        for target in 4..=8 {
            let remap = BoundRemap::new(block, target);
            assert!(remap.is_identity());
            assert_eq!(remap.apply(5), 5);
            assert_eq!(remap.block_offset(), 0);
        }
        assert!(!BoundRemap::new(block, 3).is_identity());
        assert!(!BoundRemap::new(block, 9).is_identity());
    }

    #[test]
    fn test_relocate_grandchild_to_first_root() {
        let mut nodes = fixture();
        let d = nodes["D"].clone();
        let diff = IntervalDiff::relocate(0, &d, None, 1, 0);
        diff.apply_to(&mut nodes).unwrap();

        assert_eq!(span_of(&nodes, "D"), (1, 2));
        assert_eq!(span_of(&nodes, "A"), (3, 8));
        assert_eq!(span_of(&nodes, "B"), (4, 5));
        assert_eq!(span_of(&nodes, "C"), (6, 7));
        assert_eq!(nodes["D"].depth, 0);
        assert_eq!(nodes["D"].parent_id, None);
        check_forest(nodes.values()).unwrap();
    }

    #[test]
    fn test_relocate_subtree_keeps_internal_structure() {
        let mut nodes = fixture();
        let c = nodes["C"].clone();
        // C(D) before B, still under A
        let diff = IntervalDiff::relocate(0, &c, Some("A".to_string()), 2, 1);
        diff.apply_to(&mut nodes).unwrap();

        assert_eq!(span_of(&nodes, "C"), (2, 5));
        assert_eq!(span_of(&nodes, "D"), (3, 4));
        assert_eq!(span_of(&nodes, "B"), (6, 7));
        assert_eq!(nodes["D"].depth, 2);
        check_forest(nodes.values()).unwrap();
    }

    #[test]
    fn test_insert_opens_gap_at_parent_end() {
        let mut nodes = fixture();
        let e = Node::new_with_id("E".to_string(), "E".to_string(), Some("C".to_string()), 7, 2);
        IntervalDiff::insert(0, e).apply_to(&mut nodes).unwrap();

        assert_eq!(span_of(&nodes, "E"), (7, 8));
        assert_eq!(span_of(&nodes, "C"), (4, 9));
        assert_eq!(span_of(&nodes, "A"), (1, 10));
        check_forest(nodes.values()).unwrap();
    }

    #[test]
    fn test_insert_rejects_wrong_gap() {
        let mut nodes = fixture();
        let e = Node::new_with_id("E".to_string(), "E".to_string(), Some("C".to_string()), 5, 2);
        let err = IntervalDiff::insert(0, e).apply_to(&mut nodes).unwrap_err();
        assert!(matches!(err, DatabaseError::StaleDiff { .. }));
    }

    #[test]
    fn test_insert_root_into_empty_forest() {
        let mut nodes = BTreeMap::new();
        let a = Node::new_with_id("A".to_string(), "A".to_string(), None, 1, 0);
        IntervalDiff::insert(0, a).apply_to(&mut nodes).unwrap();
        assert_eq!(span_of(&nodes, "A"), (1, 2));
    }

    #[test]
    fn test_remove_subtree_closes_gap() {
        let mut nodes = fixture();
        let c = nodes["C"].clone();
        let removed = IntervalDiff::remove_subtree(0, &c)
            .apply_to(&mut nodes)
            .unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!nodes.contains_key("D"));
        assert_eq!(span_of(&nodes, "A"), (1, 4));
        check_forest(nodes.values()).unwrap();
    }

    #[test]
    fn test_remove_lifting_promotes_children() {
        let mut nodes = fixture();
        let c = nodes["C"].clone();
        let removed = IntervalDiff::remove_lifting(0, &c)
            .apply_to(&mut nodes)
            .unwrap();

        assert_eq!(removed, vec!["C".to_string()]);
        assert_eq!(span_of(&nodes, "D"), (4, 5));
        assert_eq!(span_of(&nodes, "A"), (1, 6));
        assert_eq!(nodes["D"].parent_id.as_deref(), Some("A"));
        assert_eq!(nodes["D"].depth, 1);
        check_forest(nodes.values()).unwrap();
    }

    #[test]
    fn test_stale_span_is_rejected() {
        let mut nodes = fixture();
        let mut c = nodes["C"].clone();
        c.right_bound = 9;
        let err = IntervalDiff::remove_subtree(0, &c)
            .apply_to(&mut nodes)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::StaleDiff { .. }));
    }
}
