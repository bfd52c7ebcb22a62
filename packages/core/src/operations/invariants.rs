//! Forest invariant checker
//!
//! Verifies that a set of nodes forms a well-formed nested-set forest:
//!
//! 1. Bounds are exactly `1..=2n` with no gaps or duplicates
//! 2. Every pair of intervals is either disjoint or strictly nested
//! 3. `parent_id` names the nearest enclosing interval
//! 4. `depth` equals the number of enclosing intervals
//!
//! Span parity (`right - left == 2 * descendants + 1`) follows from 1 and 2.

use crate::models::Node;
use thiserror::Error;

/// A violated forest invariant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Node '{id}' has left bound {left} not below right bound {right}")]
    InvertedBounds { id: String, left: i64, right: i64 },

    #[error("Bounds are not contiguous: expected {expected}, found {found}")]
    NonContiguousBounds { expected: i64, found: i64 },

    #[error("Intervals of '{outer}' and '{inner}' overlap without nesting")]
    Overlap { outer: String, inner: String },

    #[error("Node '{id}' has parent {actual:?} but is enclosed by {expected:?}")]
    WrongParent {
        id: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("Node '{id}' has depth {actual}, expected {expected}")]
    WrongDepth { id: String, expected: u32, actual: u32 },
}

/// Check every forest invariant; nodes may be given in any order
pub fn check_forest<'a, I>(nodes: I) -> Result<(), InvariantViolation>
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut ordered: Vec<&Node> = nodes.into_iter().collect();
    ordered.sort_by_key(|node| node.left_bound);

    let mut bounds = Vec::with_capacity(ordered.len() * 2);
    for node in &ordered {
        if node.left_bound >= node.right_bound {
            return Err(InvariantViolation::InvertedBounds {
                id: node.id.clone(),
                left: node.left_bound,
                right: node.right_bound,
            });
        }
        bounds.push(node.left_bound);
        bounds.push(node.right_bound);
    }
    bounds.sort_unstable();
    for (expected, found) in (1i64..).zip(bounds.iter().copied()) {
        if expected != found {
            return Err(InvariantViolation::NonContiguousBounds { expected, found });
        }
    }

    let mut open: Vec<&Node> = Vec::new();
    for node in ordered {
        while open
            .last()
            .is_some_and(|top| top.right_bound < node.left_bound)
        {
            open.pop();
        }

        if let Some(top) = open.last() {
            if node.right_bound > top.right_bound {
                return Err(InvariantViolation::Overlap {
                    outer: top.id.clone(),
                    inner: node.id.clone(),
                });
            }
        }

        let expected_parent = open.last().map(|top| top.id.clone());
        if node.parent_id != expected_parent {
            return Err(InvariantViolation::WrongParent {
                id: node.id.clone(),
                expected: expected_parent,
                actual: node.parent_id.clone(),
            });
        }

        let expected_depth = open.len() as u32;
        if node.depth != expected_depth {
            return Err(InvariantViolation::WrongDepth {
                id: node.id.clone(),
                expected: expected_depth,
                actual: node.depth,
            });
        }

        open.push(node);
    }

    Ok(())
}
