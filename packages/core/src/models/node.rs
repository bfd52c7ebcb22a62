use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

fn empty_properties() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Validation errors for node attributes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Label cannot be empty")]
    EmptyLabel,

    #[error("Label is {length} characters long, maximum is {max}")]
    LabelTooLong { length: usize, max: usize },

    #[error("Invalid text field selector: {0}")]
    InvalidTextField(String),
}

/// Closed nested-set interval `[left, right]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSpan {
    pub left: i64,
    pub right: i64,
}

impl NodeSpan {
    pub fn new(left: i64, right: i64) -> Self {
        Self { left, right }
    }

    /// Number of bound values covered, `right - left + 1`
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// True if `other` lies strictly inside this interval
    pub fn encloses(&self, other: &NodeSpan) -> bool {
        self.left < other.left && other.right < self.right
    }

    /// True if the bound value falls inside `[left, right]`
    pub fn covers(&self, bound: i64) -> bool {
        self.left <= bound && bound <= self.right
    }

    pub fn descendant_count(&self) -> i64 {
        (self.right - self.left - 1) / 2
    }
}

/// A node of the nested-set forest.
///
/// # Fields
///
/// - `id`: UUID assigned at creation, never changes
/// - `parent_id`: nearest enclosing node, `None` for roots
/// - `label`: the built-in tree text
/// - `properties`: free-form attributes; the configured text field may live here
/// - `left_bound` / `right_bound`: nested-set interval on the forest-wide number line
/// - `depth`: number of ancestors
///
/// Bounds and depth are only ever written through an `IntervalDiff`, so a node
/// read from a store always satisfies the forest invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    pub parent_id: Option<String>,

    pub label: String,

    #[serde(default = "empty_properties")]
    pub properties: serde_json::Value,

    pub left_bound: i64,

    pub right_bound: i64,

    pub depth: u32,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl Node {
    /// Create a leaf node occupying `[left_bound, left_bound + 1]`
    ///
    /// The caller is responsible for choosing a bound that opens a gap at the
    /// right place; see `IntervalDiff::insert`.
    pub fn new(label: String, parent_id: Option<String>, left_bound: i64, depth: u32) -> Self {
        Self::new_with_id(
            Uuid::new_v4().to_string(),
            label,
            parent_id,
            left_bound,
            depth,
        )
    }

    /// Create a leaf node with a caller-supplied ID
    pub fn new_with_id(
        id: String,
        label: String,
        parent_id: Option<String>,
        left_bound: i64,
        depth: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            parent_id,
            label,
            properties: empty_properties(),
            left_bound,
            right_bound: left_bound + 1,
            depth,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn span(&self) -> NodeSpan {
        NodeSpan::new(self.left_bound, self.right_bound)
    }

    pub fn has_children(&self) -> bool {
        self.right_bound - self.left_bound > 1
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// True if `other` is a strict descendant of this node
    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        self.span().encloses(&other.span())
    }
}
