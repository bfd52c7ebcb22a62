//! Tree text field selection
//!
//! The admin tree shows one text attribute per node. Which attribute is
//! chosen once, when `TreeConfig` is loaded, and every read or write then goes
//! through the resolved `TextField` instead of looking the field up by name.

use super::node::{Node, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

const PROPERTY_PREFIX: &str = "properties.";

/// Resolved accessor for the node attribute displayed as tree text
///
/// Selectors:
/// - `"label"` reads and writes `Node::label`
/// - `"properties.<key>"` reads and writes a string in `Node::properties`
/// - any other bare name is treated as a property key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextField {
    #[default]
    Label,
    Property(String),
}

impl TextField {
    pub fn parse(selector: &str) -> Result<Self, ValidationError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(ValidationError::MissingField("text_field".to_string()));
        }
        if selector == "label" {
            return Ok(Self::Label);
        }

        let key = selector.strip_prefix(PROPERTY_PREFIX).unwrap_or(selector);
        if key.is_empty() || key.contains('.') {
            return Err(ValidationError::InvalidTextField(selector.to_string()));
        }
        Ok(Self::Property(key.to_string()))
    }

    /// Read the tree text; missing or non-string properties read as empty
    pub fn read(&self, node: &Node) -> String {
        match self {
            Self::Label => node.label.clone(),
            Self::Property(key) => node
                .properties
                .get(key)
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn write(&self, node: &mut Node, text: String) {
        match self {
            Self::Label => node.label = text,
            Self::Property(key) => {
                if !node.properties.is_object() {
                    node.properties = serde_json::Value::Object(serde_json::Map::new());
                }
                if let Some(map) = node.properties.as_object_mut() {
                    map.insert(key.clone(), serde_json::Value::String(text));
                }
            }
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label => write!(f, "label"),
            Self::Property(key) => write!(f, "{}{}", PROPERTY_PREFIX, key),
        }
    }
}

impl TryFrom<String> for TextField {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TextField> for String {
    fn from(field: TextField) -> Self {
        field.to_string()
    }
}
