//! Configuration for the tree ordering service

use crate::models::{TextField, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Upper bound for `max_label_len`, the width of a `VARCHAR(4096)` column
const MAX_SUPPORTED_LABEL_LEN: usize = 4096;

/// Upper bound for `max_conflict_retries`; retries back off while holding the structural lock
pub const MAX_CONFLICT_RETRIES: usize = 10;

/// What a non-cascading delete does with the node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Refuse with `HasChildren`
    #[default]
    Reject,
    /// Lift the children into the deleted node's place under its parent
    Reparent,
}

impl std::str::FromStr for DeletePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "reparent" => Ok(Self::Reparent),
            other => Err(ConfigError::InvalidValue {
                key: "delete_policy",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0}")]
    OutOfRange(String),

    #[error("Invalid text field: {0}")]
    TextField(#[from] ValidationError),
}

/// Configuration for `TreeOrderingService`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Attribute displayed and edited as the tree text
    pub text_field: TextField,

    /// Child handling for deletes without cascade
    pub delete_policy: DeletePolicy,

    /// Cascade flag used by the HTTP adapter when the request does not say
    pub default_cascade: bool,

    /// Maximum label length in characters
    pub max_label_len: usize,

    /// Maximum wait for the structural lock, in milliseconds
    pub lock_timeout_ms: u64,

    /// Retries on revision conflict before reporting `ConcurrentModification`
    pub max_conflict_retries: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            text_field: TextField::Label,
            delete_policy: DeletePolicy::Reject,
            default_cascade: true,
            max_label_len: 255,
            lock_timeout_ms: 5000,
            max_conflict_retries: 3,
        }
    }
}

impl TreeConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_label_len == 0 {
            return Err(ConfigError::OutOfRange(
                "max_label_len must be greater than 0".to_string(),
            ));
        }

        if self.max_label_len > MAX_SUPPORTED_LABEL_LEN {
            return Err(ConfigError::OutOfRange(format!(
                "max_label_len cannot exceed {}",
                MAX_SUPPORTED_LABEL_LEN
            )));
        }

        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "lock_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(ConfigError::OutOfRange(format!(
                "max_conflict_retries cannot exceed {}",
                MAX_CONFLICT_RETRIES
            )));
        }

        Ok(())
    }

    /// Trim and check a label; returns the value to store
    pub fn validate_label(&self, text: &str) -> Result<String, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyLabel);
        }

        let length = trimmed.chars().count();
        if length > self.max_label_len {
            return Err(ValidationError::LabelTooLong {
                length,
                max: self.max_label_len,
            });
        }

        Ok(trimmed.to_string())
    }
}
