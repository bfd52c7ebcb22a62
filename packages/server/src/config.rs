//! Server configuration from environment variables
//!
//! | Variable | Default |
//! |---|---|
//! | `TREE_SERVER_PORT` | `3001` |
//! | `TREE_SNAPSHOT_PATH` | unset (in-memory only) |
//! | `TREE_TEXT_FIELD` | `label` |
//! | `TREE_DELETE_POLICY` | `reject` |
//! | `TREE_DEFAULT_CASCADE` | `true` |
//! | `TREE_MAX_LABEL_LEN` | `255` |
//! | `TREE_LOCK_TIMEOUT_MS` | `5000` |
//! | `CORS_ALLOW_ORIGIN` | localhost dev origins |

use std::path::PathBuf;
use std::str::FromStr;

use treeadmin_core::{ConfigError, TextField, TreeConfig};

const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// JSON snapshot file; `None` keeps the forest in memory only
    pub snapshot_path: Option<PathBuf>,
    pub cors_origin: Option<String>,
    pub tree: TreeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            snapshot_path: None,
            cors_origin: None,
            tree: TreeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("TREE_SERVER_PORT") {
            config.port = parse_value("TREE_SERVER_PORT", &port)?;
        }
        config.snapshot_path = get("TREE_SNAPSHOT_PATH").map(PathBuf::from);
        config.cors_origin = get("CORS_ALLOW_ORIGIN");

        if let Some(field) = get("TREE_TEXT_FIELD") {
            config.tree.text_field = TextField::parse(&field)?;
        }
        if let Some(policy) = get("TREE_DELETE_POLICY") {
            config.tree.delete_policy = policy.parse()?;
        }
        if let Some(cascade) = get("TREE_DEFAULT_CASCADE") {
            config.tree.default_cascade = parse_value("TREE_DEFAULT_CASCADE", &cascade)?;
        }
        if let Some(len) = get("TREE_MAX_LABEL_LEN") {
            config.tree.max_label_len = parse_value("TREE_MAX_LABEL_LEN", &len)?;
        }
        if let Some(timeout) = get("TREE_LOCK_TIMEOUT_MS") {
            config.tree.lock_timeout_ms = parse_value("TREE_LOCK_TIMEOUT_MS", &timeout)?;
        }

        config.tree.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use treeadmin_core::DeletePolicy;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert!(config.snapshot_path.is_none());
        assert_eq!(config.tree.text_field, TextField::Label);
        assert_eq!(config.tree.delete_policy, DeletePolicy::Reject);
        assert!(config.tree.default_cascade);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("TREE_SERVER_PORT", "8080"),
            ("TREE_SNAPSHOT_PATH", "/tmp/tree.json"),
            ("TREE_TEXT_FIELD", "properties.title"),
            ("TREE_DELETE_POLICY", "reparent"),
            ("TREE_DEFAULT_CASCADE", "false"),
            ("TREE_MAX_LABEL_LEN", "64"),
            ("TREE_LOCK_TIMEOUT_MS", "250"),
            ("CORS_ALLOW_ORIGIN", "http://admin.local"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/tree.json")));
        assert_eq!(config.tree.text_field, TextField::Property("title".to_string()));
        assert_eq!(config.tree.delete_policy, DeletePolicy::Reparent);
        assert!(!config.tree.default_cascade);
        assert_eq!(config.tree.max_label_len, 64);
        assert_eq!(config.tree.lock_timeout_ms, 250);
        assert_eq!(config.cors_origin.as_deref(), Some("http://admin.local"));
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = from_pairs(&[("TREE_SERVER_PORT", "  "), ("TREE_SNAPSHOT_PATH", "")]).unwrap();
        assert_eq!(config.port, 3001);
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            from_pairs(&[("TREE_SERVER_PORT", "http")]),
            Err(ConfigError::InvalidValue { key: "TREE_SERVER_PORT", .. })
        ));
        assert!(from_pairs(&[("TREE_DELETE_POLICY", "cascade")]).is_err());
        assert!(from_pairs(&[("TREE_TEXT_FIELD", "properties.")]).is_err());
        assert!(matches!(
            from_pairs(&[("TREE_LOCK_TIMEOUT_MS", "0")]),
            Err(ConfigError::OutOfRange(_))
        ));
    }
}
