//! Tree Server Binary
//!
//! # Usage
//!
//! ```bash
//! # In-memory tree on port 3001
//! cargo run --bin tree-server
//!
//! # Persistent tree on another port
//! TREE_SNAPSHOT_PATH=./data/tree.json TREE_SERVER_PORT=3002 cargo run --bin tree-server
//! ```
//!
//! See `treeadmin_server::config` for every variable. `RUST_LOG` sets the
//! log filter (default `info`).

use treeadmin_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    tracing::info!("TreeAdmin tree server");
    tracing::info!("Port: {}", config.port);
    match &config.snapshot_path {
        Some(path) => tracing::info!("Snapshot: {}", path.display()),
        None => tracing::info!("Snapshot: none"),
    }
    tracing::info!(
        "Text field: {}, delete policy: {:?}",
        config.tree.text_field,
        config.tree.delete_policy
    );

    start_server(config).await
}
