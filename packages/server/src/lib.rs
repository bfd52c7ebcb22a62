//! TreeAdmin HTTP Server
//!
//! JSON/HTTP adapter over `TreeOrderingService`. The router is built by
//! [`create_router`] and served by [`start_server`]; the `tree-server`
//! binary wires both to environment configuration.
//!
//! # Security
//!
//! - CORS restricted to `CORS_ALLOW_ORIGIN` (or localhost dev origins)
//! - No authentication; run it behind whatever fronts the admin

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use treeadmin_core::{MemoryStore, NodeStore, TreeOrderingService};

pub mod config;
mod http_error;
mod tree_endpoints;

pub use config::ServerConfig;
pub use http_error::HttpError;
pub use tree_endpoints::{NodeKind, NodeText, TreeDataParams, TreeItem};

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TreeOrderingService>,
}

/// Router with every tree endpoint and request tracing
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(tree_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
}

/// CORS layer for `origin`, or for the usual localhost dev origins when unset
pub fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let default_origins = ["http://localhost:3000", "http://localhost:5173"];

    let origins: Vec<HeaderValue> = match origin {
        Some(origin) => vec![origin.parse().map_err(|_| {
            anyhow::anyhow!("Invalid CORS_ALLOW_ORIGIN '{}' - must be a valid HTTP origin", origin)
        })?],
        None => default_origins
            .into_iter()
            .map(HeaderValue::from_static)
            .collect(),
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_credentials(false))
}

/// Open the store, check the forest and serve until Ctrl-C
///
/// # Errors
///
/// Returns error if the snapshot cannot be loaded, the forest fails
/// verification, or the server fails to bind.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let store: Arc<dyn NodeStore> = match &config.snapshot_path {
        Some(path) => Arc::new(MemoryStore::open(path).await?),
        None => {
            tracing::warn!("TREE_SNAPSHOT_PATH not set; the tree lives in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let service = TreeOrderingService::new(store, config.tree.clone())?;
    service.verify().await?;

    let app = create_router(AppState {
        service: Arc::new(service),
    })
    .layer(cors_layer(config.cors_origin.as_deref())?);

    let addr = format!("127.0.0.1:{}", config.port);
    tracing::info!("Tree server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
