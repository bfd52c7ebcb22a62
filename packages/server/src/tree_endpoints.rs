//! Tree Endpoints
//!
//! One dispatch endpoint drives the admin tree widget; the operation is
//! chosen by the `operation` query parameter.
//!
//! # Endpoints
//!
//! - `GET|POST /api/tree?operation=get_node&parentId=` - List children (`#` = roots)
//! - `GET|POST /api/tree?operation=move_node&id=&newParentId=&targetIndex=` - Move a node
//! - `GET|POST /api/tree?operation=rename_node&id=&text=` - Rename a node
//! - `GET|POST /api/tree?operation=create_node&parentId=&text=` - Create a node
//! - `GET|POST /api/tree?operation=delete_node&id=&cascade=` - Delete a node
//! - `POST /api/tree/nodes/:id/move-up?steps=` - Move earlier among siblings
//! - `POST /api/tree/nodes/:id/move-down?steps=` - Move later among siblings
//! - `GET /api/health` - Health check
//!
//! Snake-case parameter names (`parent_id`, `position`, ...) are accepted
//! alongside the camelCase ones.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use treeadmin_core::Node;

use crate::{AppState, HttpError};

/// Parent value the tree widget sends for the invisible root
const ROOT_MARKER: &str = "#";

/// Query parameters of the dispatch endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDataParams {
    pub operation: Option<String>,
    pub id: Option<String>,
    #[serde(alias = "parent_id")]
    pub parent_id: Option<String>,
    #[serde(alias = "new_parent_id")]
    pub new_parent_id: Option<String>,
    #[serde(alias = "target_index", alias = "position")]
    pub target_index: Option<usize>,
    pub text: Option<String>,
    pub cascade: Option<bool>,
}

impl TreeDataParams {
    fn require_id(&self) -> Result<&str, HttpError> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| HttpError::missing_parameter("id"))
    }

    fn require_text(&self) -> Result<&str, HttpError> {
        self.text
            .as_deref()
            .ok_or_else(|| HttpError::missing_parameter("text"))
    }
}

#[derive(Debug, Deserialize)]
pub struct StepsParams {
    steps: Option<u32>,
}

/// Whether a listed node can be expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Branch,
    Leaf,
}

/// One entry of a children listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeItem {
    pub id: String,
    pub text: String,
    pub has_children: bool,
    pub kind: NodeKind,
}

/// Response of move, rename and create
#[derive(Debug, Serialize)]
pub struct NodeText {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/tree", get(tree_data).post(tree_data))
        .route("/api/tree/nodes/:id/move-up", post(move_up))
        .route("/api/tree/nodes/:id/move-down", post(move_down))
        .with_state(state)
}

/// `None` for the forest root, whichever way the client spelled it
fn parent_ref(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != ROOT_MARKER)
}

fn node_text(state: &AppState, node: &Node) -> NodeText {
    NodeText {
        id: node.id.clone(),
        text: state.service.text_of(node),
    }
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn tree_data(
    State(state): State<AppState>,
    query: Result<Query<TreeDataParams>, QueryRejection>,
) -> Result<Response, HttpError> {
    let Query(params) = query?;
    let operation = params
        .operation
        .as_deref()
        .ok_or_else(|| HttpError::missing_parameter("operation"))?;

    tracing::debug!("Tree operation {} ({:?})", operation, params);

    match operation {
        "get_node" => Ok(Json(list_children(&state, &params).await?).into_response()),
        "move_node" => Ok(Json(move_node(&state, &params).await?).into_response()),
        "rename_node" => Ok(Json(rename_node(&state, &params).await?).into_response()),
        "create_node" => Ok(Json(create_node(&state, &params).await?).into_response()),
        "delete_node" => {
            delete_node(&state, &params).await?;
            Ok(StatusCode::OK.into_response())
        }
        other => Err(HttpError::new(
            format!("Unknown operation: {}", other),
            "INVALID_OPERATION",
        )),
    }
}

async fn list_children(
    state: &AppState,
    params: &TreeDataParams,
) -> Result<Vec<TreeItem>, HttpError> {
    let parent_id = parent_ref(params.parent_id.as_deref().or(params.id.as_deref()));
    let children = state.service.get_children(parent_id).await?;

    Ok(children
        .iter()
        .map(|node| {
            let has_children = state.service.has_children(node);
            TreeItem {
                id: node.id.clone(),
                text: state.service.text_of(node),
                has_children,
                kind: if has_children {
                    NodeKind::Branch
                } else {
                    NodeKind::Leaf
                },
            }
        })
        .collect())
}

async fn move_node(state: &AppState, params: &TreeDataParams) -> Result<NodeText, HttpError> {
    let id = params.require_id()?;
    let new_parent_id = parent_ref(
        params
            .new_parent_id
            .as_deref()
            .or(params.parent_id.as_deref()),
    );
    let target_index = params
        .target_index
        .ok_or_else(|| HttpError::missing_parameter("targetIndex"))?;

    let node = state
        .service
        .move_to_position(id, new_parent_id, target_index)
        .await?;
    Ok(node_text(state, &node))
}

async fn rename_node(state: &AppState, params: &TreeDataParams) -> Result<NodeText, HttpError> {
    let id = params.require_id()?;
    let node = state.service.rename(id, params.require_text()?).await?;
    Ok(node_text(state, &node))
}

async fn create_node(state: &AppState, params: &TreeDataParams) -> Result<NodeText, HttpError> {
    let parent_id = parent_ref(params.parent_id.as_deref());
    let node = state.service.create(parent_id, params.require_text()?).await?;
    Ok(node_text(state, &node))
}

async fn delete_node(state: &AppState, params: &TreeDataParams) -> Result<(), HttpError> {
    let id = params.require_id()?;
    let cascade = params
        .cascade
        .unwrap_or(state.service.config().default_cascade);

    state.service.delete(id, cascade).await?;
    Ok(())
}

async fn move_up(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<StepsParams>, QueryRejection>,
) -> Result<Json<NodeText>, HttpError> {
    let Query(params) = query?;
    let node = state.service.move_up(&id, params.steps.unwrap_or(1)).await?;
    Ok(Json(node_text(&state, &node)))
}

async fn move_down(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<StepsParams>, QueryRejection>,
) -> Result<Json<NodeText>, HttpError> {
    let Query(params) = query?;
    let node = state.service.move_down(&id, params.steps.unwrap_or(1)).await?;
    Ok(Json(node_text(&state, &node)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_ref_root_spellings() {
        assert_eq!(parent_ref(None), None);
        assert_eq!(parent_ref(Some("")), None);
        assert_eq!(parent_ref(Some("#")), None);
        assert_eq!(parent_ref(Some("n-1")), Some("n-1"));
    }

    #[test]
    fn test_node_kind_serialization() {
        let item = TreeItem {
            id: "n-1".to_string(),
            text: "Fruit".to_string(),
            has_children: true,
            kind: NodeKind::Branch,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["hasChildren"], true);
        assert_eq!(json["kind"], "branch");
    }
}
