//! HTTP error handling for the tree endpoints
//!
//! Every failure leaves the server as `{message, code, details?}` with a
//! status derived from `code`.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use treeadmin_core::TreeServiceError;

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(format!("Missing parameter: {}", name), "MISSING_PARAMETER")
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NODE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_OPERATION"
            | "INVALID_PARAMETER"
            | "MISSING_PARAMETER"
            | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONCURRENT_MODIFICATION" => StatusCode::CONFLICT,
            "INVALID_MOVE" | "HAS_CHILDREN" => StatusCode::UNPROCESSABLE_ENTITY,
            "LOCK_TIMEOUT" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        HttpError::new(rejection.body_text(), "INVALID_PARAMETER")
    }
}

impl From<TreeServiceError> for HttpError {
    fn from(err: TreeServiceError) -> Self {
        let message = err.to_string();

        match err {
            TreeServiceError::NodeNotFound { .. } => HttpError::new(message, "NODE_NOT_FOUND"),
            TreeServiceError::InvalidMove { .. } => HttpError::new(message, "INVALID_MOVE"),
            TreeServiceError::HasChildren { id, descendant_count } => HttpError::with_details(
                message,
                "HAS_CHILDREN",
                format!("node_id: {}, descendants: {}", id, descendant_count),
            ),
            TreeServiceError::ConcurrentModification {
                expected_revision,
                actual_revision,
            } => HttpError::with_details(
                message,
                "CONCURRENT_MODIFICATION",
                format!(
                    "expected revision: {}, actual revision: {}",
                    expected_revision, actual_revision
                ),
            ),
            TreeServiceError::ValidationFailed(_) => HttpError::new(message, "VALIDATION_ERROR"),
            TreeServiceError::LockTimeout { .. } => HttpError::new(message, "LOCK_TIMEOUT"),
            TreeServiceError::DatabaseError(e) => {
                tracing::error!("Tree store failure: {:?}", e);
                HttpError::new(message, "DATABASE_ERROR")
            }
        }
    }
}
