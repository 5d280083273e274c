//! Gateway error taxonomy.
//!
//! Every gateway operation returns `Result<_, GatewayError>`.  The enum
//! implements [`axum::response::IntoResponse`], so the HTTP layer maps a
//! failure to its status code and `{"error": "..."}` body in one place.
//! Backend detail is carried as the error source for logging and never
//! reaches the response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Which half of a copy-then-delete rename failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameStage {
    /// Copying to the new key failed; storage is unchanged.
    Copy,
    /// The copy landed but removing the old key failed; both keys exist.
    DeleteSource,
}

impl std::fmt::Display for RenameStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenameStage::Copy => f.write_str("copy"),
            RenameStage::DeleteSource => f.write_str("delete-source"),
        }
    }
}

/// Errors surfaced by the storage gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed body, unknown action, or a missing/invalid field.
    /// Detected before any backend call.
    #[error("Invalid action or missing parameters")]
    InvalidRequest { reason: String },

    /// The backend listing failed; no partial result is returned.
    #[error("Failed to fetch recordings.")]
    ListFailed(#[source] anyhow::Error),

    /// The backend refused to sign a link for `key`.
    #[error("Failed to generate presigned URL.")]
    LinkFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The backend failed to delete `key`.
    #[error("Failed to delete file.")]
    DeleteFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// One of the two rename steps failed. See [`RenameStage`].
    #[error("Failed to rename file.")]
    RenameFailed {
        old_key: String,
        new_key: String,
        stage: RenameStage,
        #[source]
        source: anyhow::Error,
    },
}

impl GatewayError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        GatewayError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the variant.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest { .. } => "InvalidRequest",
            GatewayError::ListFailed(_) => "ListFailed",
            GatewayError::LinkFailed { .. } => "LinkFailed",
            GatewayError::DeleteFailed { .. } => "DeleteFailed",
            GatewayError::RenameFailed { .. } => "RenameFailed",
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            GatewayError::ListFailed(_)
            | GatewayError::LinkFailed { .. }
            | GatewayError::DeleteFailed { .. }
            | GatewayError::RenameFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_id_shape() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::invalid("no action").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::ListFailed(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err = GatewayError::RenameFailed {
            old_key: "a".into(),
            new_key: "b".into(),
            stage: RenameStage::DeleteSource,
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "RenameFailed");
    }

    #[test]
    fn test_message_hides_backend_detail() {
        let err = GatewayError::LinkFailed {
            key: "take1.wav".into(),
            source: anyhow::anyhow!("AWS S3 get_object: secret detail"),
        };
        assert_eq!(err.to_string(), "Failed to generate presigned URL.");
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let resp = GatewayError::invalid("unknown action").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Invalid action or missing parameters");
    }
}
