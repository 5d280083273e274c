//! `/recordings` handlers: list on GET, action dispatch on POST.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use tracing::debug;

use crate::errors::{ErrorBody, GatewayError};
use crate::gateway::{parse_action, ActionOutcome, ActionRequest};
use crate::recording::RecordingList;
use crate::AppState;

/// `GET /recordings` -- every recording currently in the bucket.
#[utoipa::path(
    get,
    path = "/recordings",
    tag = "Recordings",
    operation_id = "ListRecordings",
    responses(
        (status = 200, description = "Current bucket contents", body = RecordingList),
        (status = 500, description = "Backend listing failed", body = ErrorBody)
    )
)]
pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecordingList>, GatewayError> {
    let recordings = state.gateway.list().await?;
    Ok(Json(RecordingList { recordings }))
}

/// `POST /recordings` -- `presigned-url`, `delete` or `rename`.
///
/// The body is read raw so that non-JSON input is reported as an invalid
/// request rather than an extractor rejection.
#[utoipa::path(
    post,
    path = "/recordings",
    tag = "Recordings",
    operation_id = "RecordingAction",
    request_body = ActionRequest,
    responses(
        (status = 200, description = "`{url}` for presigned-url, `{success, message}` for delete and rename"),
        (status = 400, description = "Invalid action or missing parameters", body = ErrorBody),
        (status = 500, description = "Backend operation failed", body = ErrorBody)
    )
)]
pub async fn post_recordings(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ActionOutcome>, GatewayError> {
    let action = parse_action(&body).inspect_err(|e| {
        if let GatewayError::InvalidRequest { reason } = e {
            debug!("Rejected recordings action: {}", reason);
        }
    })?;
    let outcome = state.gateway.execute(action).await?;
    Ok(Json(outcome))
}
