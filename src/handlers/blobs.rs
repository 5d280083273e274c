//! `GET /blobs/*key` -- serves links signed by the in-memory backend.
//!
//! Only routed when the memory backend is active; with S3 the signed links
//! point at S3 itself.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ErrorBody;
use crate::storage::memory::LinkRejection;
use crate::AppState;

/// Query parameters carried by a signed link.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Content type guessed from the key's extension.
fn mime_for(key: &str) -> &'static str {
    match key.rsplit('.').next().unwrap_or("").to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

pub async fn get_blob(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Response {
    let Some(blobs) = state.blobs.as_ref() else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };

    match blobs
        .open_signed(&key, query.expires, &query.signature, Utc::now())
        .await
    {
        Ok(data) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime_for(&key))],
            data,
        )
            .into_response(),
        Err(rejection) => {
            debug!("Refused signed link for {}: {}", key, rejection);
            match rejection {
                LinkRejection::Expired | LinkRejection::BadSignature => {
                    error(StatusCode::FORBIDDEN, "Access Denied")
                }
                LinkRejection::NotFound => error(StatusCode::NOT_FOUND, "Not Found"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("take1.wav"), "audio/wav");
        assert_eq!(mime_for("TAKE1.WAV"), "audio/wav");
        assert_eq!(mime_for("song.mp3"), "audio/mpeg");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
