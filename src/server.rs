//! Axum router construction.
//!
//! The [`app`] function wires the recordings endpoints, the signed-blob
//! route, and the infrastructure endpoints (health, metrics, OpenAPI) and
//! returns a ready-to-serve [`axum::Router`].

use axum::{
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::errors::generate_request_id;
use crate::handlers::{blobs, recordings};
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

// -- OpenAPI specification ----------------------------------------------------

/// OpenAPI documentation for the recordings gateway.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Recordings Gateway API",
        version = "0.1.0",
        description = "List, sign, rename and delete recordings in an object-storage bucket"
    ),
    paths(
        health_check,
        crate::handlers::recordings::list_recordings,
        crate::handlers::recordings::post_recordings,
    ),
    components(schemas(
        crate::recording::Recording,
        crate::recording::RecordingList,
        crate::gateway::ActionRequest,
        crate::gateway::LinkResponse,
        crate::gateway::ActionAck,
        crate::errors::ErrorBody,
    )),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Recordings", description = "Recording list and actions"),
    )
)]
pub struct ApiDoc;

/// Build the axum [`Router`] with all routes enabled by `state.config`.
pub fn app(state: Arc<AppState>) -> Router {
    let observability = state.config.observability.clone();

    let mut router = Router::new()
        .route(
            "/recordings",
            get(recordings::list_recordings).post(recordings::post_recordings),
        )
        .route("/openapi.json", get(openapi_json));

    if state.blobs.is_some() {
        router = router.route("/blobs/*key", get(blobs::get_blob));
    }
    if observability.health_check {
        router = router.route("/health", get(health_check));
    }
    if observability.metrics {
        router = router.route("/metrics", get(metrics_handler));
    }

    let router = router
        .with_state(state)
        .layer(middleware::from_fn(common_headers_middleware));

    let router = if observability.metrics {
        router.layer(middleware::from_fn(metrics_middleware))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

// -- Common headers middleware -----------------------------------------------

/// Adds `x-request-id` (16 uppercase hex chars), `date` and `server` to
/// every response.
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&generate_request_id()) {
            headers.insert("x-request-id", value);
        }
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    if let Ok(value) = HeaderValue::from_str(&date) {
        headers.insert("date", value);
    }
    headers.insert("server", HeaderValue::from_static("recordings-gateway"));

    response
}

// -- Infrastructure handlers ---------------------------------------------------

/// `GET /health` -- liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up"))
)]
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /openapi.json`
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::tests::FlakyBackend;
    use crate::gateway::Gateway;
    use crate::storage::memory::MemoryBackend;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn memory_app() -> (Arc<MemoryBackend>, Router) {
        let backend = Arc::new(MemoryBackend::new("http://localhost:9012", "test-secret"));
        let state = Arc::new(AppState {
            config: Config::default(),
            gateway: Gateway::new(backend.clone()),
            blobs: Some(backend.clone()),
        });
        (backend, app(state))
    }

    fn flaky_app() -> (Arc<FlakyBackend>, Router) {
        let backend = Arc::new(FlakyBackend::new());
        let state = Arc::new(AppState {
            config: Config::default(),
            gateway: Gateway::new(backend.clone()),
            blobs: None,
        });
        (backend, app(state))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Bytes) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    async fn send_json(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_empty_bucket_lists_empty_array() {
        let (_backend, app) = memory_app();
        let (status, body) = send_json(&app, Method::GET, "/recordings", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "recordings": [] }));
    }

    #[tokio::test]
    async fn test_rename_then_delete_scenario() {
        let (backend, app) = memory_app();
        backend
            .put_at(
                "take1.wav",
                Bytes::from(vec![0u8; 2_097_152]),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            )
            .await;

        let (status, body) = send_json(&app, Method::GET, "/recordings", "").await;
        assert_eq!(status, StatusCode::OK);
        let list = body["recordings"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["Key"], "take1.wav");
        assert_eq!(list[0]["Size"], 2_097_152);

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/recordings",
            r#"{"action":"rename","oldFileName":"take1.wav","newFileName":"take2.wav"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Renamed file from take1.wav to take2.wav");

        let (_, body) = send_json(&app, Method::GET, "/recordings", "").await;
        let list = body["recordings"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["Key"], "take2.wav");

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/recordings",
            r#"{"action":"delete","oldFileName":"take2.wav"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Deleted file: take2.wav");

        let (_, body) = send_json(&app, Method::GET, "/recordings", "").await;
        assert_eq!(body, serde_json::json!({ "recordings": [] }));
    }

    #[tokio::test]
    async fn test_invalid_actions_never_reach_backend() {
        let (backend, app) = flaky_app();
        for body in [
            "",
            "garbage",
            r#"{"action":"explode"}"#,
            r#"{"action":"delete"}"#,
            r#"{"action":"rename","oldFileName":"a.wav","newFileName":""}"#,
            r#"{"action":"presigned-url","fileName":""}"#,
        ] {
            let (status, json) = send_json(&app, Method::POST, "/recordings", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json["error"], "Invalid action or missing parameters");
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failures_map_to_500() {
        let (backend, app) = flaky_app();
        backend.fail_list.store(true, Ordering::SeqCst);
        backend.fail_presign.store(true, Ordering::SeqCst);
        backend.fail_delete.store(true, Ordering::SeqCst);
        backend.fail_copy.store(true, Ordering::SeqCst);

        let (status, body) = send_json(&app, Method::GET, "/recordings", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch recordings.");

        let cases = [
            (
                r#"{"action":"presigned-url","fileName":"a.wav"}"#,
                "Failed to generate presigned URL.",
            ),
            (
                r#"{"action":"delete","oldFileName":"a.wav"}"#,
                "Failed to delete file.",
            ),
            (
                r#"{"action":"rename","oldFileName":"a.wav","newFileName":"b.wav"}"#,
                "Failed to rename file.",
            ),
        ];
        for (request, message) in cases {
            let (status, body) = send_json(&app, Method::POST, "/recordings", request).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"], message);
        }
    }

    #[tokio::test]
    async fn test_presigned_url_is_served_by_blob_route() {
        let (backend, app) = memory_app();
        backend.put("take1.wav", Bytes::from("RIFF....WAVE")).await;

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/recordings",
            r#"{"action":"presigned-url","fileName":"take1.wav"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let url = body["url"].as_str().unwrap();
        let path = url.strip_prefix("http://localhost:9012").unwrap();

        let (status, bytes) = send(&app, Method::GET, path, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, Bytes::from("RIFF....WAVE"));

        let tampered = path.replace("signature=", "signature=00");
        let (status, _) = send(&app, Method::GET, &tampered, "").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_expired_blob_link_is_forbidden() {
        let (backend, app) = memory_app();
        backend.put("take1.wav", Bytes::from("audio")).await;
        let link = backend.signed_link("take1.wav", Utc::now().timestamp() - 1);
        let path = link.strip_prefix("http://localhost:9012").unwrap();

        let (status, _) = send(&app, Method::GET, path, "").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_blob_route_absent_without_memory_backend() {
        let (_backend, app) = flaky_app();
        let (status, _) = send(
            &app,
            Method::GET,
            "/blobs/take1.wav?expires=1&signature=00",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_common_headers() {
        let (_backend, app) = memory_app();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["server"], "recordings-gateway");
        assert_eq!(resp.headers()["x-request-id"].len(), 16);
        assert!(resp.headers().contains_key("date"));
    }

    #[tokio::test]
    async fn test_health_can_be_disabled() {
        let backend = Arc::new(MemoryBackend::new("http://localhost:9012", "s"));
        let mut config = Config::default();
        config.observability.health_check = false;
        let app = app(Arc::new(AppState {
            config,
            gateway: Gateway::new(backend),
            blobs: None,
        }));
        let (status, _) = send(&app, Method::GET, "/health", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_openapi_lists_recordings_path() {
        let (_backend, app) = memory_app();
        let (status, body) = send_json(&app, Method::GET, "/openapi.json", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/recordings"]["get"].is_object());
        assert!(body["paths"]["/recordings"]["post"].is_object());
    }
}
