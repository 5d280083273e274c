//! Prometheus metrics for the recordings gateway.
//!
//! Installs a global Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides an axum middleware for HTTP RED
//! metrics, and exposes the `/metrics` endpoint handler.

use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::errors::GatewayError;
use std::time::Instant;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, path, status.
pub const HTTP_REQUESTS_TOTAL: &str = "recordings_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, path.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "recordings_http_request_duration_seconds";

/// Total gateway operations (counter). Labels: operation, status (`ok` or
/// the error code).
pub const GATEWAY_OPERATIONS_TOTAL: &str = "recordings_gateway_operations_total";

// -- Global recorder installation ---------------------------------------------

/// Singleton handle to the Prometheus recorder.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus metrics recorder. Idempotent.
pub fn init_metrics() -> anyhow::Result<&'static PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Register metric descriptions with the global recorder.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(GATEWAY_OPERATIONS_TOTAL, "Total gateway operations by type");
}

/// Count one gateway operation. A no-op until a recorder is installed.
pub fn record_operation<T>(operation: &'static str, result: &Result<T, GatewayError>) {
    counter!(
        GATEWAY_OPERATIONS_TOTAL,
        "operation" => operation,
        "status" => operation_status(result)
    )
    .increment(1);
}

/// `status` label for an operation outcome.
fn operation_status<T>(result: &Result<T, GatewayError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    }
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes `/metrics` from self-instrumentation.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    if req.uri().path() == "/metrics" {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path, "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

// -- Path normalization -------------------------------------------------------

/// Normalize a request path to a route template for metric labels, so
/// object keys never become label values.
///
/// - `/blobs/take1.wav` -> `/blobs/{key}`
/// - `/recordings` -> `/recordings`
/// - anything unrouted -> `other`
fn normalize_path(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/recordings" => "/recordings",
        "/health" => "/health",
        "/openapi.json" => "/openapi.json",
        p if p.starts_with("/blobs/") => "/blobs/{key}",
        _ => "other",
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled").into_response(),
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_fixed_routes() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/recordings"), "/recordings");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/openapi.json"), "/openapi.json");
    }

    #[test]
    fn test_normalize_path_blob_keys() {
        assert_eq!(normalize_path("/blobs/take1.wav"), "/blobs/{key}");
        assert_eq!(normalize_path("/blobs/a/b/c.wav"), "/blobs/{key}");
    }

    #[test]
    fn test_operation_status_uses_error_code() {
        assert_eq!(operation_status(&Ok::<(), GatewayError>(())), "ok");
        assert_eq!(
            operation_status::<()>(&Err(GatewayError::invalid("missing action"))),
            "InvalidRequest"
        );
        assert_eq!(
            operation_status::<()>(&Err(GatewayError::ListFailed(anyhow::anyhow!("down")))),
            "ListFailed"
        );
    }

    #[test]
    fn test_normalize_path_unknown() {
        assert_eq!(normalize_path("/recordings/extra"), "other");
        assert_eq!(normalize_path("/wp-admin"), "other");
    }
}
