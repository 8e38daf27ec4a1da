//! Per-request access logging.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{error, info};

/// Emit one structured event per request with method, path, status and
/// latency. Server errors are logged at `error`, everything else at `info`.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = match request.uri().query() {
        Some(query) => format!("{}?{}", request.uri().path(), query),
        None => request.uri().path().to_string(),
    };

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

    if response.status().is_server_error() {
        error!(%method, %path, status, latency_ms, "Request failed");
    } else {
        info!(%method, %path, status, latency_ms, "Request handled");
    }

    response
}
