//! Service banner and liveness probe.

use axum::{Json, Router, routing::get};
use serde::Serialize;

/// Version embedded at compile time from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to ModernBlog API",
        version: VERSION,
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
