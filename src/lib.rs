pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod request_log;
pub mod shutdown;

use api::{create_api_router, create_root_router};
use axum::{Router, middleware};
use db::Database;
use jwt::TokenManager;
use rate_limit::RateLimitConfig;
use request_log::log_requests;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token issuer/validator shared by every route
    pub tokens: Arc<TokenManager>,
    /// Login attempts allowed per client IP per minute
    pub login_per_minute: u32,
    /// Registrations allowed per client IP per minute
    pub register_per_minute: u32,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let rate_limit = Arc::new(RateLimitConfig::new(
        config.login_per_minute,
        config.register_per_minute,
    ));

    let api_router = create_api_router(config.db.clone(), config.tokens.clone(), rate_limit);

    Router::new()
        .merge(create_root_router())
        .nest("/api/v1", api_router)
        .layer(middleware::from_fn(log_requests))
}

/// Run the server on the given listener until a shutdown signal arrives.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown::signal())
        .await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        let app = create_app(&config);
        let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, make_service).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
