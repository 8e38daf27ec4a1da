#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use modernblog::{
    ServerConfig, create_app,
    db::Database,
    jwt::{TokenConfig, TokenManager},
};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub tokens: Arc<TokenManager>,
}

/// Create a test app backed by an in-memory database.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(
        TokenConfig::new(TEST_SECRET),
        1000,
        1000,
    )
    .await
}

pub async fn create_test_app_with(
    token_config: TokenConfig,
    login_per_minute: u32,
    register_per_minute: u32,
) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let tokens = Arc::new(TokenManager::new(token_config).expect("Invalid token config"));
    let config = ServerConfig {
        db: db.clone(),
        tokens: tokens.clone(),
        login_per_minute,
        register_per_minute,
    };
    TestApp {
        router: create_app(&config),
        db,
        tokens,
    }
}

/// Token config with short TTLs for expiry tests.
pub fn short_lived_config(access_secs: u64, refresh_secs: u64) -> TokenConfig {
    TokenConfig::new(TEST_SECRET).with_ttls(
        Duration::from_secs(access_secs),
        Duration::from_secs(refresh_secs),
    )
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get_with_auth(&self, uri: &str, authorization: Option<&str>) -> (StatusCode, Value) {
        self.request_with_auth("GET", uri, authorization).await
    }

    pub async fn request_with_auth(
        &self,
        method: &str,
        uri: &str,
        authorization: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Register a user and return the response body.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/v1/auth/register",
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
