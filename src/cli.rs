//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;
use std::time::Duration;

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, TokenConfig, TokenManager};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "modernblog", about = "ModernBlog API server")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_URL", default_value = "modernblog.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TTL.as_secs())]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_TTL.as_secs())]
    pub refresh_ttl_secs: u64,

    /// Clock-skew tolerance for token expiry and not-before checks, in seconds
    #[arg(long, default_value_t = 0)]
    pub clock_skew_secs: u64,

    /// Login attempts allowed per client IP per minute
    #[arg(long, default_value_t = 10)]
    pub login_per_minute: u32,

    /// Registrations allowed per client IP per minute
    #[arg(long, default_value_t = 3)]
    pub register_per_minute: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
/// Verbosity follows `RUST_LOG`, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_secret_length(&secret)?;
    Some(secret)
}

fn validate_secret_length(secret: &str) -> Option<()> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} bytes. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(())
}

/// Build the token manager from the secret and TTL arguments.
/// Returns None and logs an error if the combination is rejected.
pub fn build_token_manager(args: &Args, jwt_secret: String) -> Option<Arc<TokenManager>> {
    let config = TokenConfig::new(jwt_secret.into_bytes())
        .with_ttls(
            Duration::from_secs(args.access_ttl_secs),
            Duration::from_secs(args.refresh_ttl_secs),
        )
        .with_leeway(args.clock_skew_secs);

    match TokenManager::new(config) {
        Ok(tokens) => {
            info!(
                access_ttl_secs = args.access_ttl_secs,
                refresh_ttl_secs = args.refresh_ttl_secs,
                clock_skew_secs = args.clock_skew_secs,
                "Token manager configured"
            );
            Some(Arc::new(tokens))
        }
        Err(e) => {
            error!(error = %e, "Invalid token configuration");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, tokens: Arc<TokenManager>) -> ServerConfig {
    ServerConfig {
        db,
        tokens,
        login_per_minute: args.login_per_minute,
        register_per_minute: args.register_per_minute,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
