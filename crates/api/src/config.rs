use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Which [`DataStore`](dealerdesk_core::store::DataStore) backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Postgres via `DATABASE_URL`.
    Postgres,
    /// Process memory; for local development only.
    Memory,
}

impl StoreKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Some(Self::Postgres),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Timeout for read requests in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Timeout for archive runs in seconds (default: `120`). The run itself
    /// continues past it; only the response stops waiting.
    pub archive_timeout_secs: u64,
    /// Data store backend (default: `postgres`).
    pub store: StoreKind,
    /// Run each archive in one database transaction (default: `false`).
    /// Ignored by the memory store.
    pub archive_atomic: bool,
    /// Optional JSON file of extra archive job descriptors.
    pub archive_jobs_path: Option<PathBuf>,
    /// Log output format (default: `text`).
    pub log_format: LogFormat,
    /// JWT validation settings.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `ARCHIVE_TIMEOUT_SECS` | `120`                      |
    /// | `DATA_STORE`           | `postgres`                 |
    /// | `ARCHIVE_ATOMIC`       | `false`                    |
    /// | `ARCHIVE_JOBS_PATH`    | unset                      |
    /// | `LOG_FORMAT`           | `text`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let archive_timeout_secs: u64 = std::env::var("ARCHIVE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("ARCHIVE_TIMEOUT_SECS must be a valid u64");

        let store = StoreKind::parse(
            &std::env::var("DATA_STORE").unwrap_or_else(|_| "postgres".into()),
        )
        .expect("DATA_STORE must be `postgres` or `memory`");

        let archive_atomic = parse_bool(
            &std::env::var("ARCHIVE_ATOMIC").unwrap_or_else(|_| "false".into()),
        )
        .expect("ARCHIVE_ATOMIC must be true or false");

        let archive_jobs_path = std::env::var("ARCHIVE_JOBS_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            archive_timeout_secs,
            store,
            archive_atomic,
            archive_jobs_path,
            log_format,
            jwt,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
