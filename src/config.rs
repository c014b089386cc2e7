//! Process configuration.
//!
//! Resolved once at startup from environment variables; every handler sees it
//! through the shared application state.

use std::path::PathBuf;

use rand::RngCore;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind (`HOST`, default `127.0.0.1`).
    pub host: String,
    /// Port to bind (`PORT`, default `8000`).
    pub port: u16,
    /// SQLite database file (`DATABASE_PATH`, default `tasklist.db`).
    pub database_path: PathBuf,
    /// Secret used to sign session cookies (`SESSION_SECRET`).
    pub session_secret: String,
    /// Session lifetime in days (`SESSION_TTL_DAYS`, default `30`).
    pub session_ttl_days: i64,
}

impl Config {
    /// Build a configuration from the environment.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);
        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "tasklist.db".to_string())
            .into();
        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                tracing::warn!(
                    "SESSION_SECRET not set; generated a per-process secret, \
                     sessions will not survive a restart"
                );
                random_secret()
            }
        };
        let session_ttl_days = std::env::var("SESSION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Self {
            host,
            port,
            database_path,
            session_secret,
            session_ttl_days,
        }
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
