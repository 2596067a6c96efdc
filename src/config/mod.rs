//! Configuration module for the folio backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Email of the single admin account
    pub admin_email: String,
    /// Admin password; sign-in is disabled when unset
    pub admin_password: Option<String>,
    /// Buffered snapshots per roster before it lags
    pub notify_capacity: usize,
    /// Idle time after which an admin session and its roster are dropped
    pub session_ttl: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { var, value } => write!(f, "invalid {} value {:?}", var, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("FOLIO_DB_PATH")
            .unwrap_or_else(|_| "./data/folio.sqlite".to_string())
            .into();

        let bind_addr = parse_var("FOLIO_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("FOLIO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admin_email =
            env::var("FOLIO_ADMIN_EMAIL").unwrap_or_else(|_| "admin@localhost".to_string());

        let admin_password = env::var("FOLIO_ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());

        let notify_capacity = parse_var("FOLIO_NOTIFY_CAPACITY", "64")?;

        let session_ttl = parse_ttl("FOLIO_SESSION_TTL_SECS", "86400")?;

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            admin_email,
            admin_password,
            notify_capacity,
            session_ttl,
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(var).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn parse_ttl(var: &'static str, default: &str) -> Result<Duration, ConfigError> {
    match parse_var::<u64>(var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
