//! Configuration module for the news backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Upper bound for a single store call
    pub store_timeout: Duration,
    /// Largest accepted `limit` on the listing endpoint; unset means no cap
    pub max_page_limit: Option<u64>,
}

/// A configuration variable that could not be parsed.
#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("NEWS_DB_PATH")
            .unwrap_or_else(|_| "./data/news.sqlite".to_string())
            .into();

        let index_path = env::var("NEWS_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = parse_var("NEWS_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("NEWS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("NEWS_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(other) => {
                return Err(ConfigError {
                    var: "NEWS_LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let timeout_ms: u64 = parse_var("NEWS_STORE_TIMEOUT_MS", "5000")?;
        let max_page_limit = match env::var("NEWS_MAX_PAGE_LIMIT") {
            Ok(value) => match value.parse::<u64>() {
                Ok(limit) if limit > 0 => Some(limit),
                _ => {
                    return Err(ConfigError {
                        var: "NEWS_MAX_PAGE_LIMIT",
                        value,
                    })
                }
            },
            Err(_) => None,
        };

        Ok(Self {
            db_path,
            index_path,
            bind_addr,
            log_level,
            log_format,
            store_timeout: Duration::from_millis(timeout_ms),
            max_page_limit,
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(var).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError { var, value })
}
