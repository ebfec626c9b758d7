//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::util::time::DEFAULT_TICK_MILLIS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human readable text
    pub log_json: bool,

    /// JSON file holding the car and track catalog
    pub data_file: PathBuf,
    /// Period between two race ticks
    pub tick_period: Duration,

    /// Allowed client origin for CORS
    pub client_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = resolve_server_addr(
            env::var("PORT").ok(),
            env::var("SERVER_ADDR").ok(),
            env::var("ADDR").ok(),
        );

        let tick_millis = match env::var("RACE_TICK_MS") {
            Ok(raw) => parse_tick_millis(&raw)?,
            Err(_) => DEFAULT_TICK_MILLIS,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            data_file: env::var("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data.json")),
            tick_period: Duration::from_millis(tick_millis),

            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://lvh.me:3000".to_string()),
        })
    }
}

/// Hosting platforms hand out PORT; otherwise SERVER_ADDR, then the older
/// ADDR name, then the default
fn resolve_server_addr(
    port: Option<String>,
    server_addr: Option<String>,
    addr: Option<String>,
) -> String {
    match (port, server_addr.or(addr)) {
        (Some(port), _) => format!("0.0.0.0:{}", port),
        (None, Some(addr)) => addr,
        (None, None) => "0.0.0.0:3001".to_string(),
    }
}

fn parse_tick_millis(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidTickPeriod(raw.to_string())),
        Ok(millis) => Ok(millis),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid RACE_TICK_MS value: {0:?} (expected a positive number of milliseconds)")]
    InvalidTickPeriod(String),
}
