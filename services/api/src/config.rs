//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs the service on in-memory stores.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub feed_limit: NonZeroUsize,
    pub session_ttl_days: i64,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            db_max_connections: 5,
            log_level: Level::INFO,
            feed_limit: callmyshot_core::DEFAULT_FEED_LIMIT,
            session_ttl_days: 30,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server and Database Settings ---
        let bind_address = match lookup("BIND_ADDRESS") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            None => defaults.bind_address,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "DB_MAX_CONNECTIONS".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    )
                })?,
            None => defaults.db_max_connections,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Feed and Session Settings ---
        let feed_limit = match lookup("FEED_LIMIT") {
            Some(raw) => raw.parse::<NonZeroUsize>().map_err(|_| {
                ConfigError::InvalidValue(
                    "FEED_LIMIT".to_string(),
                    format!("'{}' is not a positive integer", raw),
                )
            })?,
            None => defaults.feed_limit,
        };

        let session_ttl_days = match lookup("SESSION_TTL_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "SESSION_TTL_DAYS".to_string(),
                        format!("'{}' is not a positive number of days", raw),
                    )
                })?,
            None => defaults.session_ttl_days,
        };

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            feed_limit,
            session_ttl_days,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.database_url, None);
        assert_eq!(config.feed_limit.get(), 10);
        assert_eq!(config.session_ttl_days, 30);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("DATABASE_URL", "postgres://localhost/shots"),
            ("FEED_LIMIT", "25"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shots"));
        assert_eq!(config.feed_limit.get(), 25);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn rejects_zero_feed_limit() {
        let err = load(&[("FEED_LIMIT", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "FEED_LIMIT"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(load(&[("RUST_LOG", "chatty")]).is_err());
    }

    #[test]
    fn blank_database_url_means_memory() {
        let config = load(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.database_url, None);
    }
}
