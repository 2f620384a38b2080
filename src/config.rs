//! Service configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::IpAddr;

use chrono::FixedOffset;

use crate::ledger::LedgerSettings;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: IpAddr,

    /// First port tried when binding
    pub port: u16,

    /// PostgreSQL connection string, in-memory store when unset
    pub database_url: Option<String>,

    /// Postgres pool size
    pub db_max_connections: u32,

    /// HS256 secret shared with the auth service
    pub jwt_secret: String,

    /// Station wall clock, minutes east of UTC
    pub station_utc_offset_minutes: i32,

    /// Retries after a stock write loses a version check
    pub stock_write_retries: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Config {
            host: parse_or(&lookup, "HOST", "127.0.0.1")?,
            port: parse_or(&lookup, "PORT", "3000")?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", "10")?,
            jwt_secret: lookup("JWT_SECRET")
                .filter(|secret| !secret.is_empty())
                .ok_or_else(|| ConfigError::MissingRequired("JWT_SECRET".to_string()))?,
            station_utc_offset_minutes: parse_or(&lookup, "STATION_UTC_OFFSET_MINUTES", "0")?,
            stock_write_retries: parse_or(&lookup, "STOCK_WRITE_RETRIES", "3")?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        config.station_offset()?;

        Ok(config)
    }

    pub fn station_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.station_utc_offset_minutes * 60)
            .ok_or_else(|| ConfigError::InvalidValue("STATION_UTC_OFFSET_MINUTES".to_string()))
    }

    pub fn ledger_settings(&self) -> Result<LedgerSettings, ConfigError> {
        Ok(LedgerSettings {
            station_offset: self.station_offset()?,
            write_retries: self.stock_write_retries,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError> {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
