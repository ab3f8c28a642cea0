//! Application configuration loaded from environment variables.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use strum::{Display, EnumString};

/// How the search endpoints treat their filter parameter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SearchMode {
    /// Accept the parameter but run the unfiltered query.
    #[default]
    Passthrough,
    /// Bind the parameter as an equality predicate when present.
    Filter,
}

impl SearchMode {
    /// The value to bind into the search predicate, if any.
    pub fn filter_value(self, requested: Option<&str>) -> Option<&str> {
        match self {
            SearchMode::Passthrough => None,
            SearchMode::Filter => requested,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Deserialize)]
pub struct Config {
    // === Database ===
    /// Database server host name.
    #[serde(default = "default_db_host")]
    pub db_host: String,

    /// Database server port.
    #[serde(default = "default_db_port")]
    pub db_port: u16,

    /// Database user.
    pub db_username: String,

    /// Database password.
    #[serde(default)]
    pub db_password: String,

    /// Schema holding the `patients` and `providers` tables.
    pub db_name: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_connection_limit")]
    pub db_connection_limit: u32,

    /// Upper bound on waiting for a pooled connection. Unset falls back to
    /// the store's 30 second default.
    #[serde(default)]
    pub db_acquire_timeout_secs: Option<u64>,

    // === Server ===
    /// HTTP listening port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Search parameter handling.
    #[serde(default)]
    pub search_mode: SearchMode,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_connection_limit() -> u32 {
    10
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Connection parameters handed to the pool.
#[derive(Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout: Option<Duration>,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_username", &self.db_username)
            .field("db_password", &"***")
            .field("db_name", &self.db_name)
            .field("db_connection_limit", &self.db_connection_limit)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("port", &self.port)
            .field("search_mode", &self.search_mode)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.db_username.is_empty() {
            return Err("DB_USERNAME is required".to_string());
        }

        if self.db_name.is_empty() {
            return Err("DB_NAME is required".to_string());
        }

        if self.db_connection_limit == 0 {
            return Err("DB_CONNECTION_LIMIT must be at least 1".to_string());
        }

        if self.db_acquire_timeout_secs == Some(0) {
            return Err("DB_ACQUIRE_TIMEOUT_SECS must be positive when set".to_string());
        }

        Ok(())
    }

    /// Directive for the log filter; blank falls back to `info`.
    pub fn log_directive(&self) -> &str {
        match self.rust_log.trim() {
            "" => "info",
            directive => directive,
        }
    }

    /// Pool settings derived from the `DB_*` variables.
    pub fn database(&self) -> DatabaseSettings {
        DatabaseSettings {
            host: self.db_host.clone(),
            port: self.db_port,
            username: self.db_username.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
            max_connections: self.db_connection_limit,
            acquire_timeout: self.db_acquire_timeout_secs.map(Duration::from_secs),
        }
    }
}
