//! configuration types for aerolog

use serde::{Deserialize, Serialize};

/// main configuration for aerolog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// public url of the server.
    pub server_url: String,

    /// address to bind the http server to.
    pub listen_addr: String,

    /// database configuration.
    pub database: DatabaseConfig,

    /// measurement ingestion configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            database: DatabaseConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

/// database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// database type: "sqlite" or "postgres".
    pub db_type: String,

    /// database connection string or file path.
    pub connection_string: String,

    /// sqlite-specific options.
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            connection_string: "/var/lib/aerolog/db.sqlite".to_string(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// sqlite tuning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// enable write-ahead-log journal mode.
    pub write_ahead_log: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            write_ahead_log: true,
        }
    }
}

/// measurement ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// accept uploads from enrolled devices without checking the device
    /// key. intended for lab and migration setups only; every production
    /// deployment should leave this off.
    #[serde(default)]
    pub allow_unverified: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            allow_unverified: false,
        }
    }
}
