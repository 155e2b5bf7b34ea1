//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://braindrive.db?mode=rwc";

/// Lifecycle manager configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL of the host database (default: ./braindrive.db).
    pub database_url: String,

    /// Maximum database connections in pool (default: 5).
    pub database_max_connections: u32,

    /// Optional `.info.toml` that replaces the bundled plugin metadata.
    pub manifest_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let database_max_connections = get("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let manifest_path = get("PLUGIN_MANIFEST")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            database_url,
            database_max_connections,
            manifest_path,
        })
    }

    /// Configuration for a given database URL with default pool settings.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            database_max_connections: 5,
            manifest_path: None,
        }
    }
}
