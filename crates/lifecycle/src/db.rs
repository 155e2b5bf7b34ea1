//! Database connection pool and schema management.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

/// Create a SQLite connection pool with foreign keys enforced.
///
/// In-memory databases live only as long as their connection, so the pool is
/// clamped to a single connection that is never recycled.
pub async fn create_pool(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("invalid database URL: {}", config.database_url))?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool_options = if is_memory_url(&config.database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(config.database_max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .context("failed to connect to SQLite")?;

    Ok(pool)
}

/// Create the `plugin` and `module` tables if they do not exist.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS plugin (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            plugin_slug TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            version TEXT NOT NULL,
            plugin_type TEXT NOT NULL,
            scope TEXT NOT NULL,
            bundle_method TEXT NOT NULL,
            bundle_location TEXT NOT NULL,
            is_local INTEGER NOT NULL,
            long_description TEXT NOT NULL,
            category TEXT NOT NULL,
            official INTEGER NOT NULL,
            author TEXT NOT NULL,
            compatibility TEXT NOT NULL,
            icon TEXT NOT NULL,
            source_type TEXT NOT NULL,
            source_url TEXT NOT NULL,
            update_check_url TEXT NOT NULL,
            installation_type TEXT NOT NULL,
            permissions TEXT NOT NULL,
            enabled INTEGER NOT NULL,
            installed_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (user_id, plugin_slug)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create plugin table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS module (
            id TEXT PRIMARY KEY,
            plugin_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            description TEXT NOT NULL,
            icon TEXT NOT NULL,
            category TEXT NOT NULL,
            priority INTEGER NOT NULL,
            props TEXT NOT NULL,
            config_fields TEXT NOT NULL,
            messages TEXT NOT NULL,
            required_services TEXT NOT NULL,
            dependencies TEXT NOT NULL,
            layout TEXT NOT NULL,
            tags TEXT NOT NULL,
            enabled INTEGER NOT NULL,
            installed_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (plugin_id, name),
            FOREIGN KEY (plugin_id) REFERENCES plugin(id)
        )",
    )
    .execute(pool)
    .await
    .context("failed to create module table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_module_plugin ON module(plugin_id, user_id)")
        .execute(pool)
        .await
        .context("failed to create module index")?;

    Ok(())
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
