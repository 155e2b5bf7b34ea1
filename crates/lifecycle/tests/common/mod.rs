#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test gets its own in-memory SQLite database with the real schema,
//! so tests never share rows.

#![allow(dead_code)]

use sqlx::SqlitePool;

use plugin_lifecycle::plugin::{LifecycleManager, PluginManifest};
use plugin_lifecycle::{Config, db};

/// Fresh in-memory database with the `plugin` and `module` tables.
pub async fn test_pool() -> SqlitePool {
    let pool = db::create_pool(&Config::for_database("sqlite::memory:"))
        .await
        .expect("failed to create in-memory pool");
    db::ensure_schema(&pool)
        .await
        .expect("failed to create schema");
    pool
}

/// Manager for the bundled plugin on a fresh database.
pub async fn test_manager() -> LifecycleManager {
    let manifest = PluginManifest::builtin().expect("bundled manifest must parse");
    LifecycleManager::new(test_pool().await, manifest)
}

/// Count all plugin rows owned by a user.
pub async fn plugin_rows(pool: &SqlitePool, user_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM plugin WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Count all module rows owned by a user.
pub async fn module_rows(pool: &SqlitePool, user_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM module WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
