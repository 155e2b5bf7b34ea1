//! Plugin rows owned by a single user.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::{Executor, Sqlite};

use crate::plugin::{LifecycleResult, PluginManifest};

/// A row of the `plugin` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Plugin {
    pub id: String,
    pub user_id: String,
    pub plugin_slug: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub plugin_type: String,
    pub scope: String,
    pub bundle_method: String,
    pub bundle_location: String,
    pub is_local: bool,
    pub long_description: String,
    pub category: String,
    pub official: bool,
    pub author: String,
    pub compatibility: String,
    pub icon: String,
    pub source_type: String,
    pub source_url: String,
    pub update_check_url: String,
    pub installation_type: String,
    pub permissions: Json<Vec<String>>,
    pub enabled: bool,
    pub installed_at: i64,
    pub updated_at: i64,
}

impl Plugin {
    /// Build the row a user receives when installing `manifest`.
    pub fn from_manifest(manifest: &PluginManifest, user_id: &str, now: i64) -> Self {
        Self {
            id: manifest.plugin_id(user_id),
            user_id: user_id.to_string(),
            plugin_slug: manifest.plugin_slug.clone(),
            name: manifest.name.clone(),
            description: manifest.description.clone(),
            version: manifest.version.clone(),
            plugin_type: manifest.plugin_type.clone(),
            scope: manifest.scope.clone(),
            bundle_method: manifest.bundle_method.clone(),
            bundle_location: manifest.bundle_location.clone(),
            is_local: manifest.is_local,
            long_description: manifest.long_description.clone(),
            category: manifest.category.clone(),
            official: manifest.official,
            author: manifest.author.clone(),
            compatibility: manifest.compatibility.clone(),
            icon: manifest.icon.clone(),
            source_type: manifest.source_type.clone(),
            source_url: manifest.source_url.clone(),
            update_check_url: manifest.update_check_url.clone(),
            installation_type: manifest.installation_type.clone(),
            permissions: Json(manifest.permissions.clone()),
            enabled: true,
            installed_at: now,
            updated_at: now,
        }
    }

    /// Insert this row.
    pub async fn insert<'e, E>(&self, executor: E) -> LifecycleResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO plugin (
                id, user_id, plugin_slug, name, description, version, plugin_type,
                scope, bundle_method, bundle_location, is_local, long_description,
                category, official, author, compatibility, icon, source_type,
                source_url, update_check_url, installation_type, permissions,
                enabled, installed_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.user_id)
        .bind(&self.plugin_slug)
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.version)
        .bind(&self.plugin_type)
        .bind(&self.scope)
        .bind(&self.bundle_method)
        .bind(&self.bundle_location)
        .bind(self.is_local)
        .bind(&self.long_description)
        .bind(&self.category)
        .bind(self.official)
        .bind(&self.author)
        .bind(&self.compatibility)
        .bind(&self.icon)
        .bind(&self.source_type)
        .bind(&self.source_url)
        .bind(&self.update_check_url)
        .bind(&self.installation_type)
        .bind(&self.permissions)
        .bind(self.enabled)
        .bind(self.installed_at)
        .bind(self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Find a user's install of the plugin with the given slug.
    pub async fn find_for_user<'e, E>(
        executor: E,
        user_id: &str,
        plugin_slug: &str,
    ) -> LifecycleResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let plugin = sqlx::query_as::<_, Plugin>(
            "SELECT * FROM plugin WHERE user_id = ? AND plugin_slug = ?",
        )
        .bind(user_id)
        .bind(plugin_slug)
        .fetch_optional(executor)
        .await?;

        Ok(plugin)
    }

    /// List every plugin a user has installed.
    pub async fn list_for_user<'e, E>(executor: E, user_id: &str) -> LifecycleResult<Vec<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let plugins = sqlx::query_as::<_, Plugin>(
            "SELECT * FROM plugin WHERE user_id = ? ORDER BY plugin_slug",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(plugins)
    }

    /// Delete a user's plugin row. Module rows must already be gone.
    pub async fn delete_for_user<'e, E>(
        executor: E,
        user_id: &str,
        id: &str,
    ) -> LifecycleResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM plugin WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
