//! Module rows: UI components belonging to an installed plugin.

use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{Executor, Sqlite};

use crate::plugin::{LifecycleResult, ModuleManifest, PluginManifest};

/// A row of the `module` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Module {
    pub id: String,
    pub plugin_id: String,
    pub user_id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    pub priority: i64,
    pub props: Json<JsonValue>,
    pub config_fields: Json<JsonValue>,
    pub messages: Json<JsonValue>,
    pub required_services: Json<JsonValue>,
    pub dependencies: Json<Vec<String>>,
    pub layout: Json<JsonValue>,
    pub tags: Json<Vec<String>>,
    pub enabled: bool,
    pub installed_at: i64,
    pub updated_at: i64,
}

impl Module {
    /// Build the row for one module descriptor of `plugin`.
    pub fn from_manifest(
        plugin: &PluginManifest,
        module: &ModuleManifest,
        user_id: &str,
        now: i64,
    ) -> Self {
        Self {
            id: plugin.module_id(user_id, &module.name),
            plugin_id: plugin.plugin_id(user_id),
            user_id: user_id.to_string(),
            name: module.name.clone(),
            display_name: module.display_name.clone(),
            description: module.description.clone(),
            icon: module.icon.clone(),
            category: module.category.clone(),
            priority: module.priority,
            props: Json(module.props.clone()),
            config_fields: Json(module.config_fields.clone()),
            messages: Json(module.messages.clone()),
            required_services: Json(module.required_services.clone()),
            dependencies: Json(module.dependencies.clone()),
            layout: Json(module.layout.clone()),
            tags: Json(module.tags.clone()),
            enabled: true,
            installed_at: now,
            updated_at: now,
        }
    }

    /// Insert this row. The parent plugin row must exist.
    pub async fn insert<'e, E>(&self, executor: E) -> LifecycleResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO module (
                id, plugin_id, user_id, name, display_name, description, icon,
                category, priority, props, config_fields, messages,
                required_services, dependencies, layout, tags, enabled,
                installed_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.plugin_id)
        .bind(&self.user_id)
        .bind(&self.name)
        .bind(&self.display_name)
        .bind(&self.description)
        .bind(&self.icon)
        .bind(&self.category)
        .bind(self.priority)
        .bind(&self.props)
        .bind(&self.config_fields)
        .bind(&self.messages)
        .bind(&self.required_services)
        .bind(&self.dependencies)
        .bind(&self.layout)
        .bind(&self.tags)
        .bind(self.enabled)
        .bind(self.installed_at)
        .bind(self.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// List a user's modules for one plugin, by priority.
    pub async fn list_for_plugin<'e, E>(
        executor: E,
        user_id: &str,
        plugin_id: &str,
    ) -> LifecycleResult<Vec<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let modules = sqlx::query_as::<_, Module>(
            "SELECT * FROM module WHERE plugin_id = ? AND user_id = ? ORDER BY priority, name",
        )
        .bind(plugin_id)
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(modules)
    }

    /// Count a user's modules for one plugin.
    pub async fn count_for_plugin<'e, E>(
        executor: E,
        user_id: &str,
        plugin_id: &str,
    ) -> LifecycleResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM module WHERE plugin_id = ? AND user_id = ?",
        )
        .bind(plugin_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// Delete all of a user's modules for one plugin. Returns the number removed.
    pub async fn delete_for_plugin<'e, E>(
        executor: E,
        user_id: &str,
        plugin_id: &str,
    ) -> LifecycleResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM module WHERE plugin_id = ? AND user_id = ?")
            .bind(plugin_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
