//! Per-user install and uninstall of a plugin.
//!
//! Install copies the manifest into one `plugin` row and one `module` row per
//! descriptor; uninstall removes them, modules first. Both run in a single
//! transaction and report a [`LifecycleOutcome`] instead of an error so the
//! host can surface the message to the user as-is.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info};

use super::error::{LifecycleError, LifecycleResult};
use super::manifest::PluginManifest;
use crate::models::{Module, Plugin};

/// Extension points run inside the install/uninstall transaction.
///
/// Returning an error aborts the operation and rolls back every row written
/// so far.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Runs after the plugin and module rows are inserted, before commit.
    async fn on_install(
        &self,
        _conn: &mut SqliteConnection,
        _user_id: &str,
        _manifest: &PluginManifest,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs before the plugin and module rows are deleted.
    async fn on_uninstall(
        &self,
        _conn: &mut SqliteConnection,
        _user_id: &str,
        _manifest: &PluginManifest,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}

/// Result of an install or uninstall, as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    /// Module row ids created (install) or removed (uninstall).
    #[serde(default)]
    pub modules: Vec<String>,
}

impl LifecycleOutcome {
    fn succeeded(message: String, plugin_id: String, modules: Vec<String>) -> Self {
        Self {
            success: true,
            message,
            error: None,
            error_kind: None,
            plugin_id: Some(plugin_id),
            modules,
        }
    }

    fn failed(operation: &str, err: &LifecycleError) -> Self {
        Self {
            success: false,
            message: format!("{operation} failed"),
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            plugin_id: None,
            modules: Vec::new(),
        }
    }
}

/// Install state of the plugin for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    pub plugin_slug: String,
    pub user_id: String,
    pub installed: bool,
    pub plugin_id: Option<String>,
    pub version: Option<String>,
    pub enabled: bool,
    pub modules: Vec<String>,
    pub installed_at: Option<i64>,
}

/// Mediates install and uninstall of one plugin against the host database.
pub struct LifecycleManager {
    pool: SqlitePool,
    manifest: PluginManifest,
    hooks: Arc<dyn LifecycleHooks>,
}

impl LifecycleManager {
    /// Create a manager for `manifest` with no hooks.
    pub fn new(pool: SqlitePool, manifest: PluginManifest) -> Self {
        Self {
            pool,
            manifest,
            hooks: Arc::new(NoopHooks),
        }
    }

    /// Replace the lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// The plugin metadata this manager installs.
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// The database pool this manager writes to.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Install the plugin for a user.
    ///
    /// Fails without writing anything if the user already has it.
    pub async fn install(&self, user_id: &str) -> LifecycleOutcome {
        let slug = &self.manifest.plugin_slug;
        match self.try_install(user_id).await {
            Ok(modules) => {
                info!(
                    plugin = %slug,
                    user_id,
                    modules = modules.len(),
                    "plugin installed"
                );
                LifecycleOutcome::succeeded(
                    format!(
                        "plugin '{}' v{} installed with {} module(s)",
                        slug,
                        self.manifest.version,
                        modules.len()
                    ),
                    self.manifest.plugin_id(user_id),
                    modules,
                )
            }
            Err(e) => {
                error!(plugin = %slug, user_id, error = %e, "plugin install failed");
                LifecycleOutcome::failed("install", &e)
            }
        }
    }

    /// Uninstall the plugin for a user, deleting modules before the plugin row.
    pub async fn uninstall(&self, user_id: &str) -> LifecycleOutcome {
        let slug = &self.manifest.plugin_slug;
        match self.try_uninstall(user_id).await {
            Ok((plugin_id, modules)) => {
                info!(
                    plugin = %slug,
                    user_id,
                    modules = modules.len(),
                    "plugin uninstalled"
                );
                LifecycleOutcome::succeeded(
                    format!(
                        "plugin '{}' uninstalled, {} module(s) removed",
                        slug,
                        modules.len()
                    ),
                    plugin_id,
                    modules,
                )
            }
            Err(e) => {
                error!(plugin = %slug, user_id, error = %e, "plugin uninstall failed");
                LifecycleOutcome::failed("uninstall", &e)
            }
        }
    }

    /// Report whether the plugin is installed for a user.
    pub async fn status(&self, user_id: &str) -> LifecycleResult<PluginStatus> {
        check_user_id(user_id)?;
        let slug = &self.manifest.plugin_slug;

        let Some(plugin) = Plugin::find_for_user(&self.pool, user_id, slug).await? else {
            return Ok(PluginStatus {
                plugin_slug: slug.clone(),
                user_id: user_id.to_string(),
                installed: false,
                plugin_id: None,
                version: None,
                enabled: false,
                modules: Vec::new(),
                installed_at: None,
            });
        };

        let modules = Module::list_for_plugin(&self.pool, user_id, &plugin.id).await?;

        Ok(PluginStatus {
            plugin_slug: slug.clone(),
            user_id: user_id.to_string(),
            installed: true,
            plugin_id: Some(plugin.id),
            version: Some(plugin.version),
            enabled: plugin.enabled,
            modules: modules.into_iter().map(|m| m.name).collect(),
            installed_at: Some(plugin.installed_at),
        })
    }

    async fn try_install(&self, user_id: &str) -> LifecycleResult<Vec<String>> {
        check_user_id(user_id)?;
        let slug = &self.manifest.plugin_slug;

        // Dropping `tx` on any early return rolls back.
        let mut tx = self.pool.begin().await?;

        if Plugin::find_for_user(&mut *tx, user_id, slug)
            .await?
            .is_some()
        {
            return Err(LifecycleError::already_installed(slug, user_id));
        }

        let now = chrono::Utc::now().timestamp();
        let plugin = Plugin::from_manifest(&self.manifest, user_id, now);
        plugin.insert(&mut *tx).await?;
        debug!(plugin = %slug, user_id, id = %plugin.id, "inserted plugin row");

        let mut created = Vec::with_capacity(self.manifest.modules.len());
        for descriptor in &self.manifest.modules {
            let module = Module::from_manifest(&self.manifest, descriptor, user_id, now);
            module.insert(&mut *tx).await?;
            created.push(module.id);
        }

        self.hooks
            .on_install(&mut *tx, user_id, &self.manifest)
            .await
            .map_err(|e| LifecycleError::Hook {
                plugin: slug.clone(),
                hook: "on_install",
                details: format!("{e:#}"),
            })?;

        tx.commit().await?;
        Ok(created)
    }

    async fn try_uninstall(&self, user_id: &str) -> LifecycleResult<(String, Vec<String>)> {
        check_user_id(user_id)?;
        let slug = &self.manifest.plugin_slug;

        let mut tx = self.pool.begin().await?;

        let plugin = Plugin::find_for_user(&mut *tx, user_id, slug)
            .await?
            .ok_or_else(|| LifecycleError::not_found(slug, user_id))?;

        self.hooks
            .on_uninstall(&mut *tx, user_id, &self.manifest)
            .await
            .map_err(|e| LifecycleError::Hook {
                plugin: slug.clone(),
                hook: "on_uninstall",
                details: format!("{e:#}"),
            })?;

        let modules = Module::list_for_plugin(&mut *tx, user_id, &plugin.id).await?;
        let removed = Module::delete_for_plugin(&mut *tx, user_id, &plugin.id).await?;
        debug!(plugin = %slug, user_id, removed, "deleted module rows");

        if !Plugin::delete_for_user(&mut *tx, user_id, &plugin.id).await? {
            return Err(LifecycleError::not_found(slug, user_id));
        }

        tx.commit().await?;
        Ok((plugin.id, modules.into_iter().map(|m| m.id).collect()))
    }
}

fn check_user_id(user_id: &str) -> LifecycleResult<()> {
    if user_id.trim().is_empty() {
        return Err(LifecycleError::InvalidUser(user_id.to_string()));
    }
    Ok(())
}
