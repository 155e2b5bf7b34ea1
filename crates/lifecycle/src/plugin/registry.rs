//! Host-facing plugin registry.
//!
//! The host depends on a single interface, [`PluginLifecycle`], and receives
//! implementations through explicit [`PluginRegistry::register`] calls. There
//! is no discovery step: whatever the host wires in is what it gets.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::error::LifecycleResult;
use super::lifecycle::{LifecycleManager, LifecycleOutcome, PluginStatus};
use super::manifest::PluginManifest;

/// What the host needs from an installable plugin.
#[async_trait]
pub trait PluginLifecycle: Send + Sync {
    /// Static metadata of the plugin.
    fn metadata(&self) -> &PluginManifest;

    async fn install(&self, user_id: &str) -> LifecycleOutcome;

    async fn uninstall(&self, user_id: &str) -> LifecycleOutcome;

    async fn status(&self, user_id: &str) -> LifecycleResult<PluginStatus>;
}

#[async_trait]
impl PluginLifecycle for LifecycleManager {
    fn metadata(&self) -> &PluginManifest {
        self.manifest()
    }

    async fn install(&self, user_id: &str) -> LifecycleOutcome {
        LifecycleManager::install(self, user_id).await
    }

    async fn uninstall(&self, user_id: &str) -> LifecycleOutcome {
        LifecycleManager::uninstall(self, user_id).await
    }

    async fn status(&self, user_id: &str) -> LifecycleResult<PluginStatus> {
        LifecycleManager::status(self, user_id).await
    }
}

/// Plugins known to the host, keyed by slug.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn PluginLifecycle>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Slugs must be unique.
    pub fn register(&mut self, plugin: Arc<dyn PluginLifecycle>) -> Result<()> {
        let slug = plugin.metadata().plugin_slug.clone();
        if self.plugins.contains_key(&slug) {
            bail!("plugin '{slug}' is already registered");
        }
        tracing::debug!(plugin = %slug, "registered plugin");
        self.plugins.insert(slug, plugin);
        Ok(())
    }

    /// Look up a plugin by slug.
    pub fn get(&self, slug: &str) -> Option<Arc<dyn PluginLifecycle>> {
        self.plugins.get(slug).cloned()
    }

    /// Registered slugs, sorted.
    pub fn slugs(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Metadata dictionaries of every registered plugin.
    pub fn metadata(&self) -> LifecycleResult<Vec<JsonValue>> {
        self.plugins
            .values()
            .map(|p| p.metadata().registry_metadata())
            .collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.slugs())
            .finish()
    }
}
