//! CLI command implementations for the plugin lifecycle.
//!
//! Each command works against the database pool and the manager or registry
//! built by the binary; output goes to stdout.

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;

use super::initializer::InitializerRegistry;
use super::lifecycle::{LifecycleManager, LifecycleOutcome};
use super::registry::PluginRegistry;
use crate::models::{Module, Plugin};

/// Install the plugin for a user and print the outcome.
pub async fn cmd_install(manager: &LifecycleManager, user_id: &str) -> Result<()> {
    let outcome = manager.install(user_id).await;
    report(&outcome)
}

/// Uninstall the plugin for a user and print the outcome.
pub async fn cmd_uninstall(manager: &LifecycleManager, user_id: &str) -> Result<()> {
    let outcome = manager.uninstall(user_id).await;
    report(&outcome)
}

/// Show whether the plugin is installed for a user.
pub async fn cmd_status(manager: &LifecycleManager, user_id: &str) -> Result<()> {
    let status = manager.status(user_id).await?;

    if !status.installed {
        println!(
            "Plugin '{}' is not installed for user '{}'.",
            status.plugin_slug, user_id
        );
        return Ok(());
    }

    println!(
        "Plugin '{}' v{} installed for user '{}' ({}).",
        status.plugin_slug,
        status.version.as_deref().unwrap_or("?"),
        user_id,
        if status.enabled { "enabled" } else { "disabled" }
    );
    for module in &status.modules {
        println!("  module: {module}");
    }
    Ok(())
}

/// List every plugin installed for a user.
pub async fn cmd_list(pool: &SqlitePool, user_id: &str) -> Result<()> {
    let plugins = Plugin::list_for_user(pool, user_id).await?;

    if plugins.is_empty() {
        println!("No plugins installed for user '{user_id}'.");
        return Ok(());
    }

    println!(
        "{:<28} {:<10} {:<10} {:<8}",
        "PLUGIN", "VERSION", "STATUS", "MODULES"
    );
    println!("{}", "-".repeat(58));

    for plugin in &plugins {
        let modules = Module::count_for_plugin(pool, user_id, &plugin.id).await?;
        let status = if plugin.enabled { "enabled" } else { "disabled" };
        println!(
            "{:<28} {:<10} {:<10} {}",
            plugin.plugin_slug, plugin.version, status, modules
        );
    }

    Ok(())
}

/// Print the metadata dictionaries of every registered plugin.
pub fn cmd_metadata(registry: &PluginRegistry) -> Result<()> {
    let metadata = registry.metadata()?;
    let json =
        serde_json::to_string_pretty(&metadata).context("failed to serialize plugin metadata")?;
    println!("{json}");
    Ok(())
}

/// Run the registered initializers for a new user.
pub async fn cmd_init_user(
    initializers: &InitializerRegistry,
    pool: &SqlitePool,
    user_id: &str,
) -> Result<()> {
    let ran = initializers
        .run_for_user(user_id, pool)
        .await
        .with_context(|| format!("failed to initialize user '{user_id}'"))?;

    println!("Initialized user '{}' ({} step(s)):", user_id, ran.len());
    for name in &ran {
        println!("  {name}");
    }
    Ok(())
}

fn report(outcome: &LifecycleOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("failed to serialize outcome")?;
    println!("{json}");

    if !outcome.success {
        bail!(
            "{}",
            outcome.error.as_deref().unwrap_or(outcome.message.as_str())
        );
    }
    Ok(())
}
