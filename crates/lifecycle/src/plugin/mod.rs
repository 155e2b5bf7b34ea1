//! Plugin lifecycle for the BrainDrive Basic AI Chat plugin.
//!
//! This module handles:
//! - Parsing plugin metadata from `.info.toml` manifests
//! - Per-user install and uninstall against the `plugin` and `module` tables
//! - The registry interface the host uses to reach installed plugins
//! - Per-user initializers run when an account is created

pub mod cli;
mod error;
mod initializer;
mod lifecycle;
mod manifest;
mod registry;

pub use error::{LifecycleError, LifecycleResult};
pub use initializer::{
    DEFAULT_PRIORITY, InitializerRegistry, PluginInstallInitializer, UserInitializer,
};
pub use lifecycle::{LifecycleHooks, LifecycleManager, LifecycleOutcome, NoopHooks, PluginStatus};
pub use manifest::{KNOWN_SERVICES, ModuleManifest, PluginManifest};
pub use registry::{PluginLifecycle, PluginRegistry};
