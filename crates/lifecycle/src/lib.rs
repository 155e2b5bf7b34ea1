//! BrainDrive Basic AI Chat plugin lifecycle.
//!
//! Installs and uninstalls the plugin's metadata per user in the host's
//! `plugin` and `module` tables. The `plugin-lifecycle` binary wraps this
//! library for command-line use.

pub mod config;
pub mod db;
pub mod models;
pub mod plugin;

pub use config::Config;
