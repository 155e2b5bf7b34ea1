//! Lifecycle error types with clear, actionable messages.
//!
//! Every variant that concerns a specific install names the plugin slug and
//! the user so failures in the host logs can be traced back to one account.

use thiserror::Error;

/// Errors that can occur while installing or uninstalling a plugin.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Uninstall or status lookup for a user without the plugin.
    #[error("plugin '{plugin}' not found for user '{user_id}'")]
    NotFound { plugin: String, user_id: String },

    /// Install for a user who already has the plugin.
    #[error("plugin '{plugin}' is already installed for user '{user_id}'")]
    AlreadyInstalled { plugin: String, user_id: String },

    /// Operations need a non-empty user id to scope rows.
    #[error("invalid user id: {0:?}")]
    InvalidUser(String),

    /// The plugin metadata failed validation.
    #[error("invalid plugin manifest: {details}")]
    InvalidManifest { details: String },

    /// A lifecycle hook returned an error; the surrounding transaction is rolled back.
    #[error("plugin '{plugin}': {hook} hook failed: {details}")]
    Hook {
        plugin: String,
        hook: &'static str,
        details: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LifecycleError {
    /// Create a not-found error.
    pub fn not_found(plugin: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::NotFound {
            plugin: plugin.into(),
            user_id: user_id.into(),
        }
    }

    /// Create an already-installed error.
    pub fn already_installed(plugin: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::AlreadyInstalled {
            plugin: plugin.into(),
            user_id: user_id.into(),
        }
    }

    /// Create an invalid manifest error.
    pub fn invalid_manifest(details: impl Into<String>) -> Self {
        Self::InvalidManifest {
            details: details.into(),
        }
    }

    /// Short machine-readable kind, reported alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyInstalled { .. } => "already_installed",
            Self::InvalidUser(_) => "invalid_user",
            Self::InvalidManifest { .. } => "invalid_manifest",
            Self::Hook { .. } => "hook_failed",
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias using LifecycleError.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
