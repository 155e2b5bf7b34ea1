//! Parser for plugin `.info.toml` manifest files.
//!
//! The manifest is the static metadata the lifecycle manager copies into the
//! host database on install:
//! - plugin identity (name, slug, version) and descriptive fields
//! - bundle location of the frontend build
//! - one descriptor per UI module the bundle exposes

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{LifecycleError, LifecycleResult};

/// Metadata bundled with the crate for the BrainDrive Basic AI Chat plugin.
const BUILTIN_MANIFEST: &str = include_str!("../../BrainDriveBasicAIChat.info.toml");

/// Host services a module may declare in `required_services`.
pub const KNOWN_SERVICES: &[&str] = &["api", "event", "theme", "settings", "pageContext"];

/// Plugin metadata parsed from `.info.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Human-readable plugin name.
    pub name: String,

    /// Stable machine name, used to build row ids.
    pub plugin_slug: String,

    /// Semantic version (e.g., "1.0.0").
    pub version: String,

    pub description: String,

    #[serde(default)]
    pub long_description: String,

    /// Plugin kind as understood by the host (e.g., "frontend").
    #[serde(rename = "type", default = "default_plugin_type")]
    pub plugin_type: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub official: bool,

    #[serde(default)]
    pub author: String,

    /// Minimum host version this plugin works with.
    #[serde(default)]
    pub compatibility: String,

    /// Module federation scope the bundle registers under.
    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub bundle_method: String,

    /// Path of the remote entry relative to the plugin directory.
    #[serde(default)]
    pub bundle_location: String,

    #[serde(default)]
    pub is_local: bool,

    #[serde(default)]
    pub source_type: String,

    #[serde(default)]
    pub source_url: String,

    #[serde(default)]
    pub update_check_url: String,

    #[serde(default)]
    pub installation_type: String,

    #[serde(default)]
    pub permissions: Vec<String>,

    /// UI modules exposed by the bundle.
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
}

/// Descriptor of one UI module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Exposed component name (must be unique within the plugin).
    pub name: String,

    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub category: String,

    /// Ordering hint for the host's module picker (lower first).
    #[serde(default)]
    pub priority: i64,

    /// Default props handed to the component.
    #[serde(default = "empty_object")]
    pub props: JsonValue,

    /// Editable configuration fields keyed by prop name.
    #[serde(default = "empty_object")]
    pub config_fields: JsonValue,

    /// Event bus messages, as `{ sends = [...], receives = [...] }`.
    #[serde(default = "empty_object")]
    pub messages: JsonValue,

    /// Host services the component needs, keyed by service name.
    #[serde(default = "empty_object")]
    pub required_services: JsonValue,

    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Grid layout hints (min/default width and height).
    #[serde(default = "empty_object")]
    pub layout: JsonValue,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Slugs and module names are ASCII letters and digits only.
fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

fn default_plugin_type() -> String {
    "frontend".to_string()
}

fn empty_object() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

impl PluginManifest {
    /// The metadata bundled with this crate.
    pub fn builtin() -> LifecycleResult<Self> {
        Self::parse_str(BUILTIN_MANIFEST, Path::new("BrainDriveBasicAIChat.info.toml"))
    }

    /// Parse a manifest file from the given path.
    pub fn parse(path: &Path) -> LifecycleResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plugin manifest: {}", path.display()))?;

        Self::parse_str(&content, path)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse_str(content: &str, path: &Path) -> LifecycleResult<Self> {
        let manifest: PluginManifest = toml::from_str(content).map_err(|e| {
            LifecycleError::invalid_manifest(format!(
                "failed to parse TOML at {}: {e}",
                path.display()
            ))
        })?;

        manifest.validate(path)?;
        Ok(manifest)
    }

    /// Load the manifest at `path` if given, otherwise the bundled one.
    pub fn load(path: Option<&Path>) -> LifecycleResult<Self> {
        match path {
            Some(path) => Self::parse(path),
            None => Self::builtin(),
        }
    }

    fn validate(&self, path: &Path) -> LifecycleResult<()> {
        let at = path.display();

        if self.name.trim().is_empty() {
            return Err(LifecycleError::invalid_manifest(format!(
                "{at}: empty 'name' field"
            )));
        }

        if self.version.trim().is_empty() {
            return Err(LifecycleError::invalid_manifest(format!(
                "plugin '{}' at {at}: empty 'version' field",
                self.name
            )));
        }

        if !is_identifier(&self.plugin_slug) {
            return Err(LifecycleError::invalid_manifest(format!(
                "plugin '{}' at {at}: 'plugin_slug' must be non-empty and contain only letters and digits (got '{}')",
                self.name, self.plugin_slug
            )));
        }

        if self.modules.is_empty() {
            return Err(LifecycleError::invalid_manifest(format!(
                "plugin '{}' at {at}: declares no modules",
                self.plugin_slug
            )));
        }

        let mut seen = HashSet::new();
        for module in &self.modules {
            module.validate(&self.plugin_slug)?;
            if !seen.insert(module.name.as_str()) {
                return Err(LifecycleError::invalid_manifest(format!(
                    "plugin '{}': duplicate module '{}'",
                    self.plugin_slug, module.name
                )));
            }
        }

        Ok(())
    }

    /// Row id of this plugin for a user.
    ///
    /// Slugs and module names never contain `_`, so ids of different users
    /// cannot collide even when user ids do.
    pub fn plugin_id(&self, user_id: &str) -> String {
        format!("{user_id}_{}", self.plugin_slug)
    }

    /// Row id of one of this plugin's modules for a user.
    pub fn module_id(&self, user_id: &str, module_name: &str) -> String {
        format!("{user_id}_{}_{module_name}", self.plugin_slug)
    }

    /// Names of all declared modules, in manifest order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Metadata dictionary handed to the host plugin registry.
    pub fn registry_metadata(&self) -> LifecycleResult<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

impl ModuleManifest {
    fn validate(&self, plugin: &str) -> LifecycleResult<()> {
        if self.name.trim().is_empty() {
            return Err(LifecycleError::invalid_manifest(format!(
                "plugin '{plugin}': module with empty 'name' field"
            )));
        }

        if !is_identifier(&self.name) {
            return Err(LifecycleError::invalid_manifest(format!(
                "plugin '{plugin}': module name '{}' must contain only letters and digits",
                self.name
            )));
        }

        for (field, value) in [
            ("props", &self.props),
            ("config_fields", &self.config_fields),
            ("messages", &self.messages),
            ("required_services", &self.required_services),
            ("layout", &self.layout),
        ] {
            if !value.is_object() {
                return Err(LifecycleError::invalid_manifest(format!(
                    "plugin '{plugin}': module '{}' field '{field}' must be a table",
                    self.name
                )));
            }
        }

        if let Some(services) = self.required_services.as_object() {
            for service in services.keys() {
                if !KNOWN_SERVICES.contains(&service.as_str()) {
                    return Err(LifecycleError::invalid_manifest(format!(
                        "plugin '{plugin}': module '{}' requires unknown service '{service}'. Known services: {}",
                        self.name,
                        KNOWN_SERVICES.join(", ")
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_manifest_parses() {
        let manifest = PluginManifest::builtin().unwrap();
        assert_eq!(manifest.plugin_slug, "BrainDriveBasicAIChat");
        assert_eq!(manifest.plugin_type, "frontend");
        assert_eq!(
            manifest.module_names(),
            vec!["ComponentModelSelection", "AIPromptChat", "AIChatHistory"]
        );

        let chat = &manifest.modules[1];
        assert_eq!(chat.props["defaultStreamingMode"], JsonValue::Bool(true));
        assert_eq!(chat.layout["defaultWidth"], 12);
        assert!(chat.required_services.get("api").is_some());
    }

    #[test]
    fn parse_minimal_manifest() {
        let toml = r#"
name = "Minimal"
plugin_slug = "minimal"
version = "0.1.0"
description = "A minimal plugin"

[[modules]]
name = "Widget"
display_name = "Widget"
"#;

        let manifest = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(manifest.plugin_type, "frontend");
        assert!(manifest.permissions.is_empty());
        assert!(manifest.modules[0].props.as_object().unwrap().is_empty());
        assert!(manifest.modules[0].tags.is_empty());
    }

    #[test]
    fn ids_are_scoped_by_user() {
        let manifest = PluginManifest::builtin().unwrap();
        assert_eq!(manifest.plugin_id("u1"), "u1_BrainDriveBasicAIChat");
        assert_eq!(
            manifest.module_id("u1", "AIPromptChat"),
            "u1_BrainDriveBasicAIChat_AIPromptChat"
        );
    }

    #[test]
    fn reject_empty_version() {
        let toml = r#"
name = "test"
plugin_slug = "test"
version = ""
description = "Empty version"
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        assert!(err.to_string().contains("empty 'version'"));
    }

    #[test]
    fn reject_bad_slug() {
        let toml = r#"
name = "test"
plugin_slug = "has space"
version = "1.0.0"
description = "Bad slug"

[[modules]]
name = "A"
display_name = "A"
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        assert!(err.to_string().contains("plugin_slug"));
    }

    #[test]
    fn reject_underscore_in_slug() {
        let toml = r#"
name = "test"
plugin_slug = "a_b"
version = "1.0.0"
description = "Underscore slug"

[[modules]]
name = "A"
display_name = "A"
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        assert!(err.to_string().contains("only letters and digits"));
    }

    #[test]
    fn reject_underscore_in_module_name() {
        let toml = r#"
name = "test"
plugin_slug = "test"
version = "1.0.0"
description = "Underscore module"

[[modules]]
name = "Chat_Panel"
display_name = "Chat"
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        assert!(err.to_string().contains("module name 'Chat_Panel'"));
    }

    #[test]
    fn ids_of_underscored_users_stay_distinct() {
        let ab = PluginManifest::parse_str(
            "name = \"ab\"\nplugin_slug = \"ab\"\nversion = \"1.0.0\"\ndescription = \"\"\n\n[[modules]]\nname = \"M\"\ndisplay_name = \"M\"\n",
            Path::new("ab.toml"),
        )
        .unwrap();
        let b = PluginManifest::parse_str(
            "name = \"b\"\nplugin_slug = \"b\"\nversion = \"1.0.0\"\ndescription = \"\"\n\n[[modules]]\nname = \"M\"\ndisplay_name = \"M\"\n",
            Path::new("b.toml"),
        )
        .unwrap();

        assert_ne!(ab.plugin_id("x"), b.plugin_id("x_a"));
        assert_ne!(ab.module_id("x", "M"), b.module_id("x_a", "M"));
    }

    #[test]
    fn reject_no_modules() {
        let toml = r#"
name = "test"
plugin_slug = "test"
version = "1.0.0"
description = "No modules"
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        assert!(err.to_string().contains("no modules"));
    }

    #[test]
    fn reject_duplicate_module() {
        let toml = r#"
name = "test"
plugin_slug = "test"
version = "1.0.0"
description = "Duplicate"

[[modules]]
name = "A"
display_name = "A"

[[modules]]
name = "A"
display_name = "A again"
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        assert!(err.to_string().contains("duplicate module 'A'"));
    }

    #[test]
    fn reject_unknown_service() {
        let toml = r#"
name = "test"
plugin_slug = "test"
version = "1.0.0"
description = "Unknown service"

[[modules]]
name = "A"
display_name = "A"

[modules.required_services]
telepathy = { methods = ["read"] }
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown service 'telepathy'"));
        assert!(msg.contains("pageContext"));
    }

    #[test]
    fn reject_non_table_props() {
        let toml = r#"
name = "test"
plugin_slug = "test"
version = "1.0.0"
description = "Bad props"

[[modules]]
name = "A"
display_name = "A"
props = "oops"
"#;

        let err = PluginManifest::parse_str(toml, Path::new("test.toml")).unwrap_err();
        assert!(err.to_string().contains("'props' must be a table"));
    }

    #[test]
    fn registry_metadata_uses_host_field_names() {
        let manifest = PluginManifest::builtin().unwrap();
        let meta = manifest.registry_metadata().unwrap();
        assert_eq!(meta["type"], "frontend");
        assert_eq!(meta["plugin_slug"], "BrainDriveBasicAIChat");
        assert_eq!(meta["modules"].as_array().unwrap().len(), 3);
        assert!(meta.get("plugin_type").is_none());
    }
}
