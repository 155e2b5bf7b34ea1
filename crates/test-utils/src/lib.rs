//! Plugin lifecycle test utilities.
//!
//! Helpers for integration testing: unique user ids, a manifest builder that
//! renders `.info.toml` text, and assertion helpers for JSON output.

use uuid::Uuid;

/// A fresh user id that will not collide with other tests.
pub fn test_user_id() -> String {
    format!("user-{}", Uuid::now_v7().simple())
}

/// Start a manifest for a plugin with the given slug.
pub fn test_manifest(slug: &str) -> TestManifest {
    TestManifest {
        name: format!("{slug} plugin"),
        slug: slug.to_string(),
        version: "1.0.0".to_string(),
        permissions: Vec::new(),
        modules: Vec::new(),
    }
}

/// A manifest builder for test fixtures.
#[derive(Debug, Clone)]
pub struct TestManifest {
    pub name: String,
    pub slug: String,
    pub version: String,
    pub permissions: Vec<String>,
    pub modules: Vec<TestModule>,
}

/// One module of a [`TestManifest`].
#[derive(Debug, Clone)]
pub struct TestModule {
    pub name: String,
    pub priority: i64,
    pub services: Vec<String>,
    pub tags: Vec<String>,
}

impl TestManifest {
    /// Set the version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add a permission.
    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.push(permission.to_string());
        self
    }

    /// Add a module with the next priority and no required services.
    pub fn with_module(mut self, name: &str) -> Self {
        let priority = self.modules.len() as i64 + 1;
        self.modules.push(TestModule {
            name: name.to_string(),
            priority,
            services: Vec::new(),
            tags: Vec::new(),
        });
        self
    }

    /// Require a host service on the most recently added module.
    pub fn requiring(mut self, service: &str) -> Self {
        if let Some(module) = self.modules.last_mut() {
            module.services.push(service.to_string());
        }
        self
    }

    /// Tag the most recently added module.
    pub fn tagged(mut self, tag: &str) -> Self {
        if let Some(module) = self.modules.last_mut() {
            module.tags.push(tag.to_string());
        }
        self
    }

    /// Render as `.info.toml` text.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("name = {}\n", quote(&self.name)));
        out.push_str(&format!("plugin_slug = {}\n", quote(&self.slug)));
        out.push_str(&format!("version = {}\n", quote(&self.version)));
        out.push_str(&format!(
            "description = {}\n",
            quote(&format!("Test fixture for {}", self.slug))
        ));
        out.push_str(&format!("permissions = {}\n", list(&self.permissions)));

        for module in &self.modules {
            out.push_str("\n[[modules]]\n");
            out.push_str(&format!("name = {}\n", quote(&module.name)));
            out.push_str(&format!("display_name = {}\n", quote(&module.name)));
            out.push_str(&format!("priority = {}\n", module.priority));
            out.push_str(&format!("tags = {}\n", list(&module.tags)));

            out.push_str("\n[modules.layout]\n");
            out.push_str("minWidth = 2\nminHeight = 2\n");

            if !module.services.is_empty() {
                out.push_str("\n[modules.required_services]\n");
                for service in &module.services {
                    out.push_str(&format!("{service} = {{ version = \"1.0.0\" }}\n"));
                }
            }
        }

        out
    }
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Assertion helpers for JSON output.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value does not have a specific key.
    pub fn lacks_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_none(),
            "Expected JSON to NOT have key '{key}', got: {value}"
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_are_unique() {
        assert_ne!(test_user_id(), test_user_id());
        assert!(test_user_id().starts_with("user-"));
    }

    #[test]
    fn manifest_builder_renders_modules() {
        let toml = test_manifest("fixture")
            .with_version("2.0.0")
            .with_permission("api.access")
            .with_module("Alpha")
            .requiring("api")
            .tagged("demo")
            .with_module("Beta")
            .to_toml();

        assert::contains(&toml, "plugin_slug = \"fixture\"");
        assert::contains(&toml, "version = \"2.0.0\"");
        assert::contains(&toml, "permissions = [\"api.access\"]");
        assert::contains(&toml, "name = \"Alpha\"");
        assert::contains(&toml, "priority = 2");
        assert::contains(&toml, "api = { version = \"1.0.0\" }");
        assert_eq!(toml.matches("[[modules]]").count(), 2);
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quote("a \"b\""), "\"a \\\"b\\\"\"");
    }

    #[test]
    fn json_assertions() {
        let json = serde_json::json!({"success": true});
        assert::has_key(&json, "success");
        assert::lacks_key(&json, "error");
    }
}
