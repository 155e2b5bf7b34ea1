//! Per-user initializers run when the host creates an account.
//!
//! Initializers declare a priority and the names of initializers that must
//! run before them. The registry orders them topologically (Kahn's
//! algorithm), breaking ties by priority and then name so the order is stable
//! across runs. Dependencies on initializers the registry does not know about
//! are assumed to be run by the host beforehand.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::lifecycle::LifecycleManager;

/// Default priority of an initializer (lower runs first).
pub const DEFAULT_PRIORITY: i32 = 500;

/// One onboarding step for a newly created user.
#[async_trait]
pub trait UserInitializer: Send + Sync {
    /// Unique name, referenced by other initializers' dependencies.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Names of initializers that must run first.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// Set up data for the user. `Ok(false)` means the step failed without an error.
    async fn initialize(&self, user_id: &str, pool: &SqlitePool) -> Result<bool>;

    /// Undo `initialize` after a failure later in the run.
    async fn cleanup(&self, user_id: &str, pool: &SqlitePool) -> Result<bool>;
}

/// Ordered collection of user initializers.
#[derive(Default, Clone)]
pub struct InitializerRegistry {
    initializers: Vec<Arc<dyn UserInitializer>>,
}

impl InitializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an initializer. Names must be unique.
    pub fn register(&mut self, initializer: Arc<dyn UserInitializer>) -> Result<()> {
        if self
            .initializers
            .iter()
            .any(|i| i.name() == initializer.name())
        {
            bail!("initializer '{}' is already registered", initializer.name());
        }
        self.initializers.push(initializer);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }

    /// Resolve the run order.
    ///
    /// # Errors
    /// Returns error if the dependencies between registered initializers
    /// form a cycle.
    pub fn resolve_order(&self) -> Result<Vec<Arc<dyn UserInitializer>>> {
        let by_name: HashMap<&str, &Arc<dyn UserInitializer>> =
            self.initializers.iter().map(|i| (i.name(), i)).collect();

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for name in by_name.keys() {
            in_degree.insert(*name, 0);
            dependents.entry(*name).or_default();
        }

        for init in &self.initializers {
            for dep in init.dependencies() {
                if !by_name.contains_key(dep) {
                    warn!(
                        initializer = init.name(),
                        dependency = *dep,
                        "dependency not registered, assuming the host runs it first"
                    );
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(init.name()) {
                    *degree += 1;
                }
                dependents.entry(*dep).or_default().push(init.name());
            }
        }

        // Ready set ordered by (priority, name) for determinism
        let mut ready: BTreeSet<(i32, &str)> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .filter_map(|(name, _)| by_name.get(name).map(|i| (i.priority(), *name)))
            .collect();

        let mut result = Vec::with_capacity(self.initializers.len());

        while let Some((_, name)) = ready.pop_first() {
            if let Some(init) = by_name.get(name) {
                result.push(Arc::clone(init));
            }

            for dependent in dependents.get(name).into_iter().flatten() {
                let Some(degree) = in_degree.get_mut(dependent) else {
                    continue;
                };
                *degree -= 1;
                if *degree == 0 {
                    if let Some(init) = by_name.get(dependent) {
                        ready.insert((init.priority(), *dependent));
                    }
                }
            }
        }

        if result.len() != self.initializers.len() {
            let mut in_cycle: Vec<&str> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(name, _)| *name)
                .collect();
            in_cycle.sort_unstable();
            bail!(
                "circular initializer dependency detected involving: {}",
                in_cycle.join(", ")
            );
        }

        Ok(result)
    }

    /// Run every initializer for a new user.
    ///
    /// On failure, the failed initializer and every one that already ran are
    /// cleaned up in reverse order, and the failure is returned. Returns the
    /// names of the initializers that ran.
    pub async fn run_for_user(&self, user_id: &str, pool: &SqlitePool) -> Result<Vec<String>> {
        let order = self.resolve_order()?;
        let mut completed: Vec<&Arc<dyn UserInitializer>> = Vec::with_capacity(order.len());

        for init in &order {
            let failure = match init.initialize(user_id, pool).await {
                Ok(true) => None,
                Ok(false) => Some(anyhow!("initializer '{}' reported failure", init.name())),
                Err(e) => Some(e.context(format!("initializer '{}' failed", init.name()))),
            };

            if let Some(err) = failure {
                error!(initializer = init.name(), user_id, error = %err, "user initialization failed");
                completed.push(init);
                cleanup_all(&completed, user_id, pool).await;
                return Err(err);
            }

            info!(initializer = init.name(), user_id, "initializer complete");
            completed.push(init);
        }

        Ok(completed.iter().map(|i| i.name().to_string()).collect())
    }
}

async fn cleanup_all(ran: &[&Arc<dyn UserInitializer>], user_id: &str, pool: &SqlitePool) {
    for init in ran.iter().rev() {
        match init.cleanup(user_id, pool).await {
            Ok(true) => {}
            Ok(false) => warn!(initializer = init.name(), user_id, "cleanup reported failure"),
            Err(e) => warn!(initializer = init.name(), user_id, error = %e, "cleanup failed"),
        }
    }
}

/// Installs the plugin for each new user.
pub struct PluginInstallInitializer {
    manager: Arc<LifecycleManager>,
}

impl PluginInstallInitializer {
    pub const NAME: &'static str = "braindrive_basic_ai_chat_initializer";

    pub fn new(manager: Arc<LifecycleManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl UserInitializer for PluginInstallInitializer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Installs the BrainDrive Basic AI Chat plugin for new users"
    }

    fn dependencies(&self) -> &[&str] {
        &["pages_initializer"]
    }

    async fn initialize(&self, user_id: &str, _pool: &SqlitePool) -> Result<bool> {
        if self.manager.status(user_id).await?.installed {
            return Ok(true);
        }

        let outcome = self.manager.install(user_id).await;
        if !outcome.success {
            bail!(
                "{}",
                outcome.error.unwrap_or_else(|| outcome.message.clone())
            );
        }
        Ok(true)
    }

    async fn cleanup(&self, user_id: &str, _pool: &SqlitePool) -> Result<bool> {
        if !self.manager.status(user_id).await?.installed {
            return Ok(true);
        }
        Ok(self.manager.uninstall(user_id).await.success)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::Config;
    use crate::db;

    struct Recorder {
        name: &'static str,
        priority: i32,
        deps: &'static [&'static str],
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl UserInitializer for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn dependencies(&self) -> &[&str] {
            self.deps
        }

        async fn initialize(&self, _user_id: &str, _pool: &SqlitePool) -> Result<bool> {
            self.log.lock().unwrap().push(format!("init:{}", self.name));
            Ok(!self.fail)
        }

        async fn cleanup(&self, _user_id: &str, _pool: &SqlitePool) -> Result<bool> {
            self.log.lock().unwrap().push(format!("cleanup:{}", self.name));
            Ok(true)
        }
    }

    fn recorder(
        name: &'static str,
        priority: i32,
        deps: &'static [&'static str],
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Recorder {
        Recorder {
            name,
            priority,
            deps,
            fail: false,
            log: Arc::clone(log),
        }
    }

    fn names(order: &[Arc<dyn UserInitializer>]) -> Vec<&str> {
        order.iter().map(|i| i.name()).collect()
    }

    #[test]
    fn orders_by_dependency_then_priority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InitializerRegistry::new();
        registry
            .register(Arc::new(recorder("chat", 500, &["pages"], &log)))
            .unwrap();
        registry
            .register(Arc::new(recorder("pages", 900, &[], &log)))
            .unwrap();
        registry
            .register(Arc::new(recorder("settings", 100, &[], &log)))
            .unwrap();

        let order = registry.resolve_order().unwrap();
        assert_eq!(names(&order), vec!["settings", "pages", "chat"]);
    }

    #[test]
    fn unknown_dependency_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InitializerRegistry::new();
        registry
            .register(Arc::new(recorder("chat", 500, &["pages_initializer"], &log)))
            .unwrap();

        let order = registry.resolve_order().unwrap();
        assert_eq!(names(&order), vec!["chat"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InitializerRegistry::new();
        registry
            .register(Arc::new(recorder("a", 1, &["b"], &log)))
            .unwrap();
        registry
            .register(Arc::new(recorder("b", 1, &["a"], &log)))
            .unwrap();

        let Err(err) = registry.resolve_order() else {
            panic!("expected a cycle error");
        };
        let msg = err.to_string();
        assert!(msg.contains("circular"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = InitializerRegistry::new();
        registry
            .register(Arc::new(recorder("a", 1, &[], &log)))
            .unwrap();
        assert!(
            registry
                .register(Arc::new(recorder("a", 2, &[], &log)))
                .is_err()
        );
    }

    #[tokio::test]
    async fn failure_cleans_up_in_reverse() {
        let pool = db::create_pool(&Config::for_database("sqlite::memory:"))
            .await
            .unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut registry = InitializerRegistry::new();
        registry
            .register(Arc::new(recorder("first", 1, &[], &log)))
            .unwrap();
        registry
            .register(Arc::new(recorder("second", 2, &[], &log)))
            .unwrap();
        let mut failing = recorder("third", 3, &[], &log);
        failing.fail = true;
        registry.register(Arc::new(failing)).unwrap();
        registry
            .register(Arc::new(recorder("fourth", 4, &[], &log)))
            .unwrap();

        let err = registry.run_for_user("u1", &pool).await.unwrap_err();
        assert!(err.to_string().contains("third"));

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "init:first",
                "init:second",
                "init:third",
                "cleanup:third",
                "cleanup:second",
                "cleanup:first",
            ]
        );
    }
}
