//! The module plugin interface.
//!
//! Modules are compiled-in implementations of [`Module`] registered under
//! their manifest id. Activating a module means resolving its factory from
//! the [`ModuleRegistry`], fetching its remote payload when the descriptor
//! names one, and driving `init` then `run` behind a [`ModuleContext`].
//!
//! The context is the whole capability surface a module gets: scoped
//! logging, key-value storage namespaced by module id, the current page
//! URL, and an async polling helper. Dispatcher internals stay out of
//! reach.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::store::Store;

/// A unit of page-automation logic.
#[async_trait]
pub trait Module: Send {
    /// One-time setup. Runs before `run`; failure aborts activation.
    async fn init(&mut self, _ctx: &ModuleContext) -> Result<()> {
        Ok(())
    }

    /// The module's work on the current page.
    async fn run(&mut self, ctx: &ModuleContext) -> Result<()>;

    /// Invoked when a utility module is toggled off.
    fn cleanup(&mut self) {}
}

/// Factory producing a fresh module instance per activation.
pub type ModuleFactory = fn() -> Box<dyn Module>;

/// Capability object handed to running modules.
pub struct ModuleContext {
    module_id: String,
    page_url: String,
    payload: Option<String>,
    store: Store,
}

impl ModuleContext {
    pub fn new(module_id: &str, page_url: &str, payload: Option<String>, store: Store) -> Self {
        Self {
            module_id: module_id.to_string(),
            page_url: page_url.to_string(),
            payload,
            store,
        }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// The remote payload fetched for this activation, if the descriptor
    /// named a `file`.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Read from this module's storage namespace. Storage failures degrade
    /// to `None` with a logged warning.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.store.module_get(&self.module_id, key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(module = %self.module_id, "Storage read failed: {}", e);
                None
            }
        }
    }

    /// Write to this module's storage namespace.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.module_set(&self.module_id, key, value)
    }

    /// Log through the loader with this module's id attached.
    pub fn log(&self, message: &str) {
        tracing::info!(module = %self.module_id, "{}", message);
    }

    /// Poll `condition` until it holds or `timeout` elapses. The original
    /// use case is waiting for a page element to appear before acting on it.
    pub async fn wait_for<F>(&self, condition: F, timeout: Duration) -> bool
    where
        F: Fn() -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Registry of every compiled-in module, keyed by manifest id.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a manifest id. Re-registering replaces the
    /// previous factory.
    pub fn register(&mut self, id: &str, factory: ModuleFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    /// Instantiate the module registered under `id`.
    pub fn resolve(&self, id: &str) -> Option<Box<dyn Module>> {
        self.factories.get(id).map(|factory| factory())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.factories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Module for Noop {
        async fn run(&mut self, _ctx: &ModuleContext) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn registry_resolves_registered_factories() {
        let mut registry = ModuleRegistry::new();
        registry.register("noop", || Box::new(Noop));

        assert!(registry.contains("noop"));
        assert!(registry.resolve("noop").is_some());
        assert!(registry.resolve("missing").is_none());
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn wait_for_times_out() {
        let store = Store::open_memory().unwrap();
        store.migrate().unwrap();
        let ctx = ModuleContext::new("m1", "https://site.test/", None, store);

        assert!(ctx.wait_for(|| true, Duration::from_millis(10)).await);
        assert!(!ctx.wait_for(|| false, Duration::from_millis(10)).await);
    }

    #[test]
    fn context_storage_is_namespaced() {
        let store = Store::open_memory().unwrap();
        store.migrate().unwrap();

        let a = ModuleContext::new("a", "https://site.test/", None, store.clone());
        let b = ModuleContext::new("b", "https://site.test/", None, store);

        a.set("k", "from-a").unwrap();
        assert_eq!(a.get("k").as_deref(), Some("from-a"));
        assert_eq!(b.get("k"), None);
    }
}
