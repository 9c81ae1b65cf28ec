//! Module dispatch.
//!
//! Given a manifest and the current page URL, the [`Dispatcher`] decides
//! which modules apply (enabled, not already active, URL-matched),
//! activates them through the plugin registry, and tracks the running set
//! for the page's lifetime. One module's failure never blocks the rest,
//! and nothing a module does can propagate an error out of the dispatch
//! loop.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::events::{EventBus, LoaderEvent};
use crate::fetch::Fetcher;
use crate::matcher;
use crate::models::{Manifest, ModuleDescriptor, ModuleType};
use crate::plugin::{Module, ModuleContext, ModuleRegistry};
use crate::store::Store;

/// In-memory record of a running module.
struct ActiveModule {
    descriptor: ModuleDescriptor,
    instance: Box<dyn Module>,
    started_at: DateTime<Utc>,
}

/// Point-in-time view of a running module, for status reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActiveModuleInfo {
    pub id: String,
    pub name: String,
    pub module_type: ModuleType,
    pub started_at: DateTime<Utc>,
}

pub struct Dispatcher {
    registry: ModuleRegistry,
    store: Store,
    fetcher: Fetcher,
    bus: EventBus,
    active: Mutex<HashMap<String, ActiveModule>>,
}

impl Dispatcher {
    pub fn new(registry: ModuleRegistry, store: Store, fetcher: Fetcher, bus: EventBus) -> Self {
        Self {
            registry,
            store,
            fetcher,
            bus,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Activate every module that applies to the current page.
    ///
    /// Returns the ids loaded by this call, in manifest order. Invoking
    /// this twice on an unchanged manifest and URL loads nothing new: the
    /// active set acts as an idempotence guard. A duplicate id later in
    /// the manifest is skipped by the same guard, so the first entry wins.
    pub async fn run_applicable(&self, manifest: &Manifest, url: &str) -> Vec<String> {
        let mut loaded = Vec::new();

        for descriptor in &manifest.modules {
            if !descriptor.enabled {
                tracing::debug!("Module {} disabled in manifest, skipping", descriptor.id);
                continue;
            }

            let stored = self.enabled_override(&descriptor.id);
            if stored == Some(false) {
                tracing::debug!("Module {} disabled by user, skipping", descriptor.id);
                continue;
            }
            // Utilities run only when the user has explicitly enabled them;
            // screening modules default on. Respect autoRun for the bulk
            // pass, a manual run_module can still start the rest.
            match descriptor.module_type {
                ModuleType::Utility if stored != Some(true) => continue,
                ModuleType::Screening if !descriptor.auto_run => continue,
                _ => {}
            }

            if self.is_active(&descriptor.id) {
                tracing::debug!("Module {} already active, skipping", descriptor.id);
                continue;
            }

            if !matcher::matches_any(&descriptor.match_patterns, url) {
                continue;
            }

            if self.activate(descriptor, url).await {
                loaded.push(descriptor.id.clone());
            }
        }

        tracing::info!("Dispatch complete: {} module(s) loaded", loaded.len());
        loaded
    }

    /// Explicit user-driven activation of a single module, bypassing the
    /// enablement and URL checks. A no-op when the module is already
    /// running or absent from the manifest.
    pub async fn run_module(&self, manifest: &Manifest, id: &str, url: &str) -> bool {
        let Some(descriptor) = manifest.module(id) else {
            tracing::warn!("Module {} not found in manifest", id);
            return false;
        };
        if self.is_active(id) {
            tracing::debug!("Module {} already active", id);
            return false;
        }
        self.activate(descriptor, url).await
    }

    /// Toggle a utility module, persisting the new state.
    ///
    /// Toggling on re-evaluates the URL patterns and activates when they
    /// match; toggling off deregisters the module and invokes its cleanup
    /// hook. Non-utility ids are rejected with a logged warning.
    pub async fn toggle_utility(&self, manifest: &Manifest, id: &str, enabled: bool, url: &str) {
        let Some(descriptor) = manifest.module(id) else {
            tracing::warn!("Utility {} not found in manifest", id);
            return;
        };
        if descriptor.module_type != ModuleType::Utility {
            tracing::warn!("Module {} is not a utility, ignoring toggle", id);
            return;
        }

        if let Err(e) = self.store.set_enabled(id, enabled) {
            tracing::warn!("Failed to persist toggle for {}: {}", id, e);
        }

        if enabled {
            if self.is_active(id) {
                return;
            }
            if !matcher::matches_any(&descriptor.match_patterns, url) {
                tracing::debug!("Utility {} enabled but URL does not match", id);
                return;
            }
            self.activate(descriptor, url).await;
        } else if let Some(mut record) = self.deregister(id) {
            record.instance.cleanup();
            self.bus.emit(LoaderEvent::ModuleUnloaded { id: id.to_string() });
            tracing::info!("Utility {} disabled", id);
        }
    }

    /// Ids of currently running modules, oldest first.
    pub fn active_ids(&self) -> Vec<String> {
        let active = self.active.lock().expect("active set lock poisoned");
        let mut records: Vec<_> = active
            .values()
            .map(|r| (r.started_at, r.descriptor.id.clone()))
            .collect();
        records.sort();
        records.into_iter().map(|(_, id)| id).collect()
    }

    /// Snapshot of the running set for status reporting.
    pub fn active_info(&self) -> Vec<ActiveModuleInfo> {
        let active = self.active.lock().expect("active set lock poisoned");
        let mut infos: Vec<_> = active
            .values()
            .map(|r| ActiveModuleInfo {
                id: r.descriptor.id.clone(),
                name: r.descriptor.name.clone(),
                module_type: r.descriptor.module_type,
                started_at: r.started_at,
            })
            .collect();
        infos.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        infos
    }

    /// Utility ids the user has explicitly enabled.
    pub fn enabled_utilities(&self) -> Vec<String> {
        match self.store.enabled_ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Failed to read enabled utilities: {}", e);
                Vec::new()
            }
        }
    }

    fn is_active(&self, id: &str) -> bool {
        self.active
            .lock()
            .expect("active set lock poisoned")
            .contains_key(id)
    }

    fn deregister(&self, id: &str) -> Option<ActiveModule> {
        self.active
            .lock()
            .expect("active set lock poisoned")
            .remove(id)
    }

    fn enabled_override(&self, id: &str) -> Option<bool> {
        match self.store.enabled_override(id) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Enablement read failed for {}: {}", id, e);
                None
            }
        }
    }

    /// Fetch, init, and run one module. Every failure path is terminal for
    /// this module only: it is logged, surfaced as `ModuleFailed`, and the
    /// caller moves on.
    async fn activate(&self, descriptor: &ModuleDescriptor, url: &str) -> bool {
        let id = &descriptor.id;

        let Some(mut instance) = self.registry.resolve(id) else {
            self.fail(id, "no module registered under this id");
            return false;
        };

        let payload = if descriptor.file.is_empty() {
            None
        } else {
            match self.fetcher.fetch_module_payload(&descriptor.file).await {
                Ok(text) => Some(text),
                Err(e) => {
                    self.fail(id, &format!("payload fetch failed: {e}"));
                    return false;
                }
            }
        };

        let ctx = ModuleContext::new(id, url, payload, self.store.clone());

        if let Err(e) = instance.init(&ctx).await {
            self.fail(id, &format!("init failed: {e:#}"));
            return false;
        }
        if let Err(e) = instance.run(&ctx).await {
            self.fail(id, &format!("run failed: {e:#}"));
            return false;
        }

        let record = ActiveModule {
            descriptor: descriptor.clone(),
            instance,
            started_at: Utc::now(),
        };
        self.active
            .lock()
            .expect("active set lock poisoned")
            .insert(id.clone(), record);

        tracing::info!("Module {} loaded", id);
        self.bus.emit(LoaderEvent::ModuleLoaded { id: id.clone() });
        true
    }

    fn fail(&self, id: &str, error: &str) {
        tracing::error!("Module {} failed: {}", id, error);
        self.bus.emit(LoaderEvent::ModuleFailed {
            id: id.to_string(),
            error: error.to_string(),
        });
    }
}
