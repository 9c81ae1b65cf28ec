//! Built-in modules.
//!
//! These are the compiled-in counterparts of the remote module catalog:
//! each registers under the manifest id the catalog refers to it by.
//! They double as working references for the capability surface a module
//! gets (payload, scoped storage, logging).

use anyhow::Result;
use async_trait::async_trait;

use crate::plugin::{Module, ModuleContext, ModuleRegistry};

/// Registry preloaded with every built-in module.
pub fn builtin_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register("visit-counter", || Box::new(VisitCounter));
    registry.register("activity-log", || Box::new(ActivityLog));
    registry
}

/// Screening module: counts visits to matching pages in scoped storage.
struct VisitCounter;

#[async_trait]
impl Module for VisitCounter {
    async fn run(&mut self, ctx: &ModuleContext) -> Result<()> {
        let visits = ctx
            .get("visits")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        ctx.set("visits", &visits.to_string())?;
        ctx.set("last_url", ctx.page_url())?;
        ctx.log(&format!("visit #{visits}"));
        Ok(())
    }
}

/// Utility module: records when it was toggled on and off.
struct ActivityLog;

#[async_trait]
impl Module for ActivityLog {
    async fn init(&mut self, ctx: &ModuleContext) -> Result<()> {
        ctx.set("started_at", &chrono::Utc::now().to_rfc3339())?;
        Ok(())
    }

    async fn run(&mut self, ctx: &ModuleContext) -> Result<()> {
        if let Some(note) = ctx.payload() {
            ctx.log(note.trim());
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        tracing::info!("activity-log stopped");
    }
}
