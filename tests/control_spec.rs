//! Control channel integration tests: the typed replacement for the
//! dashboard's cross-window message vocabulary.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use loadout::config::Config;
use loadout::control::{self, ControlError, ControlRequest, ControlResponse};
use loadout::dispatch::Dispatcher;
use loadout::events::EventBus;
use loadout::fetch::Fetcher;
use loadout::models::Manifest;
use loadout::plugin::{Module, ModuleContext, ModuleRegistry};
use loadout::store::Store;

struct Noop;

#[async_trait]
impl Module for Noop {
    async fn run(&mut self, _ctx: &ModuleContext) -> Result<()> {
        Ok(())
    }
}

fn manifest() -> Manifest {
    serde_json::from_value(serde_json::json!({
        "version": "1.0.0",
        "modules": [
            { "id": "m1", "type": "screening" },
            { "id": "util-a", "type": "utility" }
        ]
    }))
    .expect("Failed to build manifest")
}

fn dispatcher() -> (Arc<Dispatcher>, Store) {
    let store = Store::open_memory().expect("Failed to create store");
    store.migrate().expect("Failed to migrate");
    let mut registry = ModuleRegistry::new();
    registry.register("m1", || Box::new(Noop));
    registry.register("util-a", || Box::new(Noop));
    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        store.clone(),
        Fetcher::new(&Config::default()),
        EventBus::new(16),
    ));
    (dispatcher, store)
}

#[tokio::test]
async fn get_status_reports_active_and_enabled_sets() {
    let (dispatcher, _store) = dispatcher();
    let (handle, rx) = control::channel(8);
    let serve = tokio::spawn(control::serve(
        dispatcher.clone(),
        manifest(),
        "https://site.test/".to_string(),
        rx,
    ));

    handle
        .send(ControlRequest::RunModule {
            module_id: "m1".to_string(),
        })
        .await
        .expect("Send failed");
    handle
        .send(ControlRequest::ToggleUtility {
            module_id: "util-a".to_string(),
            enabled: true,
        })
        .await
        .expect("Send failed");

    let status = handle
        .send(ControlRequest::GetStatus)
        .await
        .expect("Send failed");
    match status {
        ControlResponse::StatusResponse {
            active_modules,
            enabled_utilities,
        } => {
            assert_eq!(active_modules, vec!["m1", "util-a"]);
            assert_eq!(enabled_utilities, vec!["util-a"]);
        }
        other => panic!("expected status response, got {other:?}"),
    }

    handle
        .send(ControlRequest::Close)
        .await
        .expect("Send failed");
    serve.await.expect("Serve task panicked");
}

#[tokio::test]
async fn toggle_off_via_control_unloads_the_utility() {
    let (dispatcher, store) = dispatcher();
    let (handle, rx) = control::channel(8);
    tokio::spawn(control::serve(
        dispatcher.clone(),
        manifest(),
        "https://site.test/".to_string(),
        rx,
    ));

    handle
        .send(ControlRequest::ToggleUtility {
            module_id: "util-a".to_string(),
            enabled: true,
        })
        .await
        .expect("Send failed");
    assert_eq!(dispatcher.active_ids(), vec!["util-a"]);

    handle
        .send(ControlRequest::ToggleUtility {
            module_id: "util-a".to_string(),
            enabled: false,
        })
        .await
        .expect("Send failed");

    assert!(dispatcher.active_ids().is_empty());
    assert_eq!(
        store.enabled_override("util-a").expect("Query failed"),
        Some(false)
    );
}

#[tokio::test]
async fn close_stops_the_serve_loop() {
    let (dispatcher, _store) = dispatcher();
    let (handle, rx) = control::channel(8);
    let serve = tokio::spawn(control::serve(
        dispatcher,
        manifest(),
        "https://site.test/".to_string(),
        rx,
    ));

    let reply = handle
        .send(ControlRequest::Close)
        .await
        .expect("Send failed");
    assert_eq!(reply, ControlResponse::Ack);
    serve.await.expect("Serve task panicked");

    // The loop is gone; further sends fail instead of hanging.
    assert!(matches!(
        handle.send(ControlRequest::GetStatus).await,
        Err(ControlError::Closed)
    ));
}
