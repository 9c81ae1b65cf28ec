//! Loader event bus.
//!
//! A `tokio::sync::broadcast` channel carrying [`LoaderEvent`] values.
//! The dispatcher and update notifier emit; any consumer (the control
//! surface, the CLI, log sinks) can subscribe independently. When no
//! subscribers exist, events are silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Every event loadout emits. Serialized to JSON for external consumers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoaderEvent {
    /// A manifest was loaded (fresh or from cache).
    ManifestLoaded { version: String, modules: usize },
    /// A module was activated on the current page.
    ModuleLoaded { id: String },
    /// A module failed to fetch, init, or run.
    ModuleFailed { id: String, error: String },
    /// A utility module was toggled off and cleaned up.
    ModuleUnloaded { id: String },
    /// A newer release was seen for the first time.
    UpdateAvailable { current: String, latest: String },
    /// A manual update check found nothing newer.
    UpToDate { version: String },
}

/// The central event bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LoaderEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: LoaderEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<LoaderEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_round_trip() {
        let event = LoaderEvent::UpdateAvailable {
            current: "1.2.0".to_string(),
            latest: "1.10.0".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("UpdateAvailable"));
        assert!(json.contains("1.10.0"));

        let parsed: LoaderEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            LoaderEvent::UpdateAvailable { latest, .. } => assert_eq!(latest, "1.10.0"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn emit_without_subscribers_is_a_noop() {
        let bus = EventBus::new(16);
        bus.emit(LoaderEvent::ModuleLoaded {
            id: "m1".to_string(),
        });
    }

    #[test]
    fn subscribers_receive_emitted_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(LoaderEvent::ModuleLoaded {
            id: "m1".to_string(),
        });

        match rx.try_recv().unwrap() {
            LoaderEvent::ModuleLoaded { id } => assert_eq!(id, "m1"),
            _ => panic!("wrong event"),
        }
    }
}
