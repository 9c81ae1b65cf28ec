//! Update notifier.
//!
//! Periodically re-fetches the manifest and compares its release version
//! against the last version the user was told about. A strictly newer
//! version fires [`LoaderEvent::UpdateAvailable`] exactly once: the marker
//! is persisted before the event goes out, so ticks that race user action
//! cannot re-fire. Fetch failures are logged and the loop keeps going.

use crate::events::{EventBus, LoaderEvent};
use crate::fetch::Fetcher;
use crate::store::Store;
use crate::version;

/// Outcome of a single check, surfaced directly for manual "check now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// First sighting of a newer version; notification fired.
    UpdateAvailable { current: String, latest: String },
    /// Nothing newer than the last-notified version.
    UpToDate { version: String },
    /// The manifest could not be fetched this tick.
    Unavailable,
}

pub struct UpdateNotifier {
    fetcher: Fetcher,
    store: Store,
    bus: EventBus,
}

impl UpdateNotifier {
    pub fn new(fetcher: Fetcher, store: Store, bus: EventBus) -> Self {
        Self {
            fetcher,
            store,
            bus,
        }
    }

    /// Run the periodic loop: one delayed initial check, then fixed-interval
    /// ticks. Never returns; callers spawn it.
    pub async fn run(&self, initial_delay: std::time::Duration, interval: std::time::Duration) {
        tokio::time::sleep(initial_delay).await;
        self.check(false).await;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await; // first tick completes immediately
        loop {
            ticker.tick().await;
            self.check(false).await;
        }
    }

    /// One update check.
    ///
    /// `manual` marks a user-triggered "check now": the up-to-date outcome
    /// is then surfaced as a [`LoaderEvent::UpToDate`] so the user gets
    /// feedback, but an already-notified version is never announced twice.
    pub async fn check(&self, manual: bool) -> UpdateCheck {
        if let Err(e) = self.store.touch_update_check() {
            tracing::warn!("Failed to record update check time: {}", e);
        }

        let manifest = match self.fetcher.fetch_manifest().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Update check failed: {}", e);
                return UpdateCheck::Unavailable;
            }
        };

        let last_notified = match self.store.last_notified_version() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to read last-notified version: {}", e);
                None
            }
        };

        let latest = manifest.version;
        let Some(current) = last_notified else {
            // First check ever: baseline silently, there is no previous
            // version to announce an upgrade from.
            if let Err(e) = self.store.set_last_notified_version(&latest) {
                tracing::warn!("Failed to persist notified version: {}", e);
            }
            if manual {
                self.bus.emit(LoaderEvent::UpToDate {
                    version: latest.clone(),
                });
            }
            return UpdateCheck::UpToDate { version: latest };
        };

        if version::is_newer(&latest, &current) {
            // Persist before emitting so a racing tick sees the new marker.
            if let Err(e) = self.store.set_last_notified_version(&latest) {
                tracing::warn!("Failed to persist notified version: {}", e);
            }
            tracing::info!("Update available: {} -> {}", current, latest);
            self.bus.emit(LoaderEvent::UpdateAvailable {
                current: current.clone(),
                latest: latest.clone(),
            });
            UpdateCheck::UpdateAvailable { current, latest }
        } else {
            if manual {
                self.bus.emit(LoaderEvent::UpToDate {
                    version: latest.clone(),
                });
            }
            UpdateCheck::UpToDate { version: latest }
        }
    }
}
