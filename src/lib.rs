//! loadout: a remote-manifest module loader.
//!
//! A remote JSON manifest describes automation modules (id, version, URL
//! match patterns, enablement). The [`dispatch::Dispatcher`] decides which
//! modules apply to the current page URL, activates them through the
//! static [`plugin::ModuleRegistry`], and tracks the running set. State
//! that must survive reloads (enablement toggles, manifest cache, update
//! markers, per-module key-value data) lives in the SQLite-backed
//! [`store::Store`]. The [`notify::UpdateNotifier`] watches the manifest
//! version and announces new releases once each.

pub mod config;
pub mod control;
pub mod dispatch;
pub mod events;
pub mod fetch;
pub mod matcher;
pub mod models;
pub mod modules;
pub mod notify;
pub mod plugin;
pub mod store;
pub mod version;
