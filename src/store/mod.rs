//! Persisted loader state.
//!
//! One SQLite database holds everything that must survive a page reload:
//! the per-module enablement overrides, the manifest cache and its version
//! tag, the update notifier's markers, and a key-value table namespaced by
//! module id that backs the storage capability handed to running modules.
//! Writes are last-write-wins; toggles are user-driven and infrequent, so
//! no transaction coordination is needed.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::models::Manifest;

const META_MANIFEST_CACHE: &str = "manifest_cache";
const META_MANIFEST_CACHE_VERSION: &str = "manifest_cache_version";
const META_LAST_NOTIFIED_VERSION: &str = "last_notified_version";
const META_LAST_UPDATE_CHECK: &str = "last_update_check";

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Store path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "loadout")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("loadout.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("store lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Enablement
    // ============================================================

    /// Explicit enablement override for a module, `None` when never toggled.
    pub fn enabled_override(&self, module_id: &str) -> Result<Option<bool>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let row: Option<i32> = conn
            .query_row(
                "SELECT enabled FROM enablement WHERE module_id = ?",
                [module_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.map(|v| v != 0))
    }

    /// Whether a module is enabled. Defaults to `true` when never toggled.
    pub fn is_enabled(&self, module_id: &str) -> Result<bool> {
        Ok(self.enabled_override(module_id)?.unwrap_or(true))
    }

    /// Persist an enablement toggle. Last write wins.
    pub fn set_enabled(&self, module_id: &str, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute(
            "INSERT INTO enablement (module_id, enabled, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(module_id) DO UPDATE SET enabled = excluded.enabled,
                                                  updated_at = excluded.updated_at",
            (module_id, enabled as i32, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    /// All module ids explicitly toggled on.
    pub fn enabled_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn
            .prepare("SELECT module_id FROM enablement WHERE enabled = 1 ORDER BY module_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    // ============================================================
    // Manifest cache
    // ============================================================

    /// Overwrite the cached manifest unconditionally.
    pub fn cache_manifest(&self, manifest: &Manifest) -> Result<()> {
        let body = serde_json::to_string(manifest)?;
        self.set_meta(META_MANIFEST_CACHE, &body)?;
        self.set_meta(META_MANIFEST_CACHE_VERSION, &manifest.version)?;
        Ok(())
    }

    /// The cached manifest, if a previous fetch succeeded.
    pub fn cached_manifest(&self) -> Result<Option<Manifest>> {
        match self.get_meta(META_MANIFEST_CACHE)? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    // ============================================================
    // Update notifier markers
    // ============================================================

    pub fn last_notified_version(&self) -> Result<Option<String>> {
        self.get_meta(META_LAST_NOTIFIED_VERSION)
    }

    pub fn set_last_notified_version(&self, version: &str) -> Result<()> {
        self.set_meta(META_LAST_NOTIFIED_VERSION, version)
    }

    pub fn last_update_check(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.get_meta(META_LAST_UPDATE_CHECK)?;
        Ok(raw
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    pub fn touch_update_check(&self) -> Result<()> {
        self.set_meta(META_LAST_UPDATE_CHECK, &Utc::now().to_rfc3339())
    }

    // ============================================================
    // Module KV (storage capability)
    // ============================================================

    /// Read a value written by a module through its storage capability.
    pub fn module_get(&self, module_id: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let value = conn
            .query_row(
                "SELECT value FROM module_kv WHERE module_id = ? AND key = ?",
                [module_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a value under a module's namespace.
    pub fn module_set(&self, module_id: &str, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute(
            "INSERT INTO module_kv (module_id, key, value, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(module_id, key) DO UPDATE SET value = excluded.value,
                                                       updated_at = excluded.updated_at",
            (module_id, key, value, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    // ============================================================
    // Meta helpers
    // ============================================================

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let value = conn
            .query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute(
            "INSERT INTO meta (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            (key, value, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }
}
