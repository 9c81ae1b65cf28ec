//! Loader configuration.
//!
//! Configuration is a handful of constants with environment overrides:
//! - `LOADOUT_MANIFEST_URL` - manifest location (default below)
//! - `LOADOUT_BASE_URL` - base URL for module payload paths
//! - `LOADOUT_CHECK_INTERVAL_SECS` - update check interval

use std::time::Duration;

/// Default manifest location.
const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/rocket-tycoon/loadout/main/manifest.json";

/// Default base URL module `file` paths are resolved against.
const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/rocket-tycoon/loadout/main";

/// Runtime configuration, constructed once at startup and injected into
/// each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub manifest_url: String,
    pub base_url: String,
    /// Bound on each manifest/payload fetch.
    pub fetch_timeout: Duration,
    /// Interval between periodic update checks.
    pub check_interval: Duration,
    /// Delay before the first update check after startup.
    pub initial_check_delay: Duration,
}

impl Config {
    /// Create configuration from environment variables, falling back to
    /// the built-in defaults.
    pub fn from_env() -> Self {
        let manifest_url = std::env::var("LOADOUT_MANIFEST_URL")
            .unwrap_or_else(|_| DEFAULT_MANIFEST_URL.to_string());
        let base_url =
            std::env::var("LOADOUT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let check_interval = std::env::var("LOADOUT_CHECK_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(600));

        Self {
            manifest_url,
            base_url,
            check_interval,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout: Duration::from_secs(15),
            check_interval: Duration::from_secs(600),
            initial_check_delay: Duration::from_secs(30),
        }
    }
}
