//! HTTP access to the remote manifest and module payloads.
//!
//! One [`Fetcher`] owns the `reqwest` client and the configured URLs.
//! Every request carries a cache-busting query parameter so stale CDN
//! copies never mask a release, and the whole round trip is bounded by
//! the configured timeout.

use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::Config;
use crate::models::Manifest;
use crate::store::Store;

/// Fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} fetching {url}")]
    Status { status: StatusCode, url: String },

    #[error("Malformed manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Manifest unavailable: fetch failed and no cached copy exists")]
    ManifestUnavailable,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    manifest_url: String,
    base_url: String,
    client: Client,
}

impl Fetcher {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .expect("HTTP client construction failed");
        Self {
            manifest_url: config.manifest_url.clone(),
            base_url: config.base_url.clone(),
            client,
        }
    }

    /// One network round trip for the manifest. No cache involvement.
    pub async fn fetch_manifest(&self) -> Result<Manifest, FetchError> {
        let body = self.get_text(&self.manifest_url).await?;
        let manifest = serde_json::from_str(&body)?;
        Ok(manifest)
    }

    /// Fetch a module's remote payload by its manifest `file` path.
    pub async fn fetch_module_payload(&self, file: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), file);
        self.get_text(&url).await
    }

    /// Load the manifest with cache fallback.
    ///
    /// A successful fetch overwrites the cached copy unconditionally.
    /// On failure the cached copy is returned instead; when that is also
    /// absent the caller gets [`FetchError::ManifestUnavailable`] and must
    /// degrade to "no modules loaded".
    pub async fn load_manifest(&self, store: &Store) -> Result<Manifest, FetchError> {
        match self.fetch_manifest().await {
            Ok(manifest) => {
                if let Err(e) = store.cache_manifest(&manifest) {
                    tracing::warn!("Failed to cache manifest: {}", e);
                }
                tracing::info!(
                    "Loaded manifest v{} ({} modules)",
                    manifest.version,
                    manifest.modules.len()
                );
                Ok(manifest)
            }
            Err(e) => {
                tracing::error!("Manifest fetch failed: {}", e);
                match store.cached_manifest() {
                    Ok(Some(cached)) => {
                        tracing::info!("Using cached manifest v{}", cached.version);
                        Ok(cached)
                    }
                    Ok(None) => Err(FetchError::ManifestUnavailable),
                    Err(store_err) => {
                        tracing::warn!("Manifest cache read failed: {}", store_err);
                        Err(FetchError::ManifestUnavailable)
                    }
                }
            }
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .query(&[("t", chrono::Utc::now().timestamp_millis().to_string())])
            .header("Cache-Control", "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}
