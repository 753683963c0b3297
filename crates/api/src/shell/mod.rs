//! Cache-first app shell.
//!
//! Static assets of the web app (HTML shell, JS bundles, icons, manifest) are
//! served from a versioned in-memory cache named `soko-shell-v{N}`. A request
//! that hits the cache never reaches the upstream origin; a miss is fetched,
//! stored and served. Bumping the version and calling [`ShellCache::activate`]
//! discards every older cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use moka::future::Cache;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Cache name prefix; the version number is appended.
pub const CACHE_PREFIX: &str = "soko-shell-v";

/// Assets fetched into a fresh cache at startup.
pub const PRECACHE_PATHS: &[&str] = &["/", "/manifest.json", "/favicon.ico"];

/// Upper bound on assets held per named cache.
const MAX_ASSETS: u64 = 512;

/// Errors that can occur while fetching shell assets.
#[derive(Debug, Error)]
pub enum ShellError {
    /// HTTP request to the origin failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The origin answered with an unexpected status.
    #[error("origin returned {status} for {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested asset path.
        path: String,
    },

    /// The path is not a plain relative asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(String),

    /// A path passed to [`ShellCache::install`] does not exist upstream.
    #[error("asset not found: {0}")]
    Missing(String),
}

/// A cached response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Whether a response came from the cache or the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value for the `x-cache` response header.
    #[must_use]
    pub const fn as_header(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// Where assets come from on a cache miss.
pub trait AssetSource: Send + Sync {
    /// Fetch an asset. `Ok(None)` means the origin has no such asset.
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Option<Asset>, ShellError>> + Send;
}

/// Fetches assets over HTTP from the frontend origin.
#[derive(Clone)]
pub struct UpstreamAssets {
    client: reqwest::Client,
    origin: Url,
}

impl UpstreamAssets {
    /// Create a source for `origin`.
    #[must_use]
    pub fn new(client: reqwest::Client, origin: Url) -> Self {
        Self { client, origin }
    }

    /// Resolve `path` against the origin, refusing anything that lands on
    /// another host.
    fn asset_url(&self, path: &str) -> Result<Url, ShellError> {
        let url = self
            .origin
            .join(path)
            .map_err(|_| ShellError::InvalidPath(path.to_string()))?;
        if url.origin() != self.origin.origin() {
            return Err(ShellError::InvalidPath(path.to_string()));
        }
        Ok(url)
    }
}

impl AssetSource for UpstreamAssets {
    #[instrument(skip(self), fields(origin = %self.origin))]
    async fn fetch(&self, path: &str) -> Result<Option<Asset>, ShellError> {
        let url = self.asset_url(path)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ShellError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(Some(Asset { body, content_type }))
    }
}

/// Named, versioned asset caches.
#[derive(Clone)]
pub struct ShellCache {
    active: String,
    caches: Arc<RwLock<HashMap<String, Cache<String, Asset>>>>,
}

impl ShellCache {
    /// Create the cache set with `soko-shell-v{version}` as the active cache.
    #[must_use]
    pub fn new(version: u32) -> Self {
        let active = format!("{CACHE_PREFIX}{version}");
        let mut caches = HashMap::new();
        caches.insert(active.clone(), new_cache());
        Self {
            active,
            caches: Arc::new(RwLock::new(caches)),
        }
    }

    /// Name of the cache new responses go into.
    #[must_use]
    pub fn active_name(&self) -> &str {
        &self.active
    }

    /// Names of every cache currently held.
    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Open (creating if needed) a cache by name.
    pub async fn open(&self, name: &str) -> Cache<String, Asset> {
        if let Some(cache) = self.caches.read().await.get(name) {
            return cache.clone();
        }
        self.caches
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(new_cache)
            .clone()
    }

    /// Pre-cache `paths` into the active cache.
    ///
    /// Fails on the first asset that cannot be fetched, leaving whatever was
    /// already stored in place.
    ///
    /// # Errors
    ///
    /// Returns `ShellError::Missing` if the origin has no such asset, or the
    /// source's error if the fetch fails.
    #[instrument(skip(self, paths, source), fields(cache = %self.active))]
    pub async fn install<S: AssetSource>(
        &self,
        paths: &[&str],
        source: &S,
    ) -> Result<usize, ShellError> {
        let cache = self.open(&self.active).await;
        for path in paths {
            let key = normalize_path(path)?;
            let asset = source
                .fetch(&key)
                .await?
                .ok_or_else(|| ShellError::Missing(key.clone()))?;
            cache.insert(key, asset).await;
        }
        info!(assets = paths.len(), "App shell installed");
        Ok(paths.len())
    }

    /// Delete every cache except the active one. Returns the removed names.
    pub async fn activate(&self) -> Vec<String> {
        let mut caches = self.caches.write().await;
        let stale: Vec<String> = caches
            .keys()
            .filter(|name| **name != self.active)
            .cloned()
            .collect();
        for name in &stale {
            if let Some(cache) = caches.remove(name) {
                cache.invalidate_all();
            }
            debug!(cache = %name, "Deleted stale shell cache");
        }
        caches.entry(self.active.clone()).or_insert_with(new_cache);
        stale
    }

    /// Serve `path` cache-first.
    ///
    /// A cache hit never calls `source`. A miss is fetched and, when the origin
    /// has the asset, stored for next time. `Ok(None)` means not found.
    ///
    /// # Errors
    ///
    /// Returns `ShellError::InvalidPath` for paths escaping the asset root,
    /// or the source's error on a failed miss.
    pub async fn fetch<S: AssetSource>(
        &self,
        path: &str,
        source: &S,
    ) -> Result<Option<(Asset, CacheStatus)>, ShellError> {
        let key = normalize_path(path)?;
        let cache = self.open(&self.active).await;

        if let Some(asset) = cache.get(&key).await {
            debug!(path = %key, "Shell cache hit");
            return Ok(Some((asset, CacheStatus::Hit)));
        }

        let Some(asset) = source.fetch(&key).await? else {
            return Ok(None);
        };
        cache.insert(key, asset.clone()).await;
        Ok(Some((asset, CacheStatus::Miss)))
    }
}

/// Spawn a background task that drops stale caches and pre-caches
/// [`PRECACHE_PATHS`].
///
/// Failures only mean the first requests are misses, so they are logged.
pub fn install_async(cache: ShellCache, source: UpstreamAssets) {
    tokio::spawn(async move {
        let removed = cache.activate().await;
        if !removed.is_empty() {
            info!(?removed, "Removed stale shell caches");
        }
        if let Err(e) = cache.install(PRECACHE_PATHS, &source).await {
            warn!(error = %e, "App shell pre-cache failed");
        }
    });
}

fn new_cache() -> Cache<String, Asset> {
    Cache::builder().max_capacity(MAX_ASSETS).build()
}

/// Strip leading slashes and reject anything that could leave the asset root.
/// The empty path maps to `index.html`.
///
/// A `:` anywhere would let `Url::join` read the path as a scheme.
fn normalize_path(path: &str) -> Result<String, ShellError> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.contains("..") || trimmed.contains('\\') || trimmed.contains(':') {
        return Err(ShellError::InvalidPath(path.to_string()));
    }
    if trimmed.is_empty() {
        Ok("index.html".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}
