//! Analysis Cache
//!
//! Memoizes full pipeline results keyed by image content hash.
//!
//! # Architecture
//! - [`CacheStore`]: key/value store with per-entry TTL (string values,
//!   the shape of a Redis-style store)
//! - [`MemoryCacheStore`]: in-process store; expired entries are evicted
//!   lazily on read, or in bulk by [`MemoryCacheStore::purge_expired`]
//! - [`AnalysisCache`]: typed layer storing [`AnalysisResult`] as JSON
//!
//! # Failure Handling
//! The cache is never fatal. Every [`CacheError`] is logged with `warn!` and
//! converted to a miss (reads) or a no-op (writes). Concurrent writers for
//! the same key race; the last writer wins.

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::types::AnalysisResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use classview_common::time::{Clock, SystemClock};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Hex SHA-256 of the image bytes
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

// ============================================================================
// Store abstraction
// ============================================================================

/// String key/value store with expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value for `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Insert or overwrite `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Live keys matching a glob pattern (`*` any run, `?` one character)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Liveness probe
    async fn ping(&self) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct StoreEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process [`CacheStore`]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, StoreEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.expires_at);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed = removed, "Purged expired cache entries");
        }
        removed
    }

    /// Number of stored entries, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if now <= entry.expires_at => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: evict, unless a writer refreshed it in between
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if now <= entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
            debug!(key = key, "Evicted expired cache entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let ttl = ChronoDuration::from_std(ttl)
            .map_err(|e| CacheError::Store(format!("invalid ttl: {}", e)))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| CacheError::Store("ttl overflows timestamp range".to_string()))?;

        self.entries
            .write()
            .await
            .insert(key.to_string(), StoreEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| now <= entry.expires_at && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Glob match supporting `*` and `?`
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = star {
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

// ============================================================================
// Typed analysis cache
// ============================================================================

/// Analysis results cached as JSON under `<prefix><content hash>`
#[derive(Clone)]
pub struct AnalysisCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    prefix: String,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        let defaults = CacheConfig::default();
        Self {
            store,
            ttl: Duration::from_secs(defaults.ttl_seconds),
            prefix: defaults.key_prefix,
        }
    }

    pub fn from_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self::new(store)
            .with_ttl(Duration::from_secs(config.ttl_seconds))
            .with_prefix(config.key_prefix.clone())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for an image
    pub fn key_for(&self, image: &[u8]) -> String {
        format!("{}{}", self.prefix, content_hash(image))
    }

    /// Cached result, or `None` on miss, expiry or store failure
    pub async fn get(&self, key: &str) -> Option<AnalysisResult> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<AnalysisResult>(&raw) {
            Ok(result) => {
                debug!(key = key, "Cache hit");
                Some(result)
            }
            Err(e) => {
                warn!(key = key, error = %CacheError::from(e), "Discarding unreadable cache entry");
                self.invalidate(key).await;
                None
            }
        }
    }

    /// Store with the default TTL; returns whether the write succeeded
    pub async fn set(&self, key: &str, result: &AnalysisResult) -> bool {
        self.set_with_ttl(key, result, self.ttl).await
    }

    pub async fn set_with_ttl(&self, key: &str, result: &AnalysisResult, ttl: Duration) -> bool {
        let raw = match serde_json::to_string(result) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    key = key,
                    error = %CacheError::from(e),
                    "Cache serialization failed, skipping write"
                );
                return false;
            }
        };

        match self.store.set(key, raw, ttl).await {
            Ok(()) => {
                debug!(key = key, ttl_secs = ttl.as_secs(), "Cached analysis result");
                true
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Remove one entry; returns whether it existed
    pub async fn invalidate(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(key = key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Remove entries whose key (after the prefix) matches `pattern`
    ///
    /// Returns the number of entries removed.
    pub async fn clear(&self, pattern: &str) -> usize {
        let full_pattern = format!("{}{}", self.prefix, pattern);
        let keys = match self.store.keys(&full_pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern = %full_pattern, error = %e, "Cache key scan failed");
                return 0;
            }
        };

        let mut removed = 0;
        for key in &keys {
            if self.invalidate(key).await {
                removed += 1;
            }
        }
        debug!(pattern = %full_pattern, removed = removed, "Cleared cache entries");
        removed
    }

    /// Whether the backing store answers
    pub async fn health_check(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        }
    }
}
