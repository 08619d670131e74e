// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Result caching for scraped pages
//!
//! Provides TTL-based caching so hot URLs skip the fetch/parse/convert work.
//! Entries are split across shards, each behind its own `RwLock`, so a write
//! only blocks readers that hash to the same shard.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::config::CacheConfig;
use super::types::ScrapeResult;

const MAX_SHARDS: usize = 16;

/// A cached result and its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<ScrapeResult>,
    pub inserted_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub max: usize,
}

type Shard = RwLock<HashMap<String, CacheEntry>>;

/// Scrape result cache with TTL-based expiration
pub struct ScrapeCache {
    shards: Vec<Shard>,
    per_shard_capacity: usize,
    ttl: Duration,
    max_entries: usize,
}

impl ScrapeCache {
    /// Create a new cache
    ///
    /// # Arguments
    /// * `ttl` - Default time-to-live for entries
    /// * `max_entries` - Maximum number of entries before eviction
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        let shard_count = max_entries.min(MAX_SHARDS);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
            per_shard_capacity: max_entries / shard_count,
            ttl,
            max_entries,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    /// Default TTL applied by [`ScrapeCache::insert`]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stable cache key for a URL
    ///
    /// SHA-256 of the URL with its fragment dropped and a trailing `/` trimmed
    /// from the path. The query is kept as is; scheme and host are already
    /// lowercased by the URL parser.
    pub fn key_for(url: &Url) -> String {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        let path = normalized.path();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed = path.trim_end_matches('/').to_string();
            normalized.set_path(&trimmed);
        }
        hex::encode(Sha256::digest(normalized.as_str().as_bytes()))
    }

    /// Get a cached result if present and not expired
    pub fn get(&self, key: &str) -> Option<Arc<ScrapeResult>> {
        let shard = self.shard(key);
        let now = Instant::now();
        {
            let entries = read_shard(shard);
            let entry = entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }

        // Expired: evict lazily unless a fresh value replaced it meanwhile.
        let mut entries = write_shard(shard);
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry
    pub fn set(&self, key: &str, value: Arc<ScrapeResult>, ttl: Duration) {
        let shard = self.shard(key);
        let mut entries = write_shard(shard);

        if !entries.contains_key(key) && entries.len() >= self.per_shard_capacity {
            let now = Instant::now();
            entries.retain(|_, e| !e.is_expired(now));
            if entries.len() >= self.per_shard_capacity {
                Self::evict_oldest(&mut entries);
            }
        }

        let now = Instant::now();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Store `value` for `url` with the default TTL
    pub fn insert(&self, url: &Url, value: Arc<ScrapeResult>) {
        self.set(&Self::key_for(url), value, self.ttl);
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for shard in &self.shards {
            let mut entries = write_shard(shard);
            let before = entries.len();
            entries.retain(|_, e| !e.is_expired(now));
            removed += before - entries.len();
        }
        removed
    }

    /// Clear all cached entries, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut entries = write_shard(shard);
            removed += entries.len();
            entries.clear();
        }
        removed
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut total = 0;
        let mut expired = 0;
        for shard in &self.shards {
            let entries = read_shard(shard);
            total += entries.len();
            expired += entries.values().filter(|e| e.is_expired(now)).count();
        }
        CacheStats {
            total,
            expired,
            max: self.max_entries,
        }
    }

    /// Spawn the periodic expiry sweep, stopped by `shutdown`
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let period = interval.max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            debug!("Cache sweep removed {} expired entries", removed);
                        }
                    }
                }
            }
        })
    }

    fn shard(&self, key: &str) -> &Shard {
        let hash = key
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        &self.shards[hash % self.shards.len()]
    }

    fn evict_oldest(entries: &mut HashMap<String, CacheEntry>) {
        if let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, v)| v.inserted_at)
            .map(|(k, _)| k.clone())
        {
            entries.remove(&oldest_key);
        }
    }
}

// Entries are immutable once stored, so a shard left poisoned by a panicking
// holder is still consistent and can be reused.
fn read_shard(shard: &Shard) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
    shard.read().unwrap_or_else(|poisoned| {
        warn!("Cache shard lock was poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

fn write_shard(shard: &Shard) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
    shard.write().unwrap_or_else(|poisoned| {
        warn!("Cache shard lock was poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}
