// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape request dispatch
//!
//! Validates the URL, answers from the cache when possible and otherwise
//! runs the pipeline on the worker pool. Only successful results are cached.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::{CacheStats, ScrapeCache};
use super::config::ScraperConfig;
use super::fetcher::PageSource;
use super::pipeline::Pipeline;
use super::pool::{PoolStats, WorkerPool};
use super::types::{ScrapeError, ScrapeResult};
use super::validation::{is_safe_url, parse_scrape_url};

/// Entry point for scrape requests
///
/// Constructed once at startup and shared by every request handler.
pub struct Dispatcher {
    cache: Arc<ScrapeCache>,
    pool: WorkerPool,
    block_private_hosts: bool,
    shutdown_grace: Duration,
    sweeper: CancellationToken,
}

impl Dispatcher {
    /// Build the cache and worker pool and start the cache sweeper
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &ScraperConfig, source: Arc<dyn PageSource>) -> Self {
        let cache = Arc::new(ScrapeCache::from_config(&config.cache));
        let sweeper = CancellationToken::new();
        cache.spawn_sweeper(
            Duration::from_secs(config.cache.sweep_interval_secs),
            sweeper.clone(),
        );

        let pipeline = Arc::new(Pipeline::new(source));
        Self {
            cache,
            pool: WorkerPool::new(config.pool.clone(), pipeline),
            block_private_hosts: config.fetch.block_private_hosts,
            shutdown_grace: config.pool.shutdown_grace(),
            sweeper,
        }
    }

    /// Scrape `url` to Markdown, answering from the cache when fresh
    pub async fn handle_scrape(&self, url: &str) -> Result<ScrapeResult, ScrapeError> {
        let url = parse_scrape_url(url)?;
        if self.block_private_hosts && !is_safe_url(&url) {
            warn!("Refusing to scrape private address {}", url);
            return Err(ScrapeError::UnsafeUrl(url.to_string()));
        }

        let key = ScrapeCache::key_for(&url);
        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit for {}", url);
            return Ok(hit.as_ref().clone());
        }
        debug!("Cache miss for {}", url);

        let result = self.pool.submit(url).await?;
        self.cache
            .set(&key, Arc::new(result.clone()), self.cache.ttl());
        Ok(result)
    }

    /// Drop every cached result, returning how many were removed
    pub fn clear_cache(&self) -> usize {
        let cleared = self.cache.clear();
        info!("Cleared {} cached results", cleared);
        cleared
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Stop the sweeper and drain the worker pool
    pub async fn shutdown(&self) {
        self.sweeper.cancel();
        self.pool.shutdown(self.shutdown_grace).await;
    }
}
