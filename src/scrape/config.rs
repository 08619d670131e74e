// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the scrape pipeline
//!
//! Defines settings for HTTP fetching, the worker pool and the result cache.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Browser User-Agent sent with every fetch
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Settings for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Hard deadline per attempt in milliseconds (default: 8000)
    pub timeout_ms: u64,
    /// Additional attempts after a transient failure (default: 2)
    pub max_retries: u32,
    /// Pause between attempts in milliseconds (default: 250)
    pub retry_backoff_ms: u64,
    /// Redirects followed before giving up (default: 5)
    pub max_redirects: usize,
    /// Largest body accepted, after decoding (default: 10 MiB)
    pub max_body_bytes: usize,
    /// User-Agent header value
    pub user_agent: String,
    /// Refuse localhost and private network targets (default: true)
    pub block_private_hosts: bool,
}

impl FetchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: env_or("SCRAPE_FETCH_TIMEOUT_MS", defaults.timeout_ms),
            max_retries: env_or("SCRAPE_FETCH_MAX_RETRIES", defaults.max_retries),
            retry_backoff_ms: env_or("SCRAPE_FETCH_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            max_redirects: env_or("SCRAPE_FETCH_MAX_REDIRECTS", defaults.max_redirects),
            max_body_bytes: env_or("SCRAPE_FETCH_MAX_BODY_BYTES", defaults.max_body_bytes),
            user_agent: env::var("SCRAPE_USER_AGENT").unwrap_or(defaults.user_agent),
            block_private_hosts: env::var("SCRAPE_BLOCK_PRIVATE_HOSTS")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.block_private_hosts),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("fetch timeout must be greater than 0".to_string());
        }
        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8000,
            max_retries: 2,
            retry_backoff_ms: 250,
            max_redirects: 5,
            max_body_bytes: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            block_private_hosts: true,
        }
    }
}

/// Settings for the worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Workers kept alive while idle (default: 2)
    pub min_workers: usize,
    /// Upper bound on concurrent pipeline runs (default: 4)
    pub max_workers: usize,
    /// Jobs allowed to wait for a worker (default: 1000)
    pub max_queue_size: usize,
    /// Overall deadline for a submitted job in milliseconds (default: 60000)
    pub job_timeout_ms: u64,
    /// Idle time after which surplus workers retire (default: 30000)
    pub idle_timeout_ms: u64,
    /// Time allowed for in-flight work to drain on shutdown (default: 60000)
    pub shutdown_grace_ms: u64,
}

impl PoolConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_workers: env_or("SCRAPE_POOL_MIN_WORKERS", defaults.min_workers),
            max_workers: env_or("SCRAPE_POOL_MAX_WORKERS", defaults.max_workers),
            max_queue_size: env_or("SCRAPE_POOL_MAX_QUEUE", defaults.max_queue_size),
            job_timeout_ms: env_or("SCRAPE_POOL_JOB_TIMEOUT_MS", defaults.job_timeout_ms),
            idle_timeout_ms: env_or("SCRAPE_POOL_IDLE_TIMEOUT_MS", defaults.idle_timeout_ms),
            shutdown_grace_ms: env_or("SCRAPE_POOL_SHUTDOWN_GRACE_MS", defaults.shutdown_grace_ms),
        }
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be at least 1".to_string());
        }
        if self.min_workers > self.max_workers {
            return Err("min_workers cannot exceed max_workers".to_string());
        }
        if self.max_queue_size == 0 {
            return Err("max_queue_size must be at least 1".to_string());
        }
        if self.job_timeout_ms == 0 {
            return Err("job_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 4,
            max_queue_size: 1000,
            job_timeout_ms: 60_000,
            idle_timeout_ms: 30_000,
            shutdown_grace_ms: 60_000,
        }
    }
}

/// Settings for the result cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live in seconds (default: 600 = 10 minutes)
    pub ttl_secs: u64,
    /// Interval between expiry sweeps in seconds (default: 360)
    pub sweep_interval_secs: u64,
    /// Maximum cache entries (default: 1000)
    pub max_entries: usize,
}

impl CacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_secs: env_or("SCRAPE_CACHE_TTL_SECS", defaults.ttl_secs),
            sweep_interval_secs: env_or("SCRAPE_CACHE_SWEEP_SECS", defaults.sweep_interval_secs),
            max_entries: env_or("SCRAPE_CACHE_MAX_ENTRIES", defaults.max_entries),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.ttl_secs == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }
        if self.max_entries == 0 {
            return Err("max_entries must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            sweep_interval_secs: 360,
            max_entries: 1000,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct ScraperConfig {
    pub fetch: FetchConfig,
    pub pool: PoolConfig,
    pub cache: CacheConfig,
}

impl ScraperConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            fetch: FetchConfig::from_env(),
            pool: PoolConfig::from_env(),
            cache: CacheConfig::from_env(),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.fetch.validate()?;
        self.pool.validate()?;
        self.cache.validate()
    }
}
