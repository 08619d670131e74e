// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server configuration

use std::time::Duration;

use crate::scrape::config::env_or;

/// Route-layer settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0)
    pub host: String,
    /// Listen port (default: 3000)
    pub port: u16,
    /// Rate-limit window in seconds (default: 900 = 15 minutes)
    pub rate_limit_window_secs: u64,
    /// Requests allowed per client IP within one window (default: 100)
    pub rate_limit_max_requests: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("HOST", defaults.host),
            port: env_or("PORT", defaults.port),
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs),
            rate_limit_max_requests: env_or(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            ),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host cannot be empty".to_string());
        }
        if self.rate_limit_window_secs == 0 {
            return Err("rate_limit_window_secs must be greater than 0".to_string());
        }
        if self.rate_limit_max_requests == 0 {
            return Err("rate_limit_max_requests must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            rate_limit_window_secs: 900,
            rate_limit_max_requests: 100,
        }
    }
}
