// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape API request types

use serde::{Deserialize, Serialize};

/// Request body for POST /scrape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeApiRequest {
    /// Page to convert; must be an absolute http(s) URL
    #[serde(default)]
    pub url: Option<String>,
}

impl ScrapeApiRequest {
    /// Validate the request, returning the URL to scrape
    pub fn validate(&self) -> Result<&str, String> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err("URL is required".to_string()),
        }
    }
}
