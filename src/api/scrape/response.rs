// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape API response types

use serde::{Deserialize, Serialize};

use crate::scrape::ScrapeResult;

/// Response body for POST /scrape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeApiResponse {
    /// Assembled Markdown document
    pub markdown: String,

    /// Time taken to produce the document in milliseconds
    pub execution_time_ms: f64,
}

impl From<ScrapeResult> for ScrapeApiResponse {
    fn from(result: ScrapeResult) -> Self {
        Self {
            markdown: result.markdown,
            execution_time_ms: result.execution_time_ms,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearCacheResponse {
    /// Number of cached results removed
    pub cleared: usize,
}
