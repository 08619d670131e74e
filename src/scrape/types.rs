// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for the scrape pipeline

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw response of a single page fetch
///
/// Owned by the pipeline run that produced it and dropped once parsed.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Response body, already decoded from its content-transfer encoding
    pub body: Bytes,
    /// HTTP status code of the final response
    pub status_code: u16,
    /// Content-Encoding the server applied, if any
    pub content_encoding: Option<String>,
}

impl FetchResult {
    /// Body as text for the HTML parser
    ///
    /// Invalid UTF-8 is replaced rather than rejected. A body containing NUL
    /// bytes is not text at all and yields an empty string.
    pub fn text(&self) -> String {
        if self.body.contains(&0) {
            return String::new();
        }
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Final artifact handed back to callers and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    /// Assembled Markdown document
    pub markdown: String,
    /// Wall-clock time spent producing the document, in milliseconds
    pub execution_time_ms: f64,
}

/// Errors raised while fetching a page
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// The attempt exceeded its deadline and was aborted
    #[error("Request timed out after {timeout_ms}ms: {url}")]
    Timeout {
        /// URL being fetched
        url: String,
        /// Deadline that was exceeded
        timeout_ms: u64,
    },

    /// Could not connect or the transport failed mid-request
    #[error("Connection error: {0}")]
    Connection(String),

    /// Remote answered with a status >= 400
    #[error("HTTP error! status: {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// URL being fetched
        url: String,
    },

    /// Redirect chain was too long or left the allowed hosts
    #[error("Redirect refused: {0}")]
    Redirect(String),

    /// Body could not be read (too large)
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// Body could not be decoded from its content-encoding
    #[error("Failed to decode {0} response body")]
    Decode(String),
}

impl FetchError {
    /// Whether another attempt with the same parameters may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection(_))
    }
}

/// Errors surfaced by the dispatcher to its callers
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// Input is not an absolute http(s) URL
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// URL points at a local or private address
    #[error("Unsafe URL blocked: {0}")]
    UnsafeUrl(String),

    /// Fetch failed after exhausting its retries
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The worker queue is full
    #[error("Scrape queue is full ({queue_depth} pending), try again later")]
    PoolSaturated {
        /// Configured queue depth
        queue_depth: usize,
    },

    /// The worker pool no longer accepts work
    #[error("Scrape worker pool is shut down")]
    PoolClosed,

    /// The job did not complete within the overall deadline
    #[error("Scrape timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline that was exceeded
        timeout_ms: u64,
    },

    /// The pipeline task panicked or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl ScrapeError {
    /// Whether the error is the caller's fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::UnsafeUrl(_))
    }
}
