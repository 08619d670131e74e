// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP page fetching with per-attempt deadlines and bounded retries
//!
//! One [`HttpFetcher`] is built at startup and shared by every pipeline run;
//! its `reqwest::Client` keeps a keep-alive connection pool per scheme and
//! host, so no external locking is needed.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING};
use reqwest::{redirect, Client};
use std::io::Read;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use url::Url;

use super::config::FetchConfig;
use super::types::{FetchError, FetchResult};
use super::validation::is_safe_url;

/// Source of raw page bytes
///
/// The pipeline only depends on this trait, so tests can substitute a fake.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url`, retrying transient failures internally
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError>;
}

/// Fetcher backed by a pooled `reqwest` client
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );

        let max_redirects = config.max_redirects;
        let block_private = config.block_private_hosts;
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                attempt.error("too many redirects")
            } else if block_private && !is_safe_url(attempt.url()) {
                attempt.error("redirect to a private address")
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(policy)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// One GET attempt with no retry and no outer deadline
    async fn fetch_once(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty());

        let mut raw = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.map_transport_error(url, e))?
        {
            if raw.len() + chunk.len() > self.config.max_body_bytes {
                return Err(FetchError::Body(format!(
                    "body exceeds {} bytes",
                    self.config.max_body_bytes
                )));
            }
            raw.extend_from_slice(&chunk);
        }

        let body = decode_body(
            raw.freeze(),
            content_encoding.as_deref(),
            self.config.max_body_bytes,
        )?;

        Ok(FetchResult {
            body,
            status_code: status.as_u16(),
            content_encoding,
        })
    }

    fn map_transport_error(&self, url: &Url, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: self.config.timeout_ms,
            }
        } else if e.is_redirect() {
            FetchError::Redirect(e.to_string())
        } else {
            FetchError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            debug!("Fetching {} (attempt {}/{})", url, attempt, attempts);

            // Dropping the in-flight future on expiry tears down its connection.
            let error = match timeout(self.config.timeout(), self.fetch_once(url)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout {
                    url: url.to_string(),
                    timeout_ms: self.config.timeout_ms,
                },
            };

            if !error.is_transient() || attempt >= attempts {
                return Err(error);
            }

            warn!(
                "Fetch attempt {}/{} for {} failed: {}, retrying",
                attempt, attempts, url, error
            );
            attempt += 1;
            sleep(self.config.retry_backoff()).await;
        }
    }
}

/// Undo a gzip or deflate content-encoding
///
/// `deflate` is tried as zlib-wrapped first, then raw, since servers send both.
pub fn decode_body(
    body: Bytes,
    content_encoding: Option<&str>,
    max_bytes: usize,
) -> Result<Bytes, FetchError> {
    let encoding = match content_encoding {
        None | Some("identity") => return Ok(body),
        Some(encoding) => encoding,
    };

    let decoded = match encoding {
        "gzip" | "x-gzip" => read_limited(GzDecoder::new(&body[..]), max_bytes),
        "deflate" => read_limited(ZlibDecoder::new(&body[..]), max_bytes)
            .or_else(|_| read_limited(DeflateDecoder::new(&body[..]), max_bytes)),
        other => return Err(FetchError::Decode(other.to_string())),
    };

    decoded.map(Bytes::from).map_err(|e| match e {
        DecodeFailure::TooLarge => FetchError::Body(format!("body exceeds {} bytes", max_bytes)),
        DecodeFailure::Corrupt => FetchError::Decode(encoding.to_string()),
    })
}

enum DecodeFailure {
    TooLarge,
    Corrupt,
}

fn read_limited<R: Read>(reader: R, max_bytes: usize) -> Result<Vec<u8>, DecodeFailure> {
    let mut out = Vec::new();
    reader
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| DecodeFailure::Corrupt)?;
    if out.len() > max_bytes {
        return Err(DecodeFailure::TooLarge);
    }
    Ok(out)
}
