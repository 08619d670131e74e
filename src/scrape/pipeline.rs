// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fetch → extract → sanitize → convert → assemble

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

use super::assembler::assemble;
use super::converter::to_markdown;
use super::extractor::extract_page;
use super::fetcher::PageSource;
use super::sanitizer::Sanitizer;
use super::types::{ScrapeError, ScrapeResult};

/// Render a full HTML document to the final Markdown text
///
/// Pure and deterministic: the same input always yields the same output.
pub fn render_page(html: &str, sanitizer: &Sanitizer) -> String {
    let page = extract_page(html);
    let clean = sanitizer.sanitize(&page.fragment);
    let body = to_markdown(&clean);
    let meta = page.metadata;
    assemble(&meta.title, &meta.description, &meta.h1, &body)
}

/// One complete scrape run, shared by every worker
pub struct Pipeline {
    source: Arc<dyn PageSource>,
    sanitizer: Arc<Sanitizer>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            sanitizer: Arc::new(Sanitizer::new()),
        }
    }

    /// Fetch `url` and convert it to Markdown
    ///
    /// The parse and conversion stages run on the blocking thread pool so
    /// a large document never stalls the async workers.
    pub async fn run(&self, url: &Url) -> Result<ScrapeResult, ScrapeError> {
        let start = Instant::now();

        let fetched = self.source.fetch(url).await?;
        debug!(
            "Fetched {} ({} bytes, status {}, encoding {:?})",
            url,
            fetched.body.len(),
            fetched.status_code,
            fetched.content_encoding
        );

        let html = fetched.text();
        let sanitizer = Arc::clone(&self.sanitizer);
        let markdown = tokio::task::spawn_blocking(move || render_page(&html, &sanitizer))
            .await
            .map_err(|e| ScrapeError::Worker(format!("Render task failed: {}", e)))?;

        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Scraped {} in {:.1}ms ({} chars of markdown)",
            url,
            execution_time_ms,
            markdown.len()
        );

        Ok(ScrapeResult {
            markdown,
            execution_time_ms,
        })
    }
}
