// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web page to Markdown pipeline
//!
//! ## Architecture
//!
//! ```text
//! URL → Dispatcher ─ hit ─→ ScrapeCache
//!           │ miss
//!           ↓
//!       WorkerPool → HttpFetcher → extractor → sanitizer → converter → assembler
//!                                                                        ↓
//!                                                                 ScrapeResult
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let config = ScraperConfig::from_env();
//! let fetcher = HttpFetcher::new(config.fetch.clone())?;
//! let dispatcher = Dispatcher::new(&config, Arc::new(fetcher));
//!
//! let result = dispatcher.handle_scrape("https://example.com").await?;
//! println!("{}", result.markdown);
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod pool;
pub mod sanitizer;
pub mod types;
pub mod validation;

pub use assembler::assemble;
pub use cache::{CacheStats, ScrapeCache};
pub use config::{CacheConfig, FetchConfig, PoolConfig, ScraperConfig};
pub use converter::to_markdown;
pub use dispatcher::Dispatcher;
pub use extractor::{extract_main, extract_page, ExtractedPage, PageMetadata};
pub use fetcher::{HttpFetcher, PageSource};
pub use pipeline::{render_page, Pipeline};
pub use pool::{PoolStats, WorkerPool};
pub use sanitizer::Sanitizer;
pub use types::{FetchError, FetchResult, ScrapeError, ScrapeResult};
pub use validation::{is_safe_url, parse_scrape_url};
