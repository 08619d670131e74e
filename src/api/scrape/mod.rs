// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape API endpoint
//!
//! Provides the `/scrape` HTTP endpoint and the cache administration hook.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{clear_cache_handler, scrape_handler};
pub use request::ScrapeApiRequest;
pub use response::ScrapeApiResponse;
