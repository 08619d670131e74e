// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod config;
pub mod errors;
pub mod http_server;
pub mod rate_limit;
pub mod scrape;

pub use config::ServerConfig;
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_router, serve, start_server, AppState};
pub use rate_limit::{ClientRateLimiter, RATE_LIMIT_MESSAGE};
pub use scrape::{ScrapeApiRequest, ScrapeApiResponse};
