// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scrape API endpoint handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{debug, info, warn};

use super::request::ScrapeApiRequest;
use super::response::{ClearCacheResponse, ScrapeApiResponse};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /scrape - Convert a web page to Markdown
///
/// # Request
/// - `url`: Absolute http(s) URL of the page (required)
///
/// # Response
/// - `markdown`: Assembled Markdown document
/// - `executionTimeMs`: Time taken to produce it
///
/// # Errors
/// - 400 Bad Request: Missing, malformed or private URL
/// - 429 Too Many Requests: Rate limited
/// - 503 Service Unavailable: Scrape queue is full
/// - 504 Gateway Timeout: Scrape exceeded the job deadline
/// - 500 Internal Server Error: Fetch or conversion failed
pub async fn scrape_handler(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeApiRequest>, JsonRejection>,
) -> Result<Json<ScrapeApiResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::InvalidRequest("URL is required".to_string())
        }
        other => {
            warn!("Rejected scrape body: {}", other.body_text());
            ApiError::InvalidRequest(format!("Invalid request body: {}", other.body_text()))
        }
    })?;

    let url = request.validate().map_err(|e| {
        debug!("Scrape validation failed: {}", e);
        ApiError::InvalidRequest(e)
    })?;

    let result = state.dispatcher.handle_scrape(url).await?;

    info!(
        "Scrape complete for {} ({} chars in {:.1}ms)",
        url,
        result.markdown.len(),
        result.execution_time_ms
    );

    Ok(Json(ScrapeApiResponse::from(result)))
}

/// DELETE /cache - Drop every cached scrape result
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let cleared = state.dispatcher.clear_cache();
    Json(ClearCacheResponse { cleared })
}
