// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

use crate::scrape::ScrapeError;

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Request body missing or unreadable
    InvalidRequest(String),
    /// Failure raised by the scrape pipeline
    Scrape(ScrapeError),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) => 400,
            ApiError::Scrape(e) => match e {
                ScrapeError::InvalidUrl(_) | ScrapeError::UnsafeUrl(_) => 400,
                ScrapeError::PoolSaturated { .. } => 503,
                ScrapeError::Timeout { .. } => 504,
                _ => 500,
            },
        }
    }

    /// Client-facing message; internal detail stays in the logs
    pub fn message(&self) -> String {
        match self {
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::Scrape(ScrapeError::InvalidUrl(_)) => "Invalid URL format".to_string(),
            ApiError::Scrape(e @ ScrapeError::UnsafeUrl(_))
            | ApiError::Scrape(e @ ScrapeError::PoolSaturated { .. })
            | ApiError::Scrape(e @ ScrapeError::Timeout { .. }) => e.to_string(),
            ApiError::Scrape(e) => format!("Failed to scrape URL: {}", e),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.message(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::Scrape(e) => write!(f, "Scrape failed: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        ApiError::Scrape(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("{}", self);
        }

        (status, Json(self.to_response())).into_response()
    }
}
