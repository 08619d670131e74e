// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    middleware,
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::config::ServerConfig;
use super::rate_limit::{rate_limit, ClientRateLimiter};
use super::scrape::{clear_cache_handler, scrape_handler};
use crate::scrape::Dispatcher;
use crate::version::get_version_info;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the router with every route and middleware layer
pub fn create_router(state: AppState, limiter: Arc<ClientRateLimiter>) -> Router {
    Router::new()
        // Landing page
        .route("/", get(index_handler))
        // Health check
        .route("/health", get(health_handler))
        // Scrape endpoint
        .route("/scrape", post(scrape_handler))
        // Cache administration
        .route("/cache", delete(clear_cache_handler))
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind `HOST:PORT` and serve until `shutdown` resolves
pub async fn start_server<F>(
    config: &ServerConfig,
    state: AppState,
    limiter: Arc<ClientRateLimiter>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    serve(listener, create_router(state, limiter), shutdown).await
}

/// Serve `app` on an already bound listener
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Scraper API listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": get_version_info(),
        "cache": state.dispatcher.cache_stats(),
        "pool": state.dispatcher.pool_stats(),
    }))
}
