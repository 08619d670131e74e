// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use fabstir_md_scraper::scrape::{Dispatcher, HttpFetcher, ScrapeError, ScraperConfig};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Hits {
    pages: Arc<AtomicUsize>,
    missing: Arc<AtomicUsize>,
}

async fn page(State(hits): State<Hits>) -> impl IntoResponse {
    hits.pages.fetch_add(1, Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<title>Counted</title><article><p>Served</p></article>",
    )
}

async fn missing(State(hits): State<Hits>) -> impl IntoResponse {
    hits.missing.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(400)).await;
    "<title>Slow</title><p>finally</p>"
}

async fn start_server(hits: Hits) -> SocketAddr {
    let app = Router::new()
        .route("/page", get(page))
        .route("/missing", get(missing))
        .route("/slow/:id", get(slow))
        .with_state(hits);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn local_config() -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.fetch.block_private_hosts = false;
    config.fetch.timeout_ms = 5_000;
    config
}

fn dispatcher(config: &ScraperConfig) -> Arc<Dispatcher> {
    let fetcher = HttpFetcher::new(config.fetch.clone()).unwrap();
    Arc::new(Dispatcher::new(config, Arc::new(fetcher)))
}

#[tokio::test]
async fn test_repeat_requests_served_from_cache() {
    let hits = Hits::default();
    let addr = start_server(hits.clone()).await;
    let dispatcher = dispatcher(&local_config());
    let url = format!("http://{}/page", addr);

    let first = dispatcher.handle_scrape(&url).await.unwrap();
    let second = dispatcher.handle_scrape(&url).await.unwrap();

    assert_eq!(first.markdown, "# Counted\n\nServed");
    assert_eq!(first, second);
    assert_eq!(hits.pages.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cache_expires_after_ttl() {
    let hits = Hits::default();
    let addr = start_server(hits.clone()).await;
    let mut config = local_config();
    config.cache.ttl_secs = 1;
    let dispatcher = dispatcher(&config);
    let url = format!("http://{}/page", addr);

    dispatcher.handle_scrape(&url).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    dispatcher.handle_scrape(&url).await.unwrap();

    assert_eq!(hits.pages.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_scrapes_not_cached() {
    let hits = Hits::default();
    let addr = start_server(hits.clone()).await;
    let dispatcher = dispatcher(&local_config());
    let url = format!("http://{}/missing", addr);

    for _ in 0..2 {
        let err = dispatcher.handle_scrape(&url).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 404");
    }
    assert_eq!(hits.missing.load(Ordering::SeqCst), 2);
    assert_eq!(dispatcher.cache_stats().total, 0);
}

#[tokio::test]
async fn test_saturated_pool_fails_fast() {
    let addr = start_server(Hits::default()).await;
    let mut config = local_config();
    config.pool.min_workers = 1;
    config.pool.max_workers = 1;
    config.pool.max_queue_size = 1;
    let dispatcher = dispatcher(&config);

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            let url = format!("http://{}/slow/{}", addr, i);
            tokio::spawn(async move { dispatcher.handle_scrape(&url).await })
        })
        .collect();

    let mut saturated = 0;
    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ScrapeError::PoolSaturated { queue_depth: 1 }) => saturated += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert!(saturated >= 2, "saturated = {}", saturated);
    assert!(succeeded >= 1, "succeeded = {}", succeeded);
    assert_eq!(saturated + succeeded, 4);
}

#[tokio::test]
async fn test_job_deadline_bounds_the_wait() {
    let addr = start_server(Hits::default()).await;
    let mut config = local_config();
    config.pool.job_timeout_ms = 100;
    let dispatcher = dispatcher(&config);

    let err = dispatcher
        .handle_scrape(&format!("http://{}/slow/1", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Timeout { timeout_ms: 100 }));
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_work() {
    let addr = start_server(Hits::default()).await;
    let mut config = local_config();
    config.pool.shutdown_grace_ms = 5_000;
    let dispatcher = dispatcher(&config);

    let in_flight = {
        let dispatcher = Arc::clone(&dispatcher);
        let url = format!("http://{}/slow/drain", addr);
        tokio::spawn(async move { dispatcher.handle_scrape(&url).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    dispatcher.shutdown().await;
    let result = in_flight.await.unwrap().unwrap();
    assert!(result.markdown.starts_with("# Slow"));
}
