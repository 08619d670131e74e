// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use fabstir_md_scraper::scrape::{FetchConfig, FetchError, HttpFetcher, PageSource};
use flate2::{write::GzEncoder, Compression};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

const PAGE: &str = "<html><head><title>Plain</title></head><body><p>Hello</p></body></html>";

#[derive(Clone, Default)]
struct Hits {
    errors: Arc<AtomicUsize>,
}

async fn plain() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], PAGE)
}

async fn gzipped() -> impl IntoResponse {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(PAGE.as_bytes()).unwrap();
    (
        [
            (header::CONTENT_TYPE, "text/html"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        encoder.finish().unwrap(),
    )
}

async fn server_error(State(hits): State<Hits>) -> impl IntoResponse {
    hits.errors.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn start_server(hits: Hits) -> SocketAddr {
    let app = Router::new()
        .route("/plain", get(plain))
        .route("/gzip", get(gzipped))
        .route("/error", get(server_error))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/redirect", get(|| async { Redirect::temporary("/plain") }))
        .route("/loop", get(|| async { Redirect::temporary("/loop") }))
        .with_state(hits);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn local_config() -> FetchConfig {
    FetchConfig {
        timeout_ms: 2_000,
        retry_backoff_ms: 10,
        block_private_hosts: false,
        ..FetchConfig::default()
    }
}

fn url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{}{}", addr, path)).unwrap()
}

#[tokio::test]
async fn test_fetch_plain_page() {
    let addr = start_server(Hits::default()).await;
    let fetcher = HttpFetcher::new(local_config()).unwrap();

    let result = fetcher.fetch(&url(addr, "/plain")).await.unwrap();
    assert_eq!(result.status_code, 200);
    assert_eq!(result.content_encoding, None);
    assert_eq!(result.text(), PAGE);
}

#[tokio::test]
async fn test_fetch_decodes_gzip() {
    let addr = start_server(Hits::default()).await;
    let fetcher = HttpFetcher::new(local_config()).unwrap();

    let result = fetcher.fetch(&url(addr, "/gzip")).await.unwrap();
    assert_eq!(result.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(result.text(), PAGE);
}

#[tokio::test]
async fn test_http_errors_are_not_retried() {
    let hits = Hits::default();
    let addr = start_server(hits.clone()).await;
    let fetcher = HttpFetcher::new(local_config()).unwrap();

    let err = fetcher.fetch(&url(addr, "/error")).await.unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus { status: 500, .. }));
    assert_eq!(hits.errors.load(Ordering::SeqCst), 1);

    let err = fetcher.fetch(&url(addr, "/missing")).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP error! status: 404");
}

#[tokio::test]
async fn test_redirects_followed() {
    let addr = start_server(Hits::default()).await;
    let fetcher = HttpFetcher::new(local_config()).unwrap();

    let result = fetcher.fetch(&url(addr, "/redirect")).await.unwrap();
    assert_eq!(result.text(), PAGE);
}

#[tokio::test]
async fn test_redirect_loop_refused() {
    let addr = start_server(Hits::default()).await;
    let fetcher = HttpFetcher::new(local_config()).unwrap();

    let err = fetcher.fetch(&url(addr, "/loop")).await.unwrap_err();
    assert!(matches!(err, FetchError::Redirect(_)), "{:?}", err);
}

#[tokio::test]
async fn test_redirect_to_private_host_refused() {
    let addr = start_server(Hits::default()).await;
    let config = FetchConfig {
        block_private_hosts: true,
        ..local_config()
    };
    let fetcher = HttpFetcher::new(config).unwrap();

    let err = fetcher.fetch(&url(addr, "/redirect")).await.unwrap_err();
    assert!(matches!(err, FetchError::Redirect(_)), "{:?}", err);
}
