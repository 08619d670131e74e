// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use fabstir_md_scraper::api::{create_router, AppState, ClientRateLimiter, RATE_LIMIT_MESSAGE};
use fabstir_md_scraper::scrape::{Dispatcher, HttpFetcher, ScraperConfig};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route(
            "/doc",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "<title>Doc</title><main><h2>Intro</h2><p>Hello <a href=\"/x\">x</a></p></main>",
                )
            }),
        )
        .route("/gone", get(|| async { StatusCode::NOT_FOUND.into_response() }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn app_with(block_private_hosts: bool, rate_limit: u32) -> Router {
    let mut config = ScraperConfig::default();
    config.fetch.block_private_hosts = block_private_hosts;
    let fetcher = HttpFetcher::new(config.fetch.clone()).unwrap();
    let dispatcher = Arc::new(Dispatcher::new(&config, Arc::new(fetcher)));
    let limiter = Arc::new(ClientRateLimiter::new(Duration::from_secs(900), rate_limit));
    create_router(AppState { dispatcher }, limiter)
}

fn app() -> Router {
    app_with(false, 1_000)
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/scrape")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_scrape_success() {
    let upstream = start_upstream().await;
    let response = app()
        .oneshot(post_json(json!({ "url": format!("http://{}/doc", upstream) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["markdown"], "# Doc\n\n## Intro\n\nHello [x](/x)");
    assert!(body["executionTimeMs"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_missing_url_rejected() {
    let response = app().oneshot(post_json(json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "URL is required" }));

    let response = app().oneshot(post_json(json!({ "url": "" }))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "URL is required" }));
}

#[tokio::test]
async fn test_missing_body_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/scrape")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "URL is required" }));
}

#[tokio::test]
async fn test_invalid_url_rejected() {
    for url in ["not a url", "ftp://example.com/file", "javascript:alert(1)"] {
        let response = app().oneshot(post_json(json!({ "url": url }))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", url);
        assert_eq!(json_body(response).await, json!({ "error": "Invalid URL format" }));
    }
}

#[tokio::test]
async fn test_private_url_rejected() {
    let response = app_with(true, 1_000)
        .oneshot(post_json(json!({ "url": "http://127.0.0.1:9/admin" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("127.0.0.1"));
}

#[tokio::test]
async fn test_upstream_failure_is_500() {
    let upstream = start_upstream().await;
    let response = app()
        .oneshot(post_json(json!({ "url": format!("http://{}/gone", upstream) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Failed to scrape URL: HTTP error! status: 404" })
    );
}

#[tokio::test]
async fn test_clear_cache_endpoint() {
    let upstream = start_upstream().await;
    let app = app();

    let response = app
        .clone()
        .oneshot(post_json(json!({ "url": format!("http://{}/doc", upstream) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let clear = || {
        Request::builder()
            .method("DELETE")
            .uri("/cache")
            .body(Body::empty())
            .unwrap()
    };
    let response = app.clone().oneshot(clear()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "cleared": 1 }));

    let response = app.oneshot(clear()).await.unwrap();
    assert_eq!(json_body(response).await, json!({ "cleared": 0 }));
}

#[tokio::test]
async fn test_index_and_health() {
    let app = app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/scrape"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"]["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["version"]["features"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "bounded-worker-pool"));
    assert_eq!(body["cache"]["max"], 1000);
    assert_eq!(body["pool"]["maxWorkers"], 4);
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let app = app_with(false, 2);
    let health = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    for _ in 0..2 {
        let response = app.clone().oneshot(health()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(health()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], RATE_LIMIT_MESSAGE.as_bytes());
}

#[tokio::test]
async fn test_cors_headers_present() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/scrape")
        .header(header::ORIGIN, "https://client.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
