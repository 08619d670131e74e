// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{http::header, response::IntoResponse, routing::get, Router};
use fabstir_md_scraper::scrape::{
    render_page, FetchConfig, HttpFetcher, Pipeline, Sanitizer,
};
use flate2::{write::GzEncoder, Compression};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

const ARTICLE: &str = r#"<html><head><title>T</title><meta name="description" content="D"></head><body><article><h1>H</h1><p>Body</p></article></body></html>"#;

const BLOG_POST: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Release notes</title>
    <meta name="description" content="What changed this week">
    <script>window.analytics = {};</script>
</head>
<body>
    <nav><a href="/">Home</a> | <a href="/blog">Blog</a></nav>
    <div class="content">
        <h2>Highlights</h2>
        <p>The <strong>new</strong> parser is <em>much</em> faster. See <a href="https://example.com/docs" onclick="track()">the docs</a>.</p>
        <ul>
            <li>Smaller binaries</li>
            <li>Fewer allocations</li>
        </ul>
        <blockquote><p>It just works.</p></blockquote>
        <pre><code class="language-rust">fn main() {
    println!("hi");
}</code></pre>
        <img src="/chart.png" alt="Benchmark chart" style="width:100%">
        <table>
            <thead><tr><th>Build</th><th>Time</th></tr></thead>
            <tbody><tr><td>old</td><td>12s</td></tr><tr><td>new</td><td>7s</td></tr></tbody>
        </table>
        <iframe src="https://ads.example.com"></iframe>
    </div>
    <footer>Copyright</footer>
</body>
</html>"#;

async fn gzipped_article() -> impl IntoResponse {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(ARTICLE.as_bytes()).unwrap();
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        encoder.finish().unwrap(),
    )
}

async fn start_server() -> SocketAddr {
    let app = Router::new()
        .route("/article", get(gzipped_article))
        .route("/blog", get(|| async { ([(header::CONTENT_TYPE, "text/html")], BLOG_POST) }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn pipeline() -> Pipeline {
    let config = FetchConfig {
        timeout_ms: 2_000,
        block_private_hosts: false,
        ..FetchConfig::default()
    };
    Pipeline::new(Arc::new(HttpFetcher::new(config).unwrap()))
}

#[tokio::test]
async fn test_end_to_end_article() {
    let addr = start_server().await;
    let url = Url::parse(&format!("http://{}/article", addr)).unwrap();

    let result = pipeline().run(&url).await.unwrap();
    assert!(result.markdown.starts_with("# T\n\n*D*\n\n## H\n\n"));
    assert!(result.markdown.ends_with("Body"));
    assert!(result.execution_time_ms > 0.0);
}

#[tokio::test]
async fn test_end_to_end_blog_post() {
    let addr = start_server().await;
    let url = Url::parse(&format!("http://{}/blog", addr)).unwrap();

    let markdown = pipeline().run(&url).await.unwrap().markdown;

    assert!(markdown.starts_with("# Release notes\n\n*What changed this week*\n\n## Highlights"));
    assert!(markdown.contains("The **new** parser is _much_ faster. See [the docs](https://example.com/docs)."));
    assert!(markdown.contains("- Smaller binaries\n- Fewer allocations"));
    assert!(markdown.contains("> It just works."));
    assert!(markdown.contains("```rust\nfn main() {\n    println!(\"hi\");\n}\n```"));
    assert!(markdown.contains("![Benchmark chart](/chart.png)"));
    assert!(markdown.contains("| Build | Time |\n| --- | --- |\n| old | 12s |\n| new | 7s |"));

    assert!(!markdown.contains("Home"));
    assert!(!markdown.contains("Copyright"));
    assert!(!markdown.contains("analytics"));
    assert!(!markdown.contains("track"));
    assert!(!markdown.contains("ads.example.com"));
    assert!(!markdown.contains("\n\n\n"));
}

#[test]
fn test_render_is_deterministic() {
    let sanitizer = Sanitizer::new();
    let first = render_page(BLOG_POST, &sanitizer);
    let second = render_page(BLOG_POST, &sanitizer);
    assert_eq!(first, second);
}

#[test]
fn test_malformed_markup_still_renders() {
    let html = "<html><title>Broken</title><body><main><p>Open <b>bold <i>both</main><p>after";
    let markdown = render_page(html, &Sanitizer::new());
    assert!(markdown.starts_with("# Broken"));
    assert!(markdown.contains("Open"));
}
