// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{start_server, AppState, ClientRateLimiter, ServerConfig};
use crate::scrape::{Dispatcher, HttpFetcher, ScraperConfig};
use crate::version;

/// Fabstir Markdown scraper
#[derive(Parser, Debug)]
#[command(name = "fabstir-md-scraper")]
#[command(version)]
#[command(about = "Fetches web pages and serves their main content as Markdown", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Listen address (overrides HOST)
    #[arg(long, env = "HOST", global = true)]
    pub host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Convert a single page and print the Markdown
    Scrape {
        /// Page to convert
        url: String,
    },
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let scraper_config = ScraperConfig::from_env();
    scraper_config
        .validate()
        .map_err(|e| anyhow!("Invalid scraper configuration: {}", e))?;

    match cli.command {
        Some(Commands::Scrape { url }) => scrape_once(&scraper_config, &url).await,
        Some(Commands::Serve) | None => {
            let mut server_config = ServerConfig::from_env();
            if let Some(host) = cli.host {
                server_config.host = host;
            }
            if let Some(port) = cli.port {
                server_config.port = port;
            }
            server_config
                .validate()
                .map_err(|e| anyhow!("Invalid server configuration: {}", e))?;
            serve(&scraper_config, &server_config).await
        }
    }
}

fn build_dispatcher(config: &ScraperConfig) -> Result<Arc<Dispatcher>> {
    let fetcher = HttpFetcher::new(config.fetch.clone())?;
    Ok(Arc::new(Dispatcher::new(config, Arc::new(fetcher))))
}

async fn scrape_once(config: &ScraperConfig, url: &str) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;
    let result = dispatcher.handle_scrape(url).await;
    dispatcher.shutdown().await;

    let result = result?;
    println!("{}", result.markdown);
    info!("Converted {} in {:.1}ms", url, result.execution_time_ms);
    Ok(())
}

async fn serve(scraper_config: &ScraperConfig, server_config: &ServerConfig) -> Result<()> {
    println!("🚀 Starting {}", version::get_version_string());

    let dispatcher = build_dispatcher(scraper_config)?;
    let limiter = Arc::new(ClientRateLimiter::new(
        server_config.rate_limit_window(),
        server_config.rate_limit_max_requests,
    ));

    let background = CancellationToken::new();
    limiter.spawn_pruner(server_config.rate_limit_window(), background.clone());

    println!(
        "✅ Listening on http://{}:{} (workers {}-{}, cache TTL {}s)",
        server_config.host,
        server_config.port,
        scraper_config.pool.min_workers,
        scraper_config.pool.max_workers,
        scraper_config.cache.ttl_secs
    );
    println!("\nPress Ctrl+C to shutdown...");

    let state = AppState {
        dispatcher: Arc::clone(&dispatcher),
    };
    start_server(server_config, state, limiter, shutdown_signal()).await?;

    info!("Server stopped, draining worker pool");
    background.cancel();
    dispatcher.shutdown().await;
    println!("👋 Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
