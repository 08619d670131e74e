// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-client rate limiting for the HTTP surface

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Message returned when a client exceeds its request quota
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Rate limiter keyed by client IP
///
/// Each client may burst up to `max_requests` and then regains one request
/// every `window / max_requests`.
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    window: Duration,
    max_requests: u32,
}

impl ClientRateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `window` - Length of the rate-limit window
    /// * `max_requests` - Requests allowed per client within one window
    pub fn new(window: Duration, max_requests: u32) -> Self {
        let max = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let period = (window / max.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_minute(max))
            .allow_burst(max);

        Self {
            limiter: RateLimiter::keyed(quota),
            window,
            max_requests: max.get(),
        }
    }

    /// Check if a request from `ip` is allowed
    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Forget clients whose quota has fully replenished
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Periodically drop idle client state, stopped by `shutdown`
    pub fn spawn_pruner(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        limiter.retain_recent();
                        debug!("Rate limiter tracking {} clients", limiter.tracked_clients());
                    }
                }
            }
        })
    }
}

/// Reject requests over the per-IP quota with 429
///
/// Requests served without connection info share one bucket.
pub async fn rate_limit(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !limiter.check(ip) {
        warn!("Rate limit exceeded for {}", ip);
        return (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response();
    }
    next.run(request).await
}
