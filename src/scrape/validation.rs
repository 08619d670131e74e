// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! URL checks applied before a request enters the pipeline

use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

use super::types::ScrapeError;

/// Parse `input` as an absolute http(s) URL with a host
pub fn parse_scrape_url(input: &str) -> Result<Url, ScrapeError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|_| ScrapeError::InvalidUrl(trimmed.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(ScrapeError::InvalidUrl(trimmed.to_string()));
    }

    Ok(url)
}

/// Check if URL is safe to fetch (not localhost/private IP)
pub fn is_safe_url(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            domain != "localhost" && !domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_public_ipv4(&ip),
        Some(Host::Ipv6(ip)) => match ip.to_ipv4_mapped() {
            Some(v4) => is_public_ipv4(&v4),
            None => is_public_ipv6(&ip),
        },
        None => false,
    }
}

fn is_public_ipv4(ip: &Ipv4Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast())
}

fn is_public_ipv6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}
