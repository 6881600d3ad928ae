//! Inbound request preparation.
//!
//! # Responsibilities
//! - Drop hop-by-hop headers before forwarding (both directions)
//! - Drop headers the transport recomputes (host, content-length)
//! - Append the caller's address to `X-Forwarded-For`
//!
//! # Design Decisions
//! - Names listed in the `Connection` header are hop-by-hop as well
//! - End-to-end headers (including `X-Request-ID`) pass through untouched

use std::net::IpAddr;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Headers meaningful only for a single transport-level connection.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Copy `headers` without hop-by-hop headers and without `content-length`.
pub fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(&name.as_str()) || listed.contains(name) || *name == header::CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers sent upstream for an inbound request from `client`.
pub fn forward_headers(headers: &HeaderMap, client: Option<IpAddr>) -> HeaderMap {
    let mut out = end_to_end(headers);
    out.remove(header::HOST);

    if let Some(ip) = client {
        let forwarded = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) if !prior.is_empty() => format!("{}, {}", prior, ip),
            _ => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            out.insert(X_FORWARDED_FOR, value);
        }
    }
    out
}
