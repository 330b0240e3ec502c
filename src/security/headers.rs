//! Forwarding and hop-by-hop header handling.
//!
//! # Responsibilities
//! - Add X-Real-IP, X-Forwarded-For, X-Forwarded-Proto
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - X-Forwarded-For is appended to, never replaced
//! - X-Real-IP and X-Forwarded-Proto always reflect this hop
//! - Headers named by `Connection` are hop-by-hop too

use std::net::IpAddr;

use axum::http::{header, header::InvalidHeaderValue, HeaderMap, HeaderName, HeaderValue};

pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Remove connection-scoped headers. `Upgrade` goes as well; the caller
/// restores it for upgrade handshakes.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(header::UPGRADE);
}

/// Value for X-Forwarded-For: prior hops followed by the client address.
/// Prior values are kept byte for byte, valid UTF-8 or not.
pub fn forwarded_for(
    headers: &HeaderMap,
    client: IpAddr,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value: Vec<u8> = Vec::new();
    for prior in headers.get_all(&X_FORWARDED_FOR) {
        let prior = prior.as_bytes().trim_ascii();
        if prior.is_empty() {
            continue;
        }
        value.extend_from_slice(prior);
        value.extend_from_slice(b", ");
    }
    value.extend_from_slice(client.to_string().as_bytes());
    HeaderValue::from_bytes(&value)
}

/// Inject the forwarding headers for this hop.
pub fn apply_forwarding(headers: &mut HeaderMap, client: IpAddr, scheme: &'static str) {
    let xff = forwarded_for(headers, client);
    headers.remove(&X_FORWARDED_FOR);
    if let Ok(v) = xff {
        headers.insert(X_FORWARDED_FOR, v);
    }
    if let Ok(v) = HeaderValue::from_str(&client.to_string()) {
        headers.insert(X_REAL_IP, v);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(scheme));
}
