//! Protocol upgrade (WebSocket) passthrough.
//!
//! # Responsibilities
//! - Detect upgrade requests
//! - Complete the 101 handshake with the client using the upstream's answer
//! - Relay raw bytes in both directions until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Gate ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - The relay starts only when the request asked for an upgrade and the
//!   upstream answered 101; anything else is an ordinary response
//! - Bytes, not frames: the gate never parses the upgraded protocol
//! - No idle timeout; the tunnel lives as long as both peers keep it

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use hyper::{body::Incoming, upgrade::OnUpgrade};
use hyper_util::rt::TokioIo;

use crate::net::connection::TunnelTracker;

/// The requested protocol when the request carries `Upgrade` and a
/// `Connection` header listing `upgrade`.
pub fn upgrade_protocol(headers: &HeaderMap) -> Option<HeaderValue> {
    let wants_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    if !wants_upgrade {
        return None;
    }
    headers.get(header::UPGRADE).cloned()
}

/// True for request paths that belong to WebSocket traffic.
pub fn is_websocket_path(path: &str) -> bool {
    path.contains("/ws")
}

/// Answer the client with the upstream's 101 and start the byte relay.
pub fn complete_upgrade(
    client_upgrade: OnUpgrade,
    mut upstream_response: axum::http::Response<Incoming>,
    tracker: &TunnelTracker,
    request_id: String,
) -> Response {
    debug_assert_eq!(upstream_response.status(), StatusCode::SWITCHING_PROTOCOLS);

    let upstream_upgrade = hyper::upgrade::on(&mut upstream_response);
    let guard = tracker.track();

    tokio::spawn(async move {
        let tunnel_id = guard.id();
        let (client, upstream) = match tokio::try_join!(client_upgrade, upstream_upgrade) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(request_id = %request_id, tunnel_id = %tunnel_id, error = %e, "Upgrade failed");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);
        match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
            Ok((from_client, from_upstream)) => {
                tracing::debug!(
                    request_id = %request_id,
                    tunnel_id = %tunnel_id,
                    from_client,
                    from_upstream,
                    "Tunnel finished"
                );
            }
            Err(e) => {
                tracing::debug!(request_id = %request_id, tunnel_id = %tunnel_id, error = %e, "Tunnel aborted");
            }
        }
        drop(guard);
    });

    // Handshake headers (Upgrade, Connection, Sec-WebSocket-*) go back as-is.
    let (parts, _) = upstream_response.into_parts();
    Response::from_parts(parts, Body::empty())
}
