//! Request handling and transformation.
//!
//! # Responsibilities
//! - Read the request ID assigned by the request-id layer
//! - Resolve the original host
//! - Build the request forwarded to the upstream
//!
//! # Design Decisions
//! - Method, path, query, body and end-to-end headers pass through untouched
//! - Outbound requests are always HTTP/1.1
//! - Upgrade headers are restored only for upgrade handshakes

use std::net::IpAddr;

use axum::{
    body::{Body, Bytes},
    http::{
        header, request::Parts, uri::Authority, HeaderMap, HeaderName, HeaderValue, Request, Uri,
        Version,
    },
};

use crate::security::headers::{apply_forwarding, strip_hop_by_hop};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID set by the request-id layer, or "unknown".
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Per-hop facts the forwarded request is stamped with.
#[derive(Debug, Clone)]
pub struct ForwardContext<'a> {
    pub client: IpAddr,
    pub scheme: &'static str,
    pub server_name: &'a str,
    pub upstream: &'a Authority,
}

/// Host as the client addressed it: the `Host` header, else the URI
/// authority (HTTP/2), else the configured server name.
pub fn original_host(parts: &Parts, server_name: &str) -> HeaderValue {
    if let Some(host) = parts.headers.get(header::HOST) {
        return host.clone();
    }
    parts
        .uri
        .authority()
        .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
        .or_else(|| HeaderValue::from_str(server_name).ok())
        .unwrap_or_else(|| HeaderValue::from_static("localhost"))
}

/// `http://<upstream><original path and query>`.
pub fn upstream_uri(upstream: &Authority, uri: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Uri::builder()
        .scheme("http")
        .authority(upstream.clone())
        .path_and_query(path_and_query)
        .build()
}

/// Build the request sent upstream from the inbound head and buffered body.
pub fn build_proxied(
    parts: &Parts,
    body: Bytes,
    upgrade: Option<HeaderValue>,
    ctx: &ForwardContext<'_>,
) -> Result<Request<Body>, axum::http::Error> {
    let host = original_host(parts, ctx.server_name);
    let uri = upstream_uri(ctx.upstream, &parts.uri)?;

    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);
    headers.insert(header::HOST, host);
    apply_forwarding(&mut headers, ctx.client, ctx.scheme);
    if let Some(protocol) = upgrade {
        headers.insert(header::UPGRADE, protocol);
        headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    }

    let mut request = Request::builder()
        .method(parts.method.clone())
        .version(Version::HTTP_11)
        .uri(uri)
        .body(Body::from(body))?;
    *request.headers_mut() = headers;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::headers::{X_FORWARDED_FOR, X_FORWARDED_PROTO, X_REAL_IP};
    use std::str::FromStr;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn rewrites_uri_and_keeps_path() {
        let upstream = Authority::from_str("backend:8000").unwrap();
        let uri: Uri = "/api/v1/items?page=2".parse().unwrap();
        assert_eq!(
            upstream_uri(&upstream, &uri).unwrap().to_string(),
            "http://backend:8000/api/v1/items?page=2"
        );

        let absolute: Uri = "https://example.com".parse().unwrap();
        assert_eq!(
            upstream_uri(&upstream, &absolute).unwrap().to_string(),
            "http://backend:8000/"
        );
    }

    #[test]
    fn host_resolution_order() {
        let with_header = parts(Request::builder().uri("/").header("host", "shop.example"));
        assert_eq!(original_host(&with_header, "fallback"), "shop.example");

        let h2 = parts(Request::builder().uri("https://h2.example/x"));
        assert_eq!(original_host(&h2, "fallback"), "h2.example");

        let bare = parts(Request::builder().uri("/"));
        assert_eq!(original_host(&bare, "fallback"), "fallback");
    }

    #[test]
    fn proxied_request_carries_forwarding_headers() {
        let upstream = Authority::from_str("127.0.0.1:9000").unwrap();
        let ctx = ForwardContext {
            client: "203.0.113.9".parse().unwrap(),
            scheme: "http",
            server_name: "localhost",
            upstream: &upstream,
        };
        let inbound = parts(
            Request::builder()
                .method("POST")
                .uri("/upload?x=1")
                .version(Version::HTTP_2)
                .header("host", "app.example")
                .header("x-forwarded-for", "198.51.100.1")
                .header("authorization", "Bearer t")
                .header("connection", "keep-alive"),
        );

        let request = build_proxied(&inbound, Bytes::from_static(b"payload"), None, &ctx).unwrap();

        assert_eq!(request.method(), "POST");
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.uri().to_string(), "http://127.0.0.1:9000/upload?x=1");
        let headers = request.headers();
        assert_eq!(headers[header::HOST], "app.example");
        assert_eq!(headers[&X_REAL_IP], "203.0.113.9");
        assert_eq!(headers[&X_FORWARDED_FOR], "198.51.100.1, 203.0.113.9");
        assert_eq!(headers[&X_FORWARDED_PROTO], "http");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer t");
        assert!(headers.get(header::CONNECTION).is_none());
    }

    #[test]
    fn upgrade_headers_are_restored() {
        let upstream = Authority::from_str("127.0.0.1:9000").unwrap();
        let ctx = ForwardContext {
            client: "127.0.0.1".parse().unwrap(),
            scheme: "https",
            server_name: "localhost",
            upstream: &upstream,
        };
        let inbound = parts(
            Request::builder()
                .uri("/ws")
                .header("upgrade", "websocket")
                .header("connection", "Upgrade"),
        );

        let request = build_proxied(
            &inbound,
            Bytes::new(),
            Some(HeaderValue::from_static("websocket")),
            &ctx,
        )
        .unwrap();
        assert_eq!(request.headers()[header::UPGRADE], "websocket");
        assert_eq!(request.headers()[header::CONNECTION], "upgrade");
        assert_eq!(request.headers()[&X_FORWARDED_PROTO], "https");
    }

    #[test]
    fn request_id_fallback() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));
        assert_eq!(request_id(&headers), "abc");
    }
}
