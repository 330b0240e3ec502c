//! HTTP server setup and the request handler.
//!
//! # Responsibilities
//! - Create the axum Router with the catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Bind the plain or TLS listener
//! - Enforce the body limit, forward, translate failures
//! - Drain upgraded tunnels on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, request::Parts, HeaderValue, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use hyper::upgrade::OnUpgrade;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{AccessLogConfig, GateConfig};
use crate::error::GateError;
use crate::http::request::{build_proxied, request_id, ForwardContext};
use crate::http::response::{translate, FallbackTable, Translated};
use crate::http::upstream::Upstream;
use crate::http::websocket::{complete_upgrade, upgrade_protocol};
use crate::lifecycle::ShutdownSignal;
use crate::net::{connection::TunnelTracker, tls::load_tls_config};
use crate::observability::{
    access_log::{self, AccessRecord, Outcome},
    metrics,
};
use crate::security::limits::{BodyError, BodyLimit};

/// Read-only state shared by every handler invocation.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Upstream,
    pub fallback: Arc<FallbackTable>,
    pub limits: Arc<BodyLimit>,
    pub server_name: Arc<str>,
    pub scheme: &'static str,
    pub access_log: AccessLogConfig,
    pub tunnels: TunnelTracker,
}

/// HTTP server for the gate.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    tunnels: TunnelTracker,
}

impl HttpServer {
    /// Build the server. Reads the fallback page, if any, once here.
    pub fn new(config: GateConfig) -> Result<Self, GateError> {
        let upstream = Upstream::from_config(&config.upstream)?;
        let fallback = FallbackTable::from_policy(&config.fallback)?;
        let tunnels = TunnelTracker::new();

        let state = AppState {
            upstream,
            fallback: Arc::new(fallback),
            limits: Arc::new(BodyLimit::from_config(&config.limits)),
            server_name: Arc::from(config.listener.server_name.as_str()),
            scheme: if config.listener.tls.is_some() { "https" } else { "http" },
            access_log: config.access_log.clone(),
            tunnels: tunnels.clone(),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            tunnels,
        })
    }

    /// Build the axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Bind the configured listener (plain or TLS) and serve until shutdown.
    pub async fn serve(self, shutdown: ShutdownSignal) -> Result<(), GateError> {
        match self.config.listener.tls.clone() {
            Some(tls) => {
                let addr: SocketAddr = self
                    .config
                    .listener
                    .bind_address
                    .parse()
                    .map_err(|_| GateError::BindAddress(self.config.listener.bind_address.clone()))?;
                let rustls = load_tls_config(&tls).await?;
                self.run_tls(addr, rustls, shutdown).await
            }
            None => {
                let listener = TcpListener::bind(&self.config.listener.bind_address).await?;
                self.run(listener, shutdown).await
            }
        }
    }

    /// Serve plain HTTP on an already bound listener.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), GateError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        let app = self
            .router
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.recv())
            .await?;

        self.drain().await;
        Ok(())
    }

    /// Serve HTTPS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        rustls: axum_server::tls_rustls::RustlsConfig,
        shutdown: ShutdownSignal,
    ) -> Result<(), GateError> {
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let stopper = handle.clone();
        tokio::spawn(async move {
            shutdown.recv().await;
            stopper.graceful_shutdown(None);
        });

        let app = self
            .router
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app)
            .await?;

        self.drain().await;
        Ok(())
    }

    async fn drain(&self) {
        let open = self.tunnels.active_count();
        if open > 0 {
            tracing::info!(tunnels = open, "Waiting for open tunnels to close");
            let deadline = Duration::from_secs(self.config.lifecycle.drain_secs);
            if !self.tunnels.drain(deadline).await {
                tracing::warn!(
                    tunnels = self.tunnels.active_count(),
                    "Drain deadline passed, dropping open tunnels"
                );
            }
        }
        tracing::info!("HTTP server stopped");
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Tracker of upgraded connections served by this server.
    pub fn tunnels(&self) -> TunnelTracker {
        self.tunnels.clone()
    }
}

/// Catch-all handler: size gate, forward, translate.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let started = Instant::now();
    let received_at = chrono::Utc::now();

    let upgrade = upgrade_protocol(request.headers());
    let client_upgrade = upgrade.as_ref().map(|_| hyper::upgrade::on(&mut request));

    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        upgrade = upgrade.is_some(),
        "Proxying request"
    );

    let (response, outcome, error) =
        forward(&state, &parts, body, upgrade, client_upgrade, peer, &request_id).await;

    let status = response.status().as_u16();
    metrics::record_request(outcome.as_str(), status, started);
    access_log::emit(
        &state.access_log,
        &AccessRecord {
            request_id: &request_id,
            client_ip: peer.ip(),
            user_agent: parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown"),
            method: parts.method.as_str(),
            path: parts.uri.path(),
            status,
            outcome,
            error,
            received_at,
            started,
        },
    );

    response
}

async fn forward(
    state: &AppState,
    parts: &Parts,
    body: Body,
    upgrade: Option<HeaderValue>,
    client_upgrade: Option<OnUpgrade>,
    peer: SocketAddr,
    request_id: &str,
) -> (Response, Outcome, Option<&'static str>) {
    // 1. Size gate. Terminal; the upstream is never contacted.
    let body = match state.limits.read(&parts.headers, body).await {
        Ok(bytes) => bytes,
        Err(BodyError::TooLarge { limit }) => {
            tracing::warn!(request_id = %request_id, limit, "Request body over limit");
            return (state.limits.reject(), Outcome::Oversize, Some("body_too_large"));
        }
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Request body unreadable");
            return (bare(StatusCode::BAD_REQUEST), Outcome::BadRequest, Some("body_read"));
        }
    };

    // 2. Build the outbound request.
    let ctx = ForwardContext {
        client: peer.ip(),
        scheme: state.scheme,
        server_name: &state.server_name,
        upstream: state.upstream.authority(),
    };
    let upstream_request = match build_proxied(parts, body, upgrade, &ctx) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Cannot build upstream request");
            return (request_build_failure(), Outcome::Unavailable, Some("request_build"));
        }
    };

    // 3. Forward, then translate.
    let response = match state.upstream.send(upstream_request).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                upstream = %state.upstream.authority(),
                error = %e,
                "Upstream unavailable"
            );
            return (
                state.fallback.unavailable(e.trigger_status()),
                Outcome::Unavailable,
                Some(e.kind()),
            );
        }
    };

    if response.status() == StatusCode::SWITCHING_PROTOCOLS {
        if let Some(client_upgrade) = client_upgrade {
            let answer = complete_upgrade(client_upgrade, response, &state.tunnels, request_id.to_string());
            return (answer, Outcome::Upgraded, None);
        }
    }

    let upstream_status = response.status();
    match translate(&state.fallback, response) {
        Translated::Fallback(answer) => {
            tracing::warn!(
                request_id = %request_id,
                upstream_status = upstream_status.as_u16(),
                status = answer.status().as_u16(),
                "Upstream error replaced by fallback"
            );
            (answer, Outcome::Fallback, Some("upstream_status"))
        }
        Translated::Relayed(answer) => (answer, Outcome::Relayed, None),
    }
}

fn bare(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// Internal failure before the upstream is contacted. Never routed
/// through the fallback table.
fn request_build_failure() -> Response {
    bare(StatusCode::BAD_GATEWAY)
}
