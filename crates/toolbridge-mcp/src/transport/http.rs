//! HTTP transport: one JSON-RPC message per POST to `/mcp`, plus `/health`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

use super::control::{RunControl, RunTokens};
use super::Transport;

/// Connection counters. Each HTTP exchange on `/mcp` counts as one
/// connection for as long as it is being served.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    live: AtomicUsize,
    total: AtomicU64,
}

impl ConnectionStats {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    fn open(self: &Arc<Self>) -> ConnectionGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard(self.clone())
    }
}

/// Decrements the live count on drop, including when a request is aborted.
struct ConnectionGuard(Arc<ConnectionStats>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ServerState {
    handler: Arc<ProtocolHandler>,
    token: Option<String>,
    stats: Arc<ConnectionStats>,
    /// Parent of every request context. Not cancelled by a graceful stop.
    requests: CancellationToken,
}

/// Network transport for web-based MCP clients.
pub struct HttpTransport {
    handler: Arc<ProtocolHandler>,
    addr: String,
    token: Option<String>,
    stats: Arc<ConnectionStats>,
    control: RunControl,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HttpTransport {
    pub fn new(handler: Arc<ProtocolHandler>, addr: impl Into<String>) -> Self {
        Self {
            handler,
            addr: addr.into(),
            token: None,
            stats: Arc::new(ConnectionStats::default()),
            control: RunControl::new(),
            local_addr: Mutex::new(None),
        }
    }

    /// Require `Authorization: Bearer <token>` on `/mcp`.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        self.stats.clone()
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Bound address while running. Useful when listening on port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }

    fn router(&self, requests: CancellationToken) -> Router {
        let state = Arc::new(ServerState {
            handler: self.handler.clone(),
            token: self.token.clone(),
            stats: self.stats.clone(),
            requests,
        });

        Router::new()
            .route("/mcp", post(handle_request))
            .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
            .layer(middleware::from_fn_with_state(state.clone(), count_layer))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(state)
    }

    async fn run(&self, run: RunTokens) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        let bound = listener.local_addr()?;
        if let Ok(mut slot) = self.local_addr.lock() {
            *slot = Some(bound);
        }

        tracing::info!("HTTP transport listening on {bound}");
        if self.token.is_some() {
            tracing::info!("Auth: bearer token required");
        }

        let app = self.router(run.force.clone());
        let stop = run.stop.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        tracing::info!(total = self.stats.total(), "HTTP transport stopped");
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(&self, ctx: CancellationToken) -> McpResult<()> {
        let Some(run) = self.control.begin(&ctx) else {
            return Err(McpError::AlreadyRunning(self.transport_type()));
        };

        let result = self.run(run).await;

        if let Ok(mut slot) = self.local_addr.lock() {
            *slot = None;
        }
        self.control.finish();
        result
    }

    async fn stop(&self, ctx: CancellationToken) -> McpResult<()> {
        self.control.stop(ctx).await
    }

    fn transport_type(&self) -> &'static str {
        "http"
    }
}

fn rpc_error(status: StatusCode, err: &McpError) -> Response {
    (status, AxumJson(err.to_json_rpc_error(RequestId::Null))).into_response()
}

/// Checks the bearer token if one is configured. `/health` is routed
/// outside this layer.
async fn auth_layer(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = &state.token {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected);

        if !authorized {
            return rpc_error(StatusCode::UNAUTHORIZED, &McpError::Unauthorized);
        }
    }

    next.run(request).await
}

async fn count_layer(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = state.stats.open();
    next.run(request).await
}

async fn handle_request(State(state): State<Arc<ServerState>>, body: String) -> Response {
    let msg: JsonRpcMessage = match serde_json::from_str(&body) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("Parse error: {e}");
            return rpc_error(StatusCode::BAD_REQUEST, &McpError::ParseError(e.to_string()));
        }
    };

    match state.handler.handle_message(msg, &state.requests).await {
        Some(response) => AxumJson(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// No auth required.
async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<Value> {
    AxumJson(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": {
            "live": state.stats.live(),
            "total": state.stats.total(),
        },
        "inFlight": state.handler.in_flight_count().await,
        "session": state.handler.session().await,
    }))
}
