//! HTTP server: SSE sessions, health, and a plain-JSON tool pass-through.
//!
//! The baton SSE routes are mounted twice, under `/mcp` and at the root, so
//! both `GET /mcp/sse` and `GET /sse` open a session.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use baton::{BearerToken, McpState, SessionRegistry, SseBinding};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::tools::ToolDispatcher;
use seineconf::HttpConfig;

const BODY_LIMIT: usize = 1024 * 1024;

/// Tools reachable through `/mcp/tool/{name}` and `/mcp/call`.
const PASS_THROUGH_TOOLS: [&str; 4] = ["search_web", "scrape_url", "crawl4ai_scrape", "search_and_scrape"];

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ToolDispatcher>,
}

/// Build the full HTTP application.
pub fn app(
    dispatcher: Arc<ToolDispatcher>,
    sessions: Arc<SessionRegistry<SseBinding>>,
    config: &HttpConfig,
) -> Router {
    let mcp_state = Arc::new(
        McpState::new(Arc::clone(&dispatcher), sessions)
            .with_message_endpoint(config.sse_message_path.clone()),
    );
    let sse = baton::router(mcp_state);

    let state = AppState { dispatcher };
    let pass_through = Router::new()
        .route("/tool/{name}", post(handle_tool))
        .route("/call", post(handle_call))
        .with_state(state.clone());
    let health = Router::new()
        .route("/health", get(handle_health))
        .with_state(state);

    let app = Router::new()
        .nest("/mcp", sse.clone().merge(pass_through))
        .merge(sse)
        .merge(health);

    let token = config.auth_token.as_deref().map(BearerToken::new);
    baton::with_bearer_auth(app, token)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves, then close every session and drain.
pub async fn run<F>(config: &HttpConfig, dispatcher: Arc<ToolDispatcher>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sessions: Arc<SessionRegistry<SseBinding>> = Arc::new(SessionRegistry::new());
    let app = app(dispatcher, Arc::clone(&sessions), config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🕸️  seine HTTP ready");
    info!("   MCP (SSE): GET http://{}/mcp/sse + POST http://{}{}", addr, addr, config.sse_message_path);
    info!("   Tools: POST http://{}/mcp/tool/{{name}}", addr);
    info!("   Health: GET http://{}/health", addr);
    if config.auth_token.is_some() {
        info!("   Auth: bearer token required");
    }

    // Open SSE streams never end on their own, so sessions close first.
    let closing = Arc::clone(&sessions);
    let shutdown = async move {
        shutdown.await;
        let stats = closing.stats();
        info!(sessions = stats.total, "closing sessions");
        closing.close_all();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let terminate = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "SIGINT handler failed");
            }
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    let (searxng, crawl4ai) = state.dispatcher.backends().health().await;
    Json(json!({ "ok": true, "searxng": searxng, "crawl4ai": crawl4ai }))
}

/// Body of a pass-through call; arguments may arrive under any of three keys.
#[derive(Debug, Default, Deserialize)]
struct CallBody {
    name: Option<String>,
    arguments: Option<Value>,
    args: Option<Value>,
    params: Option<Value>,
}

impl CallBody {
    fn parse(body: &Bytes) -> Result<Self, Response> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| failure(StatusCode::BAD_REQUEST, format!("invalid JSON body: {}", e)))
    }

    fn into_arguments(self) -> Value {
        self.arguments
            .or(self.args)
            .or(self.params)
            .unwrap_or_else(|| json!({}))
    }
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(json!({ "ok": false, "error": error.into() }))).into_response()
}

async fn handle_tool(State(state): State<AppState>, Path(name): Path<String>, body: Bytes) -> Response {
    match CallBody::parse(&body) {
        Ok(body) => pass_through(&state, Some(name), body.into_arguments()).await,
        Err(response) => response,
    }
}

async fn handle_call(State(state): State<AppState>, body: Bytes) -> Response {
    match CallBody::parse(&body) {
        Ok(mut body) => {
            let name = body.name.take();
            pass_through(&state, name, body.into_arguments()).await
        }
        Err(response) => response,
    }
}

async fn pass_through(state: &AppState, name: Option<String>, arguments: Value) -> Response {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, "tool name required");
    };
    if !PASS_THROUGH_TOOLS.contains(&name.as_str()) {
        return failure(StatusCode::NOT_FOUND, "tool not supported via HTTP proxy");
    }

    // Over HTTP, scrape_url goes to Crawl4AI like crawl4ai_scrape.
    let tool = if name == "scrape_url" { "crawl4ai_scrape" } else { name.as_str() };

    let result = state.dispatcher.call(tool, arguments, None).await;
    if result.is_error {
        warn!(tool = %name, error = %result.text_content(), "pass-through call failed");
        return failure(StatusCode::INTERNAL_SERVER_ERROR, result.text_content());
    }
    Json(json!({ "ok": true, "result": result })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_body_argument_keys() {
        let body = Bytes::from_static(br#"{"name":"search_web","args":{"query":"a"}}"#);
        let parsed = CallBody::parse(&body).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("search_web"));
        assert_eq!(parsed.into_arguments(), json!({ "query": "a" }));

        let body = Bytes::from_static(br#"{"arguments":{"query":"x"},"params":{"query":"y"}}"#);
        assert_eq!(CallBody::parse(&body).unwrap().into_arguments(), json!({ "query": "x" }));
    }

    #[test]
    fn test_empty_body_means_no_arguments() {
        let parsed = CallBody::parse(&Bytes::new()).unwrap();
        assert!(parsed.name.is_none());
        assert_eq!(parsed.into_arguments(), json!({}));
    }

    #[test]
    fn test_bad_json_is_bad_request() {
        let response = CallBody::parse(&Bytes::from_static(b"{nope")).unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
