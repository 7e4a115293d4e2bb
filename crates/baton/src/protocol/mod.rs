//! MCP Protocol Dispatch
//!
//! Routes JSON-RPC methods to a [`Handler`] and drives a transport binding:
//! read a frame, dispatch it, write the reply back through the same binding.
//!
//! Implements OpenTelemetry JSON-RPC semantic conventions for observability.
//! See: https://opentelemetry.io/docs/specs/semconv/rpc/json-rpc/

use async_trait::async_trait;
use opentelemetry::trace::TraceContextExt;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::session::SessionId;
use crate::transport::{Inbound, SendOutcome, TransportBinding};
use crate::types::error::ErrorData;
use crate::types::jsonrpc::{JsonRpcMessage, OutboundMessage, RequestId};
use crate::types::protocol::{
    negotiate_version, Implementation, InitializeParams, InitializeResult, ServerCapabilities,
};
use crate::types::tool::{CallToolParams, CallToolResult, ListToolsResult, Tool, ToolCallRequest};

/// Handler trait for MCP server implementations.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// The tool catalog. Called for every `tools/list`.
    fn tools(&self) -> Vec<Tool>;

    /// Execute a tool call.
    ///
    /// Tool failures belong in `CallToolResult::error`; an `Err` here becomes a
    /// JSON-RPC error response instead.
    async fn call_tool(&self, request: ToolCallRequest) -> Result<CallToolResult, ErrorData>;

    fn server_info(&self) -> Implementation;

    fn instructions(&self) -> Option<String> {
        None
    }

    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities::with_tools()
    }
}

/// Drive one binding until the peer stops sending.
///
/// Every frame gets its own task, so a slow tool call never holds up the
/// next request. When input ends the loop waits for in-flight replies and
/// then closes the binding.
pub async fn serve_binding<H: Handler>(
    handler: Arc<H>,
    binding: Arc<dyn TransportBinding>,
    session_id: Option<SessionId>,
) {
    let tasks = TaskTracker::new();

    while let Some(frame) = binding.receive().await {
        let handler = Arc::clone(&handler);
        let binding = Arc::clone(&binding);
        let session_id = session_id.clone();

        tasks.spawn(async move {
            let Some(reply) = handle_frame(handler.as_ref(), session_id.as_deref(), frame).await
            else {
                return;
            };
            let id = reply.id().cloned();
            if binding.send(reply).await == SendOutcome::Closed {
                debug!(request_id = ?id, "transport closed, reply discarded");
            }
        });
    }

    tasks.close();
    tasks.wait().await;
    binding.close();
    debug!(session_id = ?session_id, "binding finished");
}

/// Turn one raw frame into at most one outbound message.
///
/// Notifications and stray client responses produce nothing.
pub async fn handle_frame<H: Handler>(
    handler: &H,
    session_id: Option<&str>,
    frame: Inbound,
) -> Option<OutboundMessage> {
    let value: Value = match serde_json::from_str(&frame.payload) {
        Ok(v) => v,
        Err(e) => {
            return Some(OutboundMessage::error(
                None,
                ErrorData::parse_error(format!("Parse error: {}", e)),
            ))
        }
    };

    let id: Option<RequestId> = value
        .get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok());

    if value.get("method").is_none() && (value.get("result").is_some() || value.get("error").is_some()) {
        debug!(request_id = ?id, "ignoring client response; no server-initiated requests are pending");
        return None;
    }

    let message: JsonRpcMessage = match serde_json::from_value(value) {
        Ok(m) => m,
        Err(e) => {
            return Some(OutboundMessage::error(
                id,
                ErrorData::invalid_request(format!("Invalid JSON-RPC: {}", e)),
            ))
        }
    };

    let result = dispatch(handler, session_id, &message, &frame.trace).await;

    match message.id {
        None => {
            if let Err(e) = result {
                debug!(method = %message.method, error = %e, "notification failed");
            }
            None
        }
        Some(id) => Some(match result {
            Ok(value) => OutboundMessage::success(id, value),
            Err(error) => OutboundMessage::error(Some(id), error),
        }),
    }
}

/// Dispatch a JSON-RPC message to the appropriate handler.
///
/// Creates a span following JSON-RPC semantic conventions:
/// - `rpc.system` = "jsonrpc"
/// - `rpc.method` = the JSON-RPC method name
/// - `rpc.jsonrpc.request_id` = the request ID (if present)
/// - `mcp.session_id` = the session identifier (network sessions only)
pub async fn dispatch<H: Handler>(
    handler: &H,
    session_id: Option<&str>,
    message: &JsonRpcMessage,
    parent: &opentelemetry::Context,
) -> Result<Value, ErrorData> {
    let request_id = message
        .id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_default();

    let span = tracing::info_span!(
        "mcp.dispatch",
        rpc.system = "jsonrpc",
        rpc.method = %message.method,
        rpc.jsonrpc.version = "2.0",
        rpc.jsonrpc.request_id = %request_id,
        mcp.session_id = session_id.unwrap_or(""),
        error.type = tracing::field::Empty,
        rpc.jsonrpc.error_code = tracing::field::Empty,
    );
    if parent.has_active_span() {
        span.set_parent(parent.clone());
    }

    async {
        let result = dispatch_inner(handler, session_id, message).await;
        if let Err(ref error) = result {
            let span = tracing::Span::current();
            span.record("error.type", error_type_for_code(error.code));
            span.record("rpc.jsonrpc.error_code", error.code);
        }
        result
    }
    .instrument(span)
    .await
}

fn error_type_for_code(code: i32) -> &'static str {
    match code {
        ErrorData::PARSE_ERROR => "parse_error",
        ErrorData::INVALID_REQUEST => "invalid_request",
        ErrorData::METHOD_NOT_FOUND => "method_not_found",
        ErrorData::INVALID_PARAMS => "invalid_params",
        ErrorData::INTERNAL_ERROR => "internal_error",
        _ => "application_error",
    }
}

async fn dispatch_inner<H: Handler>(
    handler: &H,
    session_id: Option<&str>,
    message: &JsonRpcMessage,
) -> Result<Value, ErrorData> {
    match message.method.as_str() {
        "initialize" => handle_initialize(handler, message),
        "notifications/initialized" | "notifications/cancelled" => {
            debug!(method = %message.method, "notification");
            Ok(Value::Null)
        }
        "ping" => Ok(serde_json::json!({})),
        "tools/list" => to_value(&ListToolsResult {
            tools: handler.tools(),
        }),
        "tools/call" => handle_call_tool(handler, session_id, message).await,
        _ => Err(ErrorData::method_not_found(&message.method)),
    }
}

fn handle_initialize<H: Handler>(
    handler: &H,
    request: &JsonRpcMessage,
) -> Result<Value, ErrorData> {
    let params: InitializeParams = parse_params(request, "initialize")?;

    tracing::info!(
        client = %params.client_info.name,
        client_version = %params.client_info.version,
        protocol_version = %params.protocol_version,
        "client initialized"
    );

    to_value(&InitializeResult {
        protocol_version: negotiate_version(&params.protocol_version).to_string(),
        capabilities: handler.capabilities(),
        server_info: handler.server_info(),
        instructions: handler.instructions(),
    })
}

async fn handle_call_tool<H: Handler>(
    handler: &H,
    session_id: Option<&str>,
    request: &JsonRpcMessage,
) -> Result<Value, ErrorData> {
    let params: CallToolParams = parse_params(request, "call")?;

    let arguments = params
        .arguments
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

    let mut call = ToolCallRequest::new(params.name, arguments);
    if let Some(id) = session_id {
        call = call.with_session(id);
    }

    let result = handler.call_tool(call).await?;
    to_value(&result)
}

fn parse_params<T: serde::de::DeserializeOwned>(
    request: &JsonRpcMessage,
    what: &str,
) -> Result<T, ErrorData> {
    let params = request
        .params
        .as_ref()
        .ok_or_else(|| ErrorData::invalid_params(format!("Missing {} params", what)))?;
    serde_json::from_value(params.clone())
        .map_err(|e| ErrorData::invalid_params(format!("Invalid {} params: {}", what, e)))
}

fn to_value<T: serde::Serialize>(result: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(result)
        .map_err(|e| ErrorData::internal_error(format!("Failed to serialize result: {}", e)))
}
