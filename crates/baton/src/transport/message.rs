//! Message endpoint
//!
//! Accepts one client-to-server JSON-RPC payload, finds the session it is
//! addressed to and queues it on that session's binding. The reply travels
//! back over the session's SSE stream, so the HTTP answer is just 202.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use opentelemetry_http::HeaderExtractor;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{Inbound, McpState};
use crate::protocol::Handler;
use crate::types::error::ErrorData;
use crate::types::jsonrpc::{OutboundMessage, RequestId};

/// Header carrying the session id when neither path nor query does.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Deserialize)]
pub struct MessageParams {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// `POST /message?sessionId=...` and `POST /sse?sessionId=...`
pub async fn message_handler<H: Handler>(
    State(state): State<Arc<McpState<H>>>,
    Query(params): Query<MessageParams>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let session_id = params.session_id.or_else(|| {
        headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });
    deliver_to_session(&state, session_id, &headers, body).await
}

/// `POST /sse/{session_id}`
pub async fn session_message_handler<H: Handler>(
    State(state): State<Arc<McpState<H>>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    deliver_to_session(&state, Some(session_id), &headers, body).await
}

#[tracing::instrument(name = "mcp.message", skip_all, fields(session_id = ?session_id))]
async fn deliver_to_session<H: Handler>(
    state: &McpState<H>,
    session_id: Option<String>,
    headers: &HeaderMap,
    body: Value,
) -> Response {
    let request_id: Option<RequestId> = body
        .get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok());

    let Some(session_id) = session_id else {
        return error_response(
            StatusCode::BAD_REQUEST,
            request_id,
            ErrorData::invalid_request("Missing sessionId"),
        );
    };

    // Clone the binding out of the registry; no map guard is held across awaits.
    let binding = match state.sessions.lookup(&session_id) {
        Ok(binding) => binding,
        Err(e) => {
            tracing::debug!(error = %e, "message for unknown session");
            return error_response(
                StatusCode::NOT_FOUND,
                request_id,
                ErrorData::invalid_request("Session not found"),
            );
        }
    };

    let parent = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(headers))
    });
    let frame = Inbound::new(body.to_string()).with_trace(parent);

    match binding.deliver(frame).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "session closed while delivering");
            error_response(
                StatusCode::NOT_FOUND,
                request_id,
                ErrorData::invalid_request("Session not found"),
            )
        }
    }
}

fn error_response(status: StatusCode, id: Option<RequestId>, error: ErrorData) -> Response {
    (status, Json(OutboundMessage::error(id, error))).into_response()
}
