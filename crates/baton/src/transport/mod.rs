//! Transport bindings
//!
//! A binding adapts one physical channel into a uniform interface: receive
//! one frame, send one message, observe closure. Two variants exist:
//!
//! - [`StdioBinding`] - one newline-delimited JSON duplex stream for the
//!   lifetime of the process
//! - [`SseBinding`] - one per accepted network connection; replies go back
//!   to the exact connection that sent the request
//!
//! The axum [`router`] exposes the accept endpoint (`GET /sse`) and the
//! message endpoint (`POST /message`, `POST /sse`, `POST /sse/{session_id}`).

pub mod auth;
pub mod close;
pub mod message;
pub mod sse;
pub mod stdio;

pub use auth::{require_bearer, with_bearer_auth, BearerToken};
pub use close::{CloseCallback, CloseSignal};
pub use sse::SseBinding;
pub use stdio::StdioBinding;

use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use thiserror::Error;

use crate::protocol::Handler;
use crate::session::SessionRegistry;
use crate::types::jsonrpc::OutboundMessage;
use crate::types::protocol::Implementation;

/// One raw inbound frame plus the trace context of whoever sent it.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub payload: String,
    pub trace: opentelemetry::Context,
}

impl Inbound {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            trace: opentelemetry::Context::new(),
        }
    }

    pub fn with_trace(mut self, trace: opentelemetry::Context) -> Self {
        self.trace = trace;
        self
    }
}

/// What happened to an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The peer is gone; the message was discarded and the binding is now closed.
    Closed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
}

/// A uniform view of one physical channel.
///
/// `send` never surfaces write errors: a failed write closes the binding and
/// reports [`SendOutcome::Closed`].
#[async_trait]
pub trait TransportBinding: Send + Sync + 'static {
    /// Write one complete message, waiting until the channel accepts it.
    async fn send(&self, message: OutboundMessage) -> SendOutcome;

    /// Next inbound frame, or `None` once the peer has nothing more to say.
    async fn receive(&self) -> Option<Inbound>;

    /// Register the closure notification. Fires at most once.
    fn on_close(&self, callback: CloseCallback);

    /// Close from our side. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Shared state for the network surface.
pub struct McpState<H: Handler> {
    pub handler: Arc<H>,
    pub sessions: Arc<SessionRegistry<SseBinding>>,
    /// Path advertised in the `endpoint` event; clients POST messages here.
    pub message_endpoint: String,
}

impl<H: Handler> McpState<H> {
    pub fn new(handler: Arc<H>, sessions: Arc<SessionRegistry<SseBinding>>) -> Self {
        Self {
            handler,
            sessions,
            message_endpoint: "/message".to_string(),
        }
    }

    pub fn with_message_endpoint(mut self, path: impl Into<String>) -> Self {
        self.message_endpoint = path.into();
        self
    }

    pub fn server_info(&self) -> Implementation {
        self.handler.server_info()
    }
}

/// SSE transport routes. Nest or merge wherever the host wants them.
pub fn router<H: Handler>(state: Arc<McpState<H>>) -> Router {
    Router::new()
        .route(
            "/sse",
            get(sse::accept_handler::<H>).post(message::message_handler::<H>),
        )
        .route("/sse/{session_id}", post(message::session_message_handler::<H>))
        .route("/message", post(message::message_handler::<H>))
        .with_state(state)
}
