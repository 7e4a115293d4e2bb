//! baton - MCP (Model Context Protocol) server library
//!
//! Transport-agnostic MCP serving: a [`Handler`] supplies tools, a
//! [`TransportBinding`] supplies frames, and [`serve_binding`] connects the two.
//!
//! # Features
//!
//! - **Bindings**: newline-delimited stdio ([`StdioBinding`]) and per-connection
//!   SSE ([`SseBinding`]) behind one trait
//! - **Sessions**: [`SessionRegistry`] maps session ids to live bindings and
//!   forgets a session the moment its binding closes
//! - **Auth**: optional shared-secret bearer check in front of the HTTP routes
//!
//! # Example
//!
//! ```rust,ignore
//! use baton::{CallToolResult, ErrorData, Handler, Implementation, Tool, ToolCallRequest};
//! use async_trait::async_trait;
//!
//! struct MyHandler;
//!
//! #[async_trait]
//! impl Handler for MyHandler {
//!     fn tools(&self) -> Vec<Tool> {
//!         vec![Tool::new("hello", "Say hello")]
//!     }
//!
//!     async fn call_tool(&self, _request: ToolCallRequest) -> Result<CallToolResult, ErrorData> {
//!         Ok(CallToolResult::text("Hello!"))
//!     }
//!
//!     fn server_info(&self) -> Implementation {
//!         Implementation::new("my-server", "0.1.0")
//!     }
//! }
//!
//! // stdio
//! let handler = std::sync::Arc::new(MyHandler);
//! let binding = std::sync::Arc::new(baton::StdioBinding::stdio());
//! baton::serve_binding(handler.clone(), binding, None).await;
//!
//! // SSE
//! let sessions = std::sync::Arc::new(baton::SessionRegistry::new());
//! let state = std::sync::Arc::new(baton::McpState::new(handler, sessions));
//! let router = baton::router(state);
//! ```

pub mod protocol;
pub mod schema_helpers;
pub mod session;
pub mod transport;
pub mod types;

pub use types::content::Content;
pub use types::error::ErrorData;
pub use types::jsonrpc::{JsonRpcMessage, OutboundMessage, RequestId};
pub use types::protocol::{Implementation, ServerCapabilities};
pub use types::tool::{CallToolResult, Tool, ToolCallRequest, ToolSchema};

pub use session::{Session, SessionError, SessionId, SessionRegistry, SessionStats};

pub use protocol::{dispatch, handle_frame, serve_binding, Handler};

pub use schema_helpers::schema_for;

pub use transport::{
    router, with_bearer_auth, BearerToken, Inbound, McpState, SendOutcome, SseBinding,
    StdioBinding, TransportBinding, TransportError,
};
