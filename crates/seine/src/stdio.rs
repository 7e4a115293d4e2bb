//! MCP over stdin/stdout.

use std::sync::Arc;
use tracing::info;

use crate::tools::ToolDispatcher;

/// Serve newline-delimited JSON-RPC on stdio until stdin closes.
pub async fn run(dispatcher: Arc<ToolDispatcher>) {
    let binding = Arc::new(baton::StdioBinding::stdio());
    info!("stdio MCP server running");
    baton::serve_binding(dispatcher, binding, None).await;
    info!("stdio closed");
}
