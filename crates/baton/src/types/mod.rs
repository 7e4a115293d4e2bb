//! MCP protocol types
//!
//! - `jsonrpc` - JSON-RPC 2.0 envelope (inbound messages, outbound replies)
//! - `error` - error objects with standard codes
//! - `protocol` - initialize handshake and capabilities
//! - `tool` - tool definitions, call requests and results
//! - `content` - content blocks

pub mod content;
pub mod error;
pub mod jsonrpc;
pub mod protocol;
pub mod tool;
