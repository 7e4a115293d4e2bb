//! The nine tools and how they are dispatched.
//!
//! - `args` - typed arguments with JSON Schema
//! - `request` - name + arguments to [`ToolRequest`]
//! - `catalog` - what `tools/list` advertises
//! - `fanout` - search then scrape the top hits
//! - `dispatch` - the [`baton::Handler`] tying it together

pub mod args;
pub mod catalog;
pub mod dispatch;
pub mod fanout;
pub mod request;

pub use catalog::catalog;
pub use dispatch::ToolDispatcher;
pub use fanout::{FanoutAggregator, FanoutItem, FanoutOutcome, FanoutPolicy, FanoutRequest};
pub use request::{ToolCallError, ToolRequest, TOOL_NAMES};
