//! Session Registry
//!
//! Tracks every live network binding by session id so that a message POSTed
//! to the message endpoint reaches the connection that owns the session.
//! A session exists exactly as long as its binding is open: closing the
//! binding is what removes it.

mod registry;

pub use registry::{Session, SessionRegistry, SessionStats};

use thiserror::Error;

/// Opaque, unguessable session identifier (UUID v4).
pub type SessionId = String;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),
}
