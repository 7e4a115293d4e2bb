//! Concurrent session map
//!
//! Emits tracing spans for the session lifecycle:
//! - `mcp.session.register` - binding registered under a fresh id
//! - `mcp.session.remove` - session removed (binding closed or explicit remove)

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{SessionError, SessionId};
use crate::transport::TransportBinding;

/// A live session: one binding, owned by the registry.
pub struct Session<B: ?Sized> {
    pub id: SessionId,
    pub binding: Arc<B>,
    pub created_at: Instant,
}

impl<B: ?Sized> Session<B> {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Statistics about registered sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    /// Sessions whose binding has not yet observed closure.
    pub connected: usize,
}

/// The one piece of state shared across requests.
///
/// Owned explicitly and handed to whoever needs it; there is no global
/// instance. Sharded locking in [`DashMap`] serializes access per key.
pub struct SessionRegistry<B: ?Sized = dyn TransportBinding> {
    sessions: DashMap<SessionId, Session<B>>,
}

impl<B: TransportBinding + ?Sized> SessionRegistry<B> {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Store `binding` under a fresh id and deregister it when it closes.
    pub fn register(self: &Arc<Self>, binding: Arc<B>) -> SessionId {
        let id = Uuid::new_v4().to_string();
        let _span = tracing::info_span!("mcp.session.register", mcp.session_id = %id).entered();

        self.sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                binding: Arc::clone(&binding),
                created_at: Instant::now(),
            },
        );

        // Weak so a binding never keeps its own registry alive.
        let registry: Weak<Self> = Arc::downgrade(self);
        let closed_id = id.clone();
        binding.on_close(Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(&closed_id);
            }
        }));

        tracing::debug!(total = self.sessions.len(), "session registered");
        id
    }

    pub fn lookup(&self, id: &str) -> Result<Arc<B>, SessionError> {
        self.sessions
            .get(id)
            .map(|session| Arc::clone(&session.binding))
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Remove a session. Idempotent; returns whether anything was removed.
    pub fn remove(&self, id: &str) -> bool {
        let _span = tracing::info_span!("mcp.session.remove", mcp.session_id = %id).entered();
        match self.sessions.remove(id) {
            Some((_, session)) => {
                tracing::info!(age_ms = session.age().as_millis() as u64, "session removed");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats::default();
        for entry in self.sessions.iter() {
            stats.total += 1;
            if !entry.binding.is_closed() {
                stats.connected += 1;
            }
        }
        stats
    }

    /// Close every binding. Each close deregisters its own session.
    pub fn close_all(&self) {
        // Collect first: closing re-enters the map through `remove`.
        let bindings: Vec<Arc<B>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(&entry.binding))
            .collect();

        for binding in bindings {
            binding.close();
        }
    }
}

impl<B: TransportBinding + ?Sized> Default for SessionRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}
