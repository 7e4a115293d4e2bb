//! Once-only closure notification shared by every binding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

/// Callback fired when a binding closes.
pub type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

/// Tracks whether a binding is closed and fires its close callback exactly once.
///
/// Closure may be triggered from several directions at once (peer gone, write
/// failure, explicit shutdown); only the first caller of [`close`](Self::close)
/// runs the callback.
#[derive(Default)]
pub struct CloseSignal {
    closed: AtomicBool,
    callback: Mutex<Option<CloseCallback>>,
    token: CancellationToken,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the close callback, replacing any earlier one.
    ///
    /// Fires immediately if the binding is already closed.
    pub fn on_close(&self, callback: CloseCallback) {
        {
            let mut slot = self.callback.lock().unwrap_or_else(|e| e.into_inner());
            if !self.closed.load(Ordering::Acquire) {
                *slot = Some(callback);
                return;
            }
        }
        callback();
    }

    /// Mark closed. Returns true for the call that performed the transition.
    pub fn close(&self) -> bool {
        let callback = {
            let mut slot = self.callback.lock().unwrap_or_else(|e| e.into_inner());
            if self.closed.swap(true, Ordering::AcqRel) {
                return false;
            }
            slot.take()
        };

        self.token.cancel();
        if let Some(callback) = callback {
            callback();
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the binding is closed.
    pub async fn closed(&self) {
        self.token.cancelled().await
    }

    /// A token that is cancelled when the binding closes, for `'static` futures.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl std::fmt::Debug for CloseSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseSignal")
            .field("closed", &self.is_closed())
            .finish()
    }
}
