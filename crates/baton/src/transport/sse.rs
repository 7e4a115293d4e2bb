//! Server-Sent Events binding
//!
//! `GET /sse` opens one long-lived event stream. The first event is
//! `endpoint`, carrying the URL the client must POST its messages to; every
//! reply afterwards is a `message` event on the same stream.

use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::{
    CloseCallback, CloseSignal, Inbound, McpState, SendOutcome, TransportBinding, TransportError,
};
use crate::protocol::{serve_binding, Handler};
use crate::types::jsonrpc::OutboundMessage;

/// Per-connection buffer for both directions.
pub const CHANNEL_CAPACITY: usize = 32;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// One accepted SSE connection.
pub struct SseBinding {
    outbound: mpsc::Sender<Event>,
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: Mutex<mpsc::Receiver<Inbound>>,
    close: CloseSignal,
}

impl SseBinding {
    /// Create a binding and the event stream to hand to axum.
    ///
    /// Dropping the stream (the client went away) closes the binding, and
    /// closing the binding ends the stream.
    pub fn open(capacity: usize) -> (Arc<Self>, EventStream) {
        let (outbound, outbound_rx) = mpsc::channel(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);

        let binding = Arc::new(Self {
            outbound,
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            close: CloseSignal::new(),
        });

        let watcher = Arc::clone(&binding);
        tokio::spawn(async move {
            tokio::select! {
                _ = watcher.outbound.closed() => {
                    debug!("SSE peer disconnected");
                    watcher.close.close();
                }
                _ = watcher.close.closed() => {}
            }
        });

        let stream = ReceiverStream::new(outbound_rx)
            .map(Ok::<_, Infallible>)
            .take_until(binding.close.token().cancelled_owned());

        (binding, Box::pin(stream))
    }

    /// Send the `endpoint` event telling the client where to POST.
    pub async fn announce_endpoint(&self, uri: &str) -> SendOutcome {
        self.push(Event::default().event("endpoint").data(uri)).await
    }

    /// Queue a frame that arrived on the message endpoint.
    pub async fn deliver(&self, frame: Inbound) -> Result<(), TransportError> {
        if self.close.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inbound_tx
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn push(&self, event: Event) -> SendOutcome {
        if self.close.is_closed() {
            return SendOutcome::Closed;
        }
        match self.outbound.send(event).await {
            Ok(()) => SendOutcome::Delivered,
            Err(_) => {
                self.close.close();
                SendOutcome::Closed
            }
        }
    }
}

#[async_trait]
impl TransportBinding for SseBinding {
    async fn send(&self, message: OutboundMessage) -> SendOutcome {
        match message.to_json() {
            Ok(data) => self.push(Event::default().event("message").data(data)).await,
            Err(e) => {
                warn!(error = %e, "dropping unserializable outbound message");
                SendOutcome::Delivered
            }
        }
    }

    async fn receive(&self) -> Option<Inbound> {
        let mut rx = self.inbound_rx.lock().await;
        tokio::select! {
            _ = self.close.closed() => None,
            frame = rx.recv() => frame,
        }
    }

    fn on_close(&self, callback: CloseCallback) {
        self.close.on_close(callback);
    }

    fn close(&self) {
        self.close.close();
    }

    fn is_closed(&self) -> bool {
        self.close.is_closed()
    }
}

/// Accept endpoint: turn one GET into a registered, long-lived session.
#[tracing::instrument(name = "mcp.session.accept", skip(state), fields(session_id = tracing::field::Empty))]
pub async fn accept_handler<H: Handler>(
    State(state): State<Arc<McpState<H>>>,
) -> Sse<KeepAliveStream<EventStream>> {
    let (binding, stream) = SseBinding::open(CHANNEL_CAPACITY);
    let session_id = state.sessions.register(Arc::clone(&binding));
    tracing::Span::current().record("session_id", session_id.as_str());

    let endpoint = format!("{}?sessionId={}", state.message_endpoint, session_id);
    if binding.announce_endpoint(&endpoint).await == SendOutcome::Closed {
        warn!("client left before the endpoint event was sent");
    }

    tokio::spawn(serve_binding(
        Arc::clone(&state.handler),
        binding as Arc<dyn TransportBinding>,
        Some(session_id.clone()),
    ));

    info!(session_id = %session_id, "SSE connection established");

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("ping"))
}
