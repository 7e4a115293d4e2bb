//! Newline-delimited JSON over a duplex byte stream.
//!
//! In production this is process stdin/stdout; stdout then belongs to the
//! protocol and all logging must go to stderr.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CloseCallback, CloseSignal, Inbound, SendOutcome, TransportBinding};
use crate::types::jsonrpc::OutboundMessage;

type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

pub struct StdioBinding {
    reader: Mutex<Reader>,
    writer: Mutex<Writer>,
    close: CloseSignal,
}

impl StdioBinding {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(Box::new(writer)),
            close: CloseSignal::new(),
        }
    }

    /// Bind to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

#[async_trait]
impl TransportBinding for StdioBinding {
    async fn send(&self, message: OutboundMessage) -> SendOutcome {
        if self.close.is_closed() {
            return SendOutcome::Closed;
        }

        let mut line = match message.to_json() {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "dropping unserializable outbound message");
                return SendOutcome::Delivered;
            }
        };
        line.push('\n');

        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;

        match written {
            Ok(()) => SendOutcome::Delivered,
            Err(e) => {
                debug!(error = %e, "stdout write failed, closing stdio binding");
                drop(writer);
                self.close.close();
                SendOutcome::Closed
            }
        }
    }

    async fn receive(&self) -> Option<Inbound> {
        let mut reader = self.reader.lock().await;
        let mut raw = Vec::new();
        loop {
            raw.clear();
            let read = tokio::select! {
                _ = self.close.closed() => return None,
                read = reader.read_until(b'\n', &mut raw) => read,
            };

            match read {
                // EOF: the caller drains in-flight replies before closing.
                Ok(0) => return None,
                Ok(_) => {
                    // Invalid UTF-8 still becomes a frame so it gets a parse-error reply.
                    let line = String::from_utf8_lossy(&raw);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(Inbound::new(line));
                }
                Err(e) => {
                    debug!(error = %e, "stdin read failed");
                    return None;
                }
            }
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
