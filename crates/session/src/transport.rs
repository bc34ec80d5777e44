//! Connection handle held by a session.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::message::SessionMessage;

/// Outbound half of a session channel.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Push one message to the peer.
    async fn send(&self, message: &SessionMessage) -> std::io::Result<()>;

    /// True once the peer went away or the handle was shut down.
    fn is_closed(&self) -> bool;

    /// Release the underlying connection. Idempotent.
    async fn shutdown(&self);

    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// Newline-delimited JSON over a TCP write half.
pub struct TcpSessionTransport {
    writer: Mutex<Option<OwnedWriteHalf>>,
    peer: SocketAddr,
    closed: AtomicBool,
}

impl TcpSessionTransport {
    pub fn new(writer: OwnedWriteHalf, peer: SocketAddr) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            peer,
            closed: AtomicBool::new(false),
        }
    }

    /// Mark the peer as gone, e.g. after the read half hit EOF.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionTransport for TcpSessionTransport {
    async fn send(&self, message: &SessionMessage) -> std::io::Result<()> {
        if self.is_closed() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "session channel closed",
            ));
        }

        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "session channel closed")
        })?;

        let result = async {
            writer.write_all(&line).await?;
            writer.flush().await
        }
        .await;

        if result.is_err() {
            self.mark_closed();
        }
        result
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.mark_closed();
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}
