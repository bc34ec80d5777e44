//! Client-side view of a session, fed by the handshake channel.

use crate::message::{SessionMessage, LOGGED_OUT_AUTH_ID};
use simlink_core::{SessionId, NO_SESSION};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the client has learned about its session.
#[derive(Debug)]
pub struct ClientSession {
    session_id: watch::Sender<SessionId>,
    auth_id: RwLock<Option<String>>,
    busy: AtomicBool,
    last_keepalive_ms: AtomicU64,
}

impl Default for ClientSession {
    fn default() -> Self {
        let (session_id, _) = watch::channel(NO_SESSION);
        Self {
            session_id,
            auth_id: RwLock::new(None),
            busy: AtomicBool::new(false),
            last_keepalive_ms: AtomicU64::new(0),
        }
    }
}

impl ClientSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session id, [`NO_SESSION`] until the handshake completes.
    pub fn session_id(&self) -> SessionId {
        *self.session_id.borrow()
    }

    pub fn auth_id(&self) -> Option<String> {
        self.auth_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn last_keepalive_ms(&self) -> u64 {
        self.last_keepalive_ms.load(Ordering::SeqCst)
    }

    /// Apply one message received from the node.
    pub fn apply(&self, message: &SessionMessage) {
        match message {
            SessionMessage::Assigned(id) => {
                self.session_id.send_replace(*id);
            }
            SessionMessage::AuthId(auth_id) => {
                let value = (auth_id != LOGGED_OUT_AUTH_ID).then(|| auth_id.clone());
                *self.auth_id.write().unwrap_or_else(PoisonError::into_inner) = value;
            }
            SessionMessage::KeepAlive(ms) => {
                self.last_keepalive_ms.store(*ms, Ordering::SeqCst);
            }
            SessionMessage::Busy(busy) => {
                self.busy.store(*busy, Ordering::SeqCst);
            }
        }
    }

    /// Wait until the node has assigned a session id.
    pub async fn wait_for_id(&self, timeout: Duration) -> Option<SessionId> {
        let mut rx = self.session_id.subscribe();
        let id = match tokio::time::timeout(timeout, rx.wait_for(|id| *id != NO_SESSION)).await {
            Ok(Ok(id)) => Some(*id),
            _ => None,
        };
        id
    }
}

/// Background reader for the session channel.
pub struct SessionChannel {
    task: JoinHandle<()>,
}

impl SessionChannel {
    /// Connect to a node's handshake port and start applying its messages.
    pub async fn connect(
        addr: SocketAddr,
        session: Arc<ClientSession>,
    ) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        info!(%addr, "Session channel connected");

        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match serde_json::from_str::<SessionMessage>(&line) {
                        Ok(message) => session.apply(&message),
                        Err(e) => warn!(error = %e, line = %line, "Unrecognized session message"),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Session channel read failed");
                        break;
                    }
                }
            }
            debug!("Session channel closed");
        });

        Ok(Self { task })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}
