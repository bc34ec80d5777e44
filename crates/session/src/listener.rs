//! Out-of-band session handshake listener.
//!
//! Each accepted connection becomes a session. The node immediately pushes
//! `{"sessionId": N}` and, for connections from its own host, logs the
//! session in as the local administrator. The connection then stays open as
//! the session channel until the client hangs up.

use crate::message::SessionMessage;
use crate::session::SessionManager;
use crate::transport::{SessionTransport, TcpSessionTransport};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn accept_failed(e: &std::io::Error) {
    error!(error = %e, "Session accept failed");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

pub struct SessionListener {
    manager: Arc<SessionManager>,
    advertised_ip: IpAddr,
}

impl SessionListener {
    pub fn new(manager: Arc<SessionManager>, advertised_ip: IpAddr) -> Self {
        Self {
            manager,
            advertised_ip,
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    fn is_local(&self, peer: &SocketAddr) -> bool {
        peer.ip() == self.advertised_ip || peer.ip().is_loopback()
    }

    /// Accept handshake connections until the task is aborted.
    pub fn spawn(self: Arc<Self>, listener: TcpListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            match listener.local_addr() {
                Ok(addr) => info!(%addr, "Session listener started"),
                Err(e) => warn!(error = %e, "Session listener started on unknown address"),
            }
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            this.handle_connection(stream, peer).await;
                        });
                    }
                    Err(e) => accept_failed(&e).await,
                }
            }
        })
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let (reader, writer) = stream.into_split();
        let transport = Arc::new(TcpSessionTransport::new(writer, peer));
        let session = self
            .manager
            .create_session(Some(transport.clone() as Arc<dyn SessionTransport>));
        let session_id = session.id();
        info!(session_id, %peer, "Session connected");

        if let Err(e) = transport.send(&SessionMessage::Assigned(session_id)).await {
            warn!(session_id, error = %e, "Failed to send session id");
            self.manager.close(session_id).await;
            return;
        }

        if self.is_local(&peer) {
            if let Err(e) = self.manager.login_localhost(session_id).await {
                warn!(session_id, error = %e, "Local auto-login failed");
            }
        }

        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!(session_id, line = %line, "Ignoring client message"),
                Ok(None) => break,
                Err(e) => {
                    debug!(session_id, error = %e, "Session channel read failed");
                    break;
                }
            }
        }

        transport.mark_closed();
        self.manager.close(session_id).await;
        info!(session_id, "Session disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionLevel;
    use crate::users::{UserDirectory, LOCALHOST_ADMIN};
    use simlink_core::DeploymentMode;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn local_connection_gets_id_and_admin_binding() {
        let manager = Arc::new(SessionManager::new(
            DeploymentMode::Server,
            UserDirectory::default(),
        ));
        let tcp = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = tcp.local_addr().unwrap();
        let listener = Arc::new(SessionListener::new(
            manager.clone(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
        ));
        let task = listener.spawn(tcp);

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut lines = BufReader::new(stream).lines();

        let first: SessionMessage =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let SessionMessage::Assigned(id) = first else {
            panic!("expected session id, got {first:?}");
        };
        let second: SessionMessage =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(second, SessionMessage::AuthId(LOCALHOST_ADMIN.to_string()));

        let session = manager.get(id).unwrap();
        assert_eq!(session.permission(), PermissionLevel::Administrator);

        drop(lines);
        for _ in 0..50 {
            if manager.get(id).is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(manager.get(id).is_none());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn accept_error_backs_off() {
        let started = tokio::time::Instant::now();
        accept_failed(&std::io::Error::new(std::io::ErrorKind::Other, "too many open files")).await;
        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }
}
