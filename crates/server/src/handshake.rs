//! Session handshake loop started by the registry after publication.

use async_trait::async_trait;
use simlink_registry::{ListenerLoop, RegistryError};
use simlink_session::{SessionListener, SessionManager};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

/// Binds the handshake port, accepts session connections and sweeps dead
/// sessions on a fixed interval.
pub struct HandshakeLoop {
    sessions: Arc<SessionManager>,
    bind_addr: SocketAddr,
    keepalive: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HandshakeLoop {
    pub fn new(sessions: Arc<SessionManager>, bind_addr: SocketAddr, keepalive: Duration) -> Self {
        Self {
            sessions,
            bind_addr,
            keepalive,
            tasks: Mutex::new(Vec::new()),
            local_addr: Mutex::new(None),
        }
    }

    /// Address actually bound, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ListenerLoop for HandshakeLoop {
    async fn start(&self, advertised: IpAddr) -> Result<(), RegistryError> {
        let tcp = TcpListener::bind(self.bind_addr).await?;
        let local = tcp.local_addr()?;
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(local);

        let listener = Arc::new(SessionListener::new(Arc::clone(&self.sessions), advertised));
        let accept = listener.spawn(tcp);
        let sweeper = self.sessions.spawn_keepalive(self.keepalive);

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([accept, sweeper]);
        info!(%local, keepalive_ms = self.keepalive.as_millis() as u64, "Session handshake loop running");
        Ok(())
    }

    fn stop(&self) {
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
    }
}

impl Drop for HandshakeLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
