//! Session pool and caller resolution.

use crate::error::SessionError;
use crate::message::SessionMessage;
use crate::permission::PermissionLevel;
use crate::transport::SessionTransport;
use crate::users::{UserDirectory, LOCALHOST_ADMIN};
use simlink_core::{DeploymentMode, SessionId, NO_SESSION};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
struct Binding {
    auth_id: Option<String>,
    permission: PermissionLevel,
}

/// One client connection on this node.
///
/// A session carries no authorization logic of its own; operations resolve a
/// [`CallerIdentity`] and check it themselves.
pub struct Session {
    id: SessionId,
    transport: Mutex<Option<Arc<dyn SessionTransport>>>,
    binding: RwLock<Binding>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("auth_id", &self.auth_id())
            .field("permission", &self.permission())
            .finish()
    }
}

impl Session {
    fn new(id: SessionId, transport: Option<Arc<dyn SessionTransport>>) -> Self {
        Self {
            id,
            transport: Mutex::new(transport),
            binding: RwLock::new(Binding::default()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn auth_id(&self) -> Option<String> {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .auth_id
            .clone()
    }

    pub fn permission(&self) -> PermissionLevel {
        self.binding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .permission
    }

    pub fn is_bound(&self) -> bool {
        self.auth_id().is_some()
    }

    pub fn transport(&self) -> Option<Arc<dyn SessionTransport>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when the transport is missing or has been closed.
    pub fn is_dead(&self) -> bool {
        self.transport().map(|t| t.is_closed()).unwrap_or(true)
    }

    /// Bind an identity and permission level.
    ///
    /// Re-binding the same identity is a no-op; the permission of a bound
    /// session never changes.
    pub fn bind(&self, auth_id: &str, permission: PermissionLevel) -> Result<(), SessionError> {
        let mut binding = self.binding.write().unwrap_or_else(PoisonError::into_inner);
        match binding.auth_id.as_deref() {
            Some(current) if current == auth_id => Ok(()),
            Some(current) => Err(SessionError::AlreadyBound {
                session_id: self.id,
                auth_id: current.to_string(),
            }),
            None => {
                binding.auth_id = Some(auth_id.to_string());
                binding.permission = permission;
                Ok(())
            }
        }
    }

    fn unbind(&self) {
        let mut binding = self.binding.write().unwrap_or_else(PoisonError::into_inner);
        *binding = Binding::default();
    }

    fn take_transport(&self) -> Option<Arc<dyn SessionTransport>> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Identity resolved for one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub session_id: SessionId,
    pub auth_id: String,
    pub permission: PermissionLevel,
}

impl CallerIdentity {
    /// The node-local administrator used for every standalone call.
    pub fn localhost_admin(session_id: SessionId) -> Self {
        Self {
            session_id,
            auth_id: LOCALHOST_ADMIN.to_string(),
            permission: PermissionLevel::Administrator,
        }
    }

    pub fn require(&self, required: PermissionLevel) -> Result<(), SessionError> {
        if self.permission.satisfies(required) {
            Ok(())
        } else {
            Err(SessionError::PermissionDenied {
                required,
                actual: self.permission,
            })
        }
    }
}

/// Node-owned pool of sessions.
pub struct SessionManager {
    mode: DeploymentMode,
    users: UserDirectory,
    next_id: AtomicU64,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(mode: DeploymentMode, users: UserDirectory) -> Self {
        Self {
            mode,
            users,
            next_id: AtomicU64::new(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    /// Register a new connection. Ids are unique for the node's lifetime.
    pub fn create_session(&self, transport: Option<Arc<dyn SessionTransport>>) -> Arc<Session> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(Session::new(id, transport));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session.clone());
        debug!(session_id = id, "Session created");
        session
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a session and release its transport. Returns false if unknown.
    pub async fn close(&self, id: SessionId) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match removed {
            Some(session) => {
                if let Some(transport) = session.take_transport() {
                    transport.shutdown().await;
                }
                debug!(session_id = id, "Session closed");
                true
            }
            None => false,
        }
    }

    fn lookup(&self, id: SessionId) -> Result<Arc<Session>, SessionError> {
        if id == NO_SESSION {
            return Err(SessionError::InvalidSession);
        }
        self.get(id).ok_or(SessionError::SessionNotFound(id))
    }

    /// Authenticate a session as a directory user and notify the client.
    ///
    /// A session auto-bound to [`LOCALHOST_ADMIN`] may log in as a real user.
    pub async fn login(
        &self,
        id: SessionId,
        auth_id: &str,
    ) -> Result<PermissionLevel, SessionError> {
        let session = self.lookup(id)?;
        let user = self
            .users
            .get(auth_id)
            .ok_or_else(|| SessionError::UnknownUser(auth_id.to_string()))?;

        if session.auth_id().as_deref() == Some(LOCALHOST_ADMIN) && auth_id != LOCALHOST_ADMIN {
            session.unbind();
        }
        session.bind(&user.auth_id, user.permission)?;

        self.notify(&session, &SessionMessage::AuthId(user.auth_id.clone()))
            .await;
        info!(session_id = id, auth_id, permission = ?user.permission, "User logged in");
        Ok(user.permission)
    }

    /// Bind a connection from the node's own host as [`LOCALHOST_ADMIN`].
    pub async fn login_localhost(&self, id: SessionId) -> Result<(), SessionError> {
        self.login(id, LOCALHOST_ADMIN).await.map(|_| ())
    }

    /// Drop the session's identity and notify the client.
    pub async fn logout(&self, id: SessionId) -> Result<(), SessionError> {
        let session = self.lookup(id)?;
        let previous = session.auth_id();
        session.unbind();
        self.notify(&session, &SessionMessage::logged_out()).await;
        info!(session_id = id, auth_id = ?previous, "User logged out");
        Ok(())
    }

    /// Resolve who is making a call.
    ///
    /// Standalone nodes serve a single co-located client, which is always the
    /// local administrator.
    pub fn caller(&self, id: SessionId) -> Result<CallerIdentity, SessionError> {
        if self.mode.is_standalone() {
            return Ok(CallerIdentity::localhost_admin(id));
        }

        let session = self.get(id).ok_or(SessionError::NotLoggedIn)?;
        let auth_id = session
            .auth_id()
            .filter(|a| !a.is_empty())
            .ok_or(SessionError::NotLoggedIn)?;
        Ok(CallerIdentity {
            session_id: id,
            auth_id,
            permission: session.permission(),
        })
    }

    async fn notify(&self, session: &Session, message: &SessionMessage) {
        if let Some(transport) = session.transport() {
            if let Err(e) = transport.send(message).await {
                warn!(session_id = session.id(), error = %e, "Failed to notify session");
            }
        }
    }

    /// Probe every session once and drop those that are gone.
    pub async fn sweep(&self) -> usize {
        let snapshot: Vec<Arc<Session>> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let probe = SessionMessage::KeepAlive(now_millis());

        let mut removed = 0;
        for session in snapshot {
            let alive = match session.transport() {
                Some(transport) if !transport.is_closed() => transport.send(&probe).await.is_ok(),
                _ => false,
            };
            if !alive && self.close(session.id()).await {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, remaining = self.len(), "Swept dead sessions");
        }
        removed
    }

    /// Run [`SessionManager::sweep`] on a fixed interval until aborted.
    pub fn spawn_keepalive(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                manager.sweep().await;
            }
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
