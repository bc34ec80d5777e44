//! Capability groups served by an external algorithm backend.
//!
//! Trajectory synthesis, conflict geometry, weather and terrain are not part
//! of this node. Their operations are reachable by name and forwarded to an
//! [`AlgorithmBackend`]; without one every call reports `unsupported`.

use async_trait::async_trait;
use serde_json::Value;
use simlink_registry::{CallContext, RemoteError, RemoteObject};
use simlink_session::{CallerIdentity, PermissionLevel, SessionManager};
use std::sync::Arc;
use tracing::debug;

/// Export names of the backend-served groups
pub const ALGORITHM_GROUPS: [&str; 4] = ["Entity", "Equipment", "Environment", "RiskMeasures"];

#[async_trait]
pub trait AlgorithmBackend: Send + Sync {
    async fn call(
        &self,
        group: &str,
        caller: &CallerIdentity,
        method: &str,
        args: Value,
    ) -> Result<Value, RemoteError>;
}

/// Backend used when none is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

#[async_trait]
impl AlgorithmBackend for UnsupportedBackend {
    async fn call(
        &self,
        group: &str,
        _caller: &CallerIdentity,
        method: &str,
        _args: Value,
    ) -> Result<Value, RemoteError> {
        Err(RemoteError::unsupported(&format!("{}.{}", group, method)))
    }
}

pub struct AlgorithmService {
    group: String,
    sessions: Arc<SessionManager>,
    backend: Arc<dyn AlgorithmBackend>,
}

impl AlgorithmService {
    pub fn new(
        group: impl Into<String>,
        sessions: Arc<SessionManager>,
        backend: Arc<dyn AlgorithmBackend>,
    ) -> Self {
        Self {
            group: group.into(),
            sessions,
            backend,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

#[async_trait]
impl RemoteObject for AlgorithmService {
    async fn invoke(
        &self,
        ctx: &CallContext,
        method: &str,
        args: Value,
    ) -> Result<Value, RemoteError> {
        let caller = self.sessions.caller(ctx.session_id)?;
        caller.require(PermissionLevel::NormalUser)?;
        debug!(group = %self.group, method, auth_id = %caller.auth_id, "Forwarding to algorithm backend");
        self.backend.call(&self.group, &caller, method, args).await
    }
}
