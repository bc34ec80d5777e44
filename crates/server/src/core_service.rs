//! The core object exported under the reserved name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simlink_core::banner::{SERVER_NAME, STANDALONE_NAME, VERSION};
use simlink_core::DeploymentMode;
use simlink_registry::{decode_args, encode_result, CallContext, RemoteError, RemoteObject};
use simlink_session::{PermissionLevel, SessionManager};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Delay between acknowledging a shutdown request and signalling it.
const SHUTDOWN_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
struct LoginArgs {
    auth_id: String,
}

/// Snapshot returned by `info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub mode: DeploymentMode,
    pub os: String,
    pub process_id: u32,
    pub sessions: usize,
    pub uptime_secs: u64,
}

pub struct CoreService {
    sessions: Arc<SessionManager>,
    started: Instant,
    shutdown: watch::Sender<bool>,
}

impl CoreService {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            sessions,
            started: Instant::now(),
            shutdown,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn info(&self) -> ServerInfo {
        let mode = self.sessions.mode();
        ServerInfo {
            name: match mode {
                DeploymentMode::Server => SERVER_NAME,
                DeploymentMode::Standalone => STANDALONE_NAME,
            }
            .to_string(),
            version: VERSION.to_string(),
            mode,
            os: std::env::consts::OS.to_string(),
            process_id: std::process::id(),
            sessions: self.sessions.len(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }

    /// Ask the node to shut down.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolve once a shutdown has been requested.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

#[async_trait]
impl RemoteObject for CoreService {
    async fn invoke(
        &self,
        ctx: &CallContext,
        method: &str,
        args: Value,
    ) -> Result<Value, RemoteError> {
        match method {
            "login" => {
                let LoginArgs { auth_id } = decode_args(args)?;
                let level = self.sessions.login(ctx.session_id, &auth_id).await?;
                encode_result(&level)
            }
            "logout" => {
                self.sessions.logout(ctx.session_id).await?;
                Ok(Value::Null)
            }
            "info" => {
                let info = self.info();
                info!(
                    name = %info.name,
                    version = %info.version,
                    mode = %info.mode,
                    sessions = info.sessions,
                    uptime_secs = info.uptime_secs,
                    "Server info requested"
                );
                encode_result(&info)
            }
            "get_server_process_id" => encode_result(&std::process::id()),
            "shutdown" => {
                let caller = self.sessions.caller(ctx.session_id)?;
                caller.require(PermissionLevel::Administrator)?;
                warn!(auth_id = %caller.auth_id, "Shutdown requested");

                let shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(SHUTDOWN_DELAY).await;
                    shutdown.send_replace(true);
                });
                Ok(Value::Bool(true))
            }
            other => Err(RemoteError::unknown_method(other)),
        }
    }
}
