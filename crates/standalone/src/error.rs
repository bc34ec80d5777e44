//! Orchestrator error types

use crate::orchestrator::OrchestratorState;
use simlink_client::ClientError;
use simlink_core::banner::StartupStage;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The launch script could not be spawned
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The server never accepted a connection on the probe address
    #[error("Server at {addr} not ready after {attempts} attempts ({timeout:?})")]
    ReadinessTimeout {
        addr: SocketAddr,
        attempts: u32,
        timeout: Duration,
    },

    /// Operation called from a state that does not allow it
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: OrchestratorState,
    },

    /// The late-bound client failed to stop the server
    #[error("Standalone server shutdown failed: {0}")]
    Shutdown(#[source] ClientError),

    /// Waiting on or killing the child failed
    #[error("Child process error: {0}")]
    Child(#[from] std::io::Error),

    /// Orchestrator settings unusable
    #[error("Invalid orchestrator configuration: {0}")]
    Config(String),
}

impl OrchestratorError {
    /// Startup stage for the failure banner, if this is a startup failure.
    pub fn stage(&self) -> Option<StartupStage> {
        match self {
            OrchestratorError::Launch { .. } => Some(StartupStage::Launch),
            OrchestratorError::ReadinessTimeout { .. } => Some(StartupStage::Readiness),
            _ => None,
        }
    }
}
