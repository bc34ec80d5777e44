//! Client error types

use simlink_core::{CoreError, DeploymentMode};
use simlink_registry::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection file or settings unusable
    #[error("Client configuration error: {0}")]
    Config(#[from] CoreError),

    /// Remote operation failed
    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// Server address could not be resolved
    #[error("Cannot resolve server address {0}")]
    Resolve(String),

    /// Session channel could not be opened
    #[error("Session channel error: {0}")]
    Session(#[from] std::io::Error),

    /// The node never assigned a session id
    #[error("No session id received from {0}")]
    NoSession(String),

    /// Operation not available in the current deployment mode
    #[error("{operation} is not available in {mode} mode")]
    WrongMode {
        operation: &'static str,
        mode: DeploymentMode,
    },
}
