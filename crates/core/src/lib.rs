//! Core functionality for the Simlink coordination layer.
//!
//! This crate provides the configuration, deployment mode, logging and
//! shared constants used by every other Simlink crate, on both the server
//! node and the client side.

pub mod banner;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{
    ClientConfig, DeploymentMode, NodeConfig, DEFAULT_SERVER_RPC_PORT, DEFAULT_STANDALONE_RPC_PORT,
    SESSION_PORT,
};
pub use error::{CoreError, Result};
pub use types::{SessionId, NO_SESSION};
