//! Standalone deployment: the client launches its own server.
//!
//! [`StandaloneOrchestrator`] spawns the node's launch script, waits for the
//! session port to accept connections and then binds late to an optional
//! [`ClientModule`](simlink_client::ClientModule). Without a module every
//! capability accessor returns `None`.

pub mod config;
pub mod drain;
pub mod error;
pub mod orchestrator;
pub mod probe;

pub use config::{LaunchCommand, OrchestratorConfig, OutputMode};
pub use error::OrchestratorError;
pub use orchestrator::{OrchestratorState, StandaloneOrchestrator, VERSION_FLAG};
pub use probe::{wait_until_ready, ReadinessProbe, TcpProbe};
