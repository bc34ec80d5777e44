//! Remotely callable capability objects.

use crate::error::{RegistryError, RemoteError};
use async_trait::async_trait;
use serde_json::Value;
use simlink_core::SessionId;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Per-call information handed to an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Session id claimed by the caller
    pub session_id: SessionId,
    /// Remote socket address of the RPC connection
    pub peer: Option<SocketAddr>,
}

impl CallContext {
    /// Context for an in-process call
    pub fn local(session_id: SessionId) -> Self {
        Self {
            session_id,
            peer: None,
        }
    }
}

/// A capability object that can be exported by the registry
#[async_trait]
pub trait RemoteObject: Send + Sync {
    /// Called once while the object is staged for export. An error aborts
    /// the whole bootstrap.
    fn prepare_export(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Execute one operation
    async fn invoke(&self, ctx: &CallContext, method: &str, args: Value)
        -> Result<Value, RemoteError>;
}

/// Long-running loop owned by the core object, started after publication
#[async_trait]
pub trait ListenerLoop: Send + Sync {
    /// Bind and spawn the loop. Must return once the loop is running.
    async fn start(&self, advertised: IpAddr) -> Result<(), RegistryError>;

    /// Stop the loop if it is running
    fn stop(&self) {}
}

/// The core object together with its optional listener loop
#[derive(Clone)]
pub struct CoreBinding {
    /// Object exported under the reserved core name
    pub object: Arc<dyn RemoteObject>,
    /// Loop started once every export succeeded
    pub listener: Option<Arc<dyn ListenerLoop>>,
}

impl CoreBinding {
    /// Core object without a listener loop
    pub fn new(object: Arc<dyn RemoteObject>) -> Self {
        Self {
            object,
            listener: None,
        }
    }

    /// Attach the listener loop
    pub fn with_listener(mut self, listener: Arc<dyn ListenerLoop>) -> Self {
        self.listener = Some(listener);
        self
    }
}
