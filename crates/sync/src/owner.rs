//! The authority a mirror synchronizes against.

use crate::vehicle::GroundVehicle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use simlink_registry::{RemoteError, RemoteHandle};

/// Remote method name used by [`RemoteEntityOwner`]
pub const SYNCHRONIZE_METHOD: &str = "synchronize_ground_vehicle_to_server";

/// Owner of authoritative entity state.
///
/// Returns the owner's status code (0 accepted, nonzero rejected) or a
/// transport failure.
#[async_trait]
pub trait EntityOwner: Send + Sync {
    async fn synchronize_entity_to_server(
        &self,
        proposal: &GroundVehicle,
        changed_field: &str,
    ) -> Result<i32, RemoteError>;
}

/// Arguments of [`SYNCHRONIZE_METHOD`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchronizeArgs {
    pub vehicle: GroundVehicle,
    pub field: String,
}

/// Owner reached through an RPC handle to the ground-vehicle object
#[derive(Debug, Clone)]
pub struct RemoteEntityOwner {
    handle: RemoteHandle,
}

impl RemoteEntityOwner {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl EntityOwner for RemoteEntityOwner {
    async fn synchronize_entity_to_server(
        &self,
        proposal: &GroundVehicle,
        changed_field: &str,
    ) -> Result<i32, RemoteError> {
        let args = SynchronizeArgs {
            vehicle: proposal.clone(),
            field: changed_field.to_string(),
        };
        self.handle.call_typed(SYNCHRONIZE_METHOD, &args).await
    }
}
