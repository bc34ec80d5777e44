//! Ground vehicle capability object.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use simlink_registry::{decode_args, encode_result, CallContext, RemoteError, RemoteObject};
use simlink_session::{PermissionLevel, SessionManager};
use simlink_sync::owner::SynchronizeArgs;
use simlink_sync::{ExternalProfile, ExternalState, VehicleStore, SYNCHRONIZE_METHOD};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct LoadArgs {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SelectArgs {
    id: String,
}

pub struct GroundVehicleService {
    sessions: Arc<SessionManager>,
    vehicles: Arc<VehicleStore>,
}

impl GroundVehicleService {
    pub fn new(sessions: Arc<SessionManager>, vehicles: Arc<VehicleStore>) -> Self {
        Self { sessions, vehicles }
    }

    /// Load vehicle definitions and hand out the directory's pre-assignments.
    fn load(&self, path: &Path) -> Result<usize, RemoteError> {
        let count = self
            .vehicles
            .load_file(path)
            .map_err(|e| RemoteError::rejected(e.to_string()))?;

        if !self.sessions.mode().is_standalone() {
            for (auth_id, ids) in self.sessions.users().ground_vehicle_assignments() {
                for id in ids {
                    if !self.vehicles.assign(auth_id, id) {
                        warn!(auth_id, vehicle = %id, "Pre-assigned ground vehicle not available");
                    }
                }
            }
        }
        info!(path = %path.display(), count, "Ground vehicle file loaded");
        Ok(count)
    }
}

#[async_trait]
impl RemoteObject for GroundVehicleService {
    async fn invoke(
        &self,
        ctx: &CallContext,
        method: &str,
        args: Value,
    ) -> Result<Value, RemoteError> {
        let caller = self.sessions.caller(ctx.session_id)?;
        match method {
            "load" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                let LoadArgs { path } = decode_args(args)?;
                encode_result(&self.load(&path)?)
            }
            "release" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                encode_result(&self.vehicles.release())
            }
            "ids" => {
                caller.require(PermissionLevel::NormalUser)?;
                encode_result(&self.vehicles.ids())
            }
            "assigned_ids" => {
                caller.require(PermissionLevel::NormalUser)?;
                encode_result(&self.vehicles.assigned_ids(&caller.auth_id))
            }
            "select" => {
                caller.require(PermissionLevel::NormalUser)?;
                let SelectArgs { id } = decode_args(args)?;
                encode_result(&self.vehicles.select(ctx.session_id, &id))
            }
            SYNCHRONIZE_METHOD => {
                let SynchronizeArgs { vehicle, field } = decode_args(args)?;
                encode_result(&self.vehicles.synchronize(&caller, &vehicle, &field))
            }
            "external_create" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                let profile: ExternalProfile = decode_args(args)?;
                encode_result(&self.vehicles.create_external(profile))
            }
            "external_inject" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                let sample: ExternalState = decode_args(args)?;
                encode_result(&self.vehicles.inject_external(sample))
            }
            other => Err(RemoteError::unknown_method(other)),
        }
    }
}
