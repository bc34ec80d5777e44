//! Typed capability facades over remote handles.

use crate::error::ClientError;
use serde::Serialize;
use serde_json::{json, Value};
use simlink_registry::RemoteHandle;
use simlink_sync::{
    ExternalProfile, ExternalState, GroundVehicle, GroundVehicleMirror, RemoteEntityOwner,
};
use std::path::Path;
use std::sync::Arc;

pub const SIMULATION_NAME: &str = "Simulation";
pub const GROUND_VEHICLE_NAME: &str = "GroundVehicle";
pub const ENTITY_NAME: &str = "Entity";
pub const EQUIPMENT_NAME: &str = "Equipment";
pub const ENVIRONMENT_NAME: &str = "Environment";
pub const RISK_MEASURES_NAME: &str = "RiskMeasures";

/// Simulation run control
#[derive(Debug, Clone)]
pub struct SimulationInterface {
    handle: RemoteHandle,
}

#[derive(Serialize)]
struct SetupArgs {
    total_period: f32,
    step_surface: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_terminal: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_airborne: Option<f32>,
}

impl SimulationInterface {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    /// Prepare a run. Returns the new simulation id.
    pub async fn setup(&self, total_period: f32, step: f32) -> Result<u64, ClientError> {
        let args = SetupArgs {
            total_period,
            step_surface: step,
            step_terminal: None,
            step_airborne: None,
        };
        Ok(self.handle.call_typed("setup", &args).await?)
    }

    /// Prepare a run with per-airspace time steps.
    pub async fn setup_layered(
        &self,
        total_period: f32,
        step_surface: f32,
        step_terminal: f32,
        step_airborne: f32,
    ) -> Result<u64, ClientError> {
        let args = SetupArgs {
            total_period,
            step_surface,
            step_terminal: Some(step_terminal),
            step_airborne: Some(step_airborne),
        };
        Ok(self.handle.call_typed("setup", &args).await?)
    }

    async fn control(&self, method: &str) -> Result<i32, ClientError> {
        Ok(self.handle.call_typed(method, &Value::Null).await?)
    }

    pub async fn start(&self) -> Result<i32, ClientError> {
        self.control("start").await
    }

    pub async fn pause(&self) -> Result<i32, ClientError> {
        self.control("pause").await
    }

    pub async fn resume(&self) -> Result<i32, ClientError> {
        self.control("resume").await
    }

    pub async fn stop(&self) -> Result<i32, ClientError> {
        self.control("stop").await
    }

    /// Run status code: 0 ready, 1 started, 2 paused, 3 resumed, 4 stopped, 5 ended
    pub async fn status(&self) -> Result<i32, ClientError> {
        self.control("status").await
    }

    pub async fn current_time(&self) -> Result<f32, ClientError> {
        Ok(self.handle.call_typed("current_time", &Value::Null).await?)
    }

    pub async fn sim_id(&self) -> Result<u64, ClientError> {
        Ok(self.handle.call_typed("sim_id", &Value::Null).await?)
    }

    /// Ask for a ground vehicle to be assigned to the logged-in user.
    pub async fn request_ground_vehicle(&self, id: &str) -> Result<bool, ClientError> {
        Ok(self
            .handle
            .call_typed("request_ground_vehicle", &json!({ "id": id }))
            .await?)
    }
}

/// Equipment group: ground vehicles plus backend-served equipment operations
#[derive(Debug, Clone)]
pub struct EquipmentInterface {
    handle: RemoteHandle,
}

impl EquipmentInterface {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    pub fn ground_vehicle(&self) -> Result<GroundVehicleInterface, ClientError> {
        Ok(GroundVehicleInterface::new(
            self.handle.sibling(GROUND_VEHICLE_NAME)?,
        ))
    }

    pub async fn call(&self, method: &str, args: Value) -> Result<Value, ClientError> {
        Ok(self.handle.call(method, args).await?)
    }
}

/// Ground vehicle operations
#[derive(Debug, Clone)]
pub struct GroundVehicleInterface {
    handle: RemoteHandle,
}

impl GroundVehicleInterface {
    pub fn new(handle: RemoteHandle) -> Self {
        Self { handle }
    }

    /// Load vehicle definitions from a file on the server host.
    pub async fn load(&self, path: &Path) -> Result<usize, ClientError> {
        Ok(self
            .handle
            .call_typed("load", &json!({ "path": path }))
            .await?)
    }

    pub async fn release(&self) -> Result<usize, ClientError> {
        Ok(self.handle.call_typed("release", &Value::Null).await?)
    }

    pub async fn ids(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.handle.call_typed("ids", &Value::Null).await?)
    }

    pub async fn assigned_ids(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.handle.call_typed("assigned_ids", &Value::Null).await?)
    }

    /// Fetch a vehicle as a mirror that writes through to the server.
    pub async fn select(&self, id: &str) -> Result<Option<GroundVehicleMirror>, ClientError> {
        let state: Option<GroundVehicle> = self
            .handle
            .call_typed("select", &json!({ "id": id }))
            .await?;
        let owner = Arc::new(RemoteEntityOwner::new(self.handle.clone()));
        Ok(state.map(|state| GroundVehicleMirror::new(state, owner)))
    }

    pub async fn external_create(&self, profile: &ExternalProfile) -> Result<i32, ClientError> {
        Ok(self.handle.call_typed("external_create", profile).await?)
    }

    pub async fn external_inject(&self, sample: &ExternalState) -> Result<i32, ClientError> {
        Ok(self.handle.call_typed("external_inject", sample).await?)
    }
}

macro_rules! backend_interface {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            handle: RemoteHandle,
        }

        impl $name {
            pub fn new(handle: RemoteHandle) -> Self {
                Self { handle }
            }

            /// Invoke a named operation on the server's algorithm backend.
            pub async fn call(&self, method: &str, args: Value) -> Result<Value, ClientError> {
                Ok(self.handle.call(method, args).await?)
            }
        }
    };
}

backend_interface!(
    /// Aircraft, controller and pilot operations
    EntityInterface
);
backend_interface!(
    /// Airport, terminal area, terrain and weather operations
    EnvironmentInterface
);
backend_interface!(
    /// Conflict and safety analysis operations
    RiskMeasuresInterface
);
