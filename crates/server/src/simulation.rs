//! Simulation run control.
//!
//! Propagation itself lives in the simulation engine; this object tracks the
//! run state clients observe and validates control transitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simlink_registry::{decode_args, encode_result, CallContext, RemoteError, RemoteObject};
use simlink_session::{PermissionLevel, SessionManager};
use simlink_sync::VehicleStore;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Run status, integer-coded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum SimulationStatus {
    Ready,
    Started,
    Paused,
    Resumed,
    Stopped,
    Ended,
}

impl From<SimulationStatus> for i32 {
    fn from(status: SimulationStatus) -> i32 {
        match status {
            SimulationStatus::Ready => 0,
            SimulationStatus::Started => 1,
            SimulationStatus::Paused => 2,
            SimulationStatus::Resumed => 3,
            SimulationStatus::Stopped => 4,
            SimulationStatus::Ended => 5,
        }
    }
}

impl TryFrom<i32> for SimulationStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SimulationStatus::Ready),
            1 => Ok(SimulationStatus::Started),
            2 => Ok(SimulationStatus::Paused),
            3 => Ok(SimulationStatus::Resumed),
            4 => Ok(SimulationStatus::Stopped),
            5 => Ok(SimulationStatus::Ended),
            other => Err(format!("unknown simulation status {}", other)),
        }
    }
}

impl SimulationStatus {
    fn is_running(self) -> bool {
        matches!(self, SimulationStatus::Started | SimulationStatus::Resumed)
    }
}

/// Parameters given to `setup`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSetup {
    /// Total propagation period in seconds
    pub total_period: f32,
    /// Surface time step in seconds
    pub step_surface: f32,
    #[serde(default)]
    pub step_terminal: Option<f32>,
    #[serde(default)]
    pub step_airborne: Option<f32>,
}

#[derive(Debug)]
struct RunState {
    id: u64,
    status: SimulationStatus,
    setup: Option<SimulationSetup>,
    current_time: f32,
}

#[derive(Debug, Deserialize)]
struct RequestVehicleArgs {
    id: String,
}

pub struct SimulationService {
    sessions: Arc<SessionManager>,
    vehicles: Arc<VehicleStore>,
    state: Mutex<RunState>,
}

impl SimulationService {
    pub fn new(sessions: Arc<SessionManager>, vehicles: Arc<VehicleStore>) -> Self {
        Self {
            sessions,
            vehicles,
            state: Mutex::new(RunState {
                id: 0,
                status: SimulationStatus::Ready,
                setup: None,
                current_time: 0.0,
            }),
        }
    }

    pub fn status(&self) -> SimulationStatus {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    fn setup(&self, setup: SimulationSetup) -> Result<u64, RemoteError> {
        if !(setup.total_period > 0.0 && setup.step_surface > 0.0) {
            return Err(RemoteError::invalid_args(
                "propagation period and time step must be positive",
            ));
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.status.is_running() {
            return Err(RemoteError::rejected("simulation is running"));
        }
        state.id += 1;
        state.setup = Some(setup);
        state.status = SimulationStatus::Ready;
        state.current_time = 0.0;
        info!(sim_id = state.id, total_period = setup.total_period, step = setup.step_surface, "Simulation set up");
        Ok(state.id)
    }

    fn transition(
        &self,
        allowed: &[SimulationStatus],
        next: SimulationStatus,
    ) -> Result<SimulationStatus, RemoteError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.setup.is_none() {
            return Err(RemoteError::rejected("simulation has not been set up"));
        }
        if !allowed.contains(&state.status) {
            return Err(RemoteError::rejected(format!(
                "cannot move simulation from {:?} to {:?}",
                state.status, next
            )));
        }
        state.status = next;
        if next == SimulationStatus::Stopped {
            state.current_time = 0.0;
        }
        info!(sim_id = state.id, status = ?next, "Simulation status changed");
        Ok(next)
    }
}

#[async_trait]
impl RemoteObject for SimulationService {
    async fn invoke(
        &self,
        ctx: &CallContext,
        method: &str,
        args: Value,
    ) -> Result<Value, RemoteError> {
        use SimulationStatus::*;

        let caller = self.sessions.caller(ctx.session_id)?;
        match method {
            "setup" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                encode_result(&self.setup(decode_args(args)?)?)
            }
            "start" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                encode_result(&self.transition(&[Ready, Stopped, Ended], Started)?)
            }
            "pause" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                encode_result(&self.transition(&[Started, Resumed], Paused)?)
            }
            "resume" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                encode_result(&self.transition(&[Paused], Resumed)?)
            }
            "stop" => {
                caller.require(PermissionLevel::SimulationAdmin)?;
                encode_result(&self.transition(&[Started, Paused, Resumed], Stopped)?)
            }
            "status" => {
                caller.require(PermissionLevel::NormalUser)?;
                encode_result(&self.status())
            }
            "current_time" => {
                caller.require(PermissionLevel::NormalUser)?;
                let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                encode_result(&state.current_time)
            }
            "sim_id" => {
                caller.require(PermissionLevel::NormalUser)?;
                let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                encode_result(&state.id)
            }
            "request_ground_vehicle" => {
                caller.require(PermissionLevel::NormalUser)?;
                let RequestVehicleArgs { id } = decode_args(args)?;
                encode_result(&self.vehicles.assign(&caller.auth_id, &id))
            }
            other => Err(RemoteError::unknown_method(other)),
        }
    }
}
