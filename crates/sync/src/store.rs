//! Server-side authoritative ground vehicle state.

use crate::error::StoreError;
use crate::vehicle::{GroundVehicle, VehicleField};
use serde::{Deserialize, Serialize};
use simlink_core::SessionId;
use simlink_session::{CallerIdentity, PermissionLevel};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Status codes returned by [`VehicleStore::synchronize`] and the external
/// feed operations.
pub mod status {
    pub const ACCEPTED: i32 = 0;
    pub const UNKNOWN_VEHICLE: i32 = 1;
    pub const NOT_PERMITTED: i32 = 2;
    pub const INVALID_FIELD: i32 = 3;
    pub const EXTERNAL_VEHICLE: i32 = 4;
}

/// Definition of an externally driven vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalProfile {
    pub id: String,
    pub aircraft_id: Option<String>,
    pub location_id: Option<String>,
    pub latitude: f32,
    pub longitude: f32,
    pub speed: f32,
    pub course: f32,
}

/// One state sample from an external feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalState {
    pub id: String,
    pub aircraft_id: Option<String>,
    pub latitude: f32,
    pub longitude: f32,
    pub speed: f32,
    pub course: f32,
}

/// Authoritative ground vehicles keyed by id
#[derive(Debug, Default)]
pub struct VehicleStore {
    vehicles: RwLock<BTreeMap<String, GroundVehicle>>,
}

impl VehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current vehicle set. Returns the number loaded.
    pub fn load(&self, vehicles: Vec<GroundVehicle>) -> usize {
        let mut map = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        map.clear();
        for vehicle in vehicles {
            map.insert(vehicle.id.clone(), vehicle);
        }
        info!(count = map.len(), "Ground vehicles loaded");
        map.len()
    }

    /// Load a JSON array of vehicle definitions.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<usize, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let vehicles: Vec<GroundVehicle> = serde_json::from_str(&content)?;
        Ok(self.load(vehicles))
    }

    /// Drop every vehicle. Returns how many were released.
    pub fn release(&self) -> usize {
        let mut map = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        let count = map.len();
        map.clear();
        info!(count, "Ground vehicles released");
        count
    }

    pub fn ids(&self) -> Vec<String> {
        self.vehicles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.vehicles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<GroundVehicle> {
        self.vehicles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn assigned_ids(&self, auth_id: &str) -> Vec<String> {
        self.vehicles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|v| v.assigned_user.as_deref() == Some(auth_id))
            .map(|v| v.id.clone())
            .collect()
    }

    /// Assign a vehicle to a user if it exists and is unassigned.
    pub fn assign(&self, auth_id: &str, id: &str) -> bool {
        let mut map = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        match map.get_mut(id) {
            Some(vehicle) if vehicle.assigned_user.is_none() => {
                vehicle.assigned_user = Some(auth_id.to_string());
                debug!(vehicle = id, auth_id, "Ground vehicle assigned");
                true
            }
            Some(vehicle) => vehicle.assigned_user.as_deref() == Some(auth_id),
            None => false,
        }
    }

    /// Snapshot a vehicle for a client, recording the selecting session.
    pub fn select(&self, session_id: SessionId, id: &str) -> Option<GroundVehicle> {
        let mut map = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        let vehicle = map.get_mut(id)?;
        vehicle.owner_session_id = session_id;
        Some(vehicle.clone())
    }

    fn permits(caller: &CallerIdentity, vehicle: &GroundVehicle) -> bool {
        caller.permission.satisfies(PermissionLevel::SimulationAdmin)
            || vehicle.assigned_user.as_deref() == Some(caller.auth_id.as_str())
    }

    /// Apply a client proposal.
    ///
    /// A named field copies that field from the proposal; an empty field
    /// name applies the proposal's pending plan edit.
    pub fn synchronize(&self, caller: &CallerIdentity, proposal: &GroundVehicle, field: &str) -> i32 {
        let mut map = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        let Some(vehicle) = map.get_mut(&proposal.id) else {
            return status::UNKNOWN_VEHICLE;
        };
        if vehicle.is_external {
            return status::EXTERNAL_VEHICLE;
        }
        if !Self::permits(caller, vehicle) {
            warn!(vehicle = %proposal.id, auth_id = %caller.auth_id, "Synchronization not permitted");
            return status::NOT_PERMITTED;
        }

        if field.is_empty() {
            let applied = proposal
                .pending_edit
                .as_ref()
                .map(|edit| vehicle.apply_plan_edit(edit))
                .unwrap_or(false);
            return if applied {
                status::ACCEPTED
            } else {
                status::INVALID_FIELD
            };
        }

        match field.parse::<VehicleField>() {
            Ok(field) => {
                field.set(vehicle, field.get(proposal));
                status::ACCEPTED
            }
            Err(e) => {
                debug!(vehicle = %proposal.id, error = %e, "Rejected synchronization");
                status::INVALID_FIELD
            }
        }
    }

    /// Register an externally driven vehicle.
    pub fn create_external(&self, profile: ExternalProfile) -> i32 {
        let mut map = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        if map.get(&profile.id).is_some_and(|v| !v.is_external) {
            return status::INVALID_FIELD;
        }
        let mut vehicle = GroundVehicle::new(profile.id.clone());
        vehicle.is_external = true;
        vehicle.aircraft_id = profile.aircraft_id;
        vehicle.location_id = profile.location_id;
        vehicle.latitude = profile.latitude;
        vehicle.longitude = profile.longitude;
        vehicle.speed = profile.speed;
        vehicle.course = profile.course;
        map.insert(profile.id, vehicle);
        status::ACCEPTED
    }

    /// Overwrite the live state of an external vehicle.
    pub fn inject_external(&self, sample: ExternalState) -> i32 {
        let mut map = self.vehicles.write().unwrap_or_else(PoisonError::into_inner);
        let Some(vehicle) = map.get_mut(&sample.id) else {
            return status::UNKNOWN_VEHICLE;
        };
        if !vehicle.is_external {
            return status::INVALID_FIELD;
        }
        if sample.aircraft_id.is_some() {
            vehicle.aircraft_id = sample.aircraft_id;
        }
        vehicle.latitude = sample.latitude;
        vehicle.longitude = sample.longitude;
        vehicle.speed = sample.speed;
        vehicle.course = sample.course;
        status::ACCEPTED
    }
}
