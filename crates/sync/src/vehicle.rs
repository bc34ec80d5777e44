//! Ground vehicle data model shared by client mirrors and the server store.

use serde::{Deserialize, Serialize};
use simlink_core::{SessionId, NO_SESSION};
use std::fmt;
use std::str::FromStr;

/// One drive-plan waypoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanPoint {
    pub latitude: f32,
    pub longitude: f32,
    #[serde(default)]
    pub waypoint_name: String,
}

impl PlanPoint {
    pub fn new(latitude: f32, longitude: f32, waypoint_name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            waypoint_name: waypoint_name.into(),
        }
    }

    pub fn coordinate(&self, axis: PlanAxis) -> f32 {
        match axis {
            PlanAxis::Latitude => self.latitude,
            PlanAxis::Longitude => self.longitude,
        }
    }

    /// Move one coordinate, clearing the waypoint name if the value changes.
    pub fn set_coordinate(&mut self, axis: PlanAxis, value: f32) {
        if self.coordinate(axis) != value {
            self.waypoint_name.clear();
        }
        match axis {
            PlanAxis::Latitude => self.latitude = value,
            PlanAxis::Longitude => self.longitude = value,
        }
    }
}

/// Which plan coordinate an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAxis {
    Latitude,
    Longitude,
}

/// A plan edit staged on a proposal while it is being synchronized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanEdit {
    pub axis: PlanAxis,
    pub index: usize,
    pub value: f32,
}

/// Live-state fields a client may set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleField {
    Latitude,
    Longitude,
    Speed,
    Course,
}

impl VehicleField {
    /// Field name sent to the owner
    pub fn name(self) -> &'static str {
        match self {
            VehicleField::Latitude => "latitude",
            VehicleField::Longitude => "longitude",
            VehicleField::Speed => "speed",
            VehicleField::Course => "course",
        }
    }

    pub fn get(self, vehicle: &GroundVehicle) -> f32 {
        match self {
            VehicleField::Latitude => vehicle.latitude,
            VehicleField::Longitude => vehicle.longitude,
            VehicleField::Speed => vehicle.speed,
            VehicleField::Course => vehicle.course,
        }
    }

    pub fn set(self, vehicle: &mut GroundVehicle, value: f32) {
        match self {
            VehicleField::Latitude => vehicle.latitude = value,
            VehicleField::Longitude => vehicle.longitude = value,
            VehicleField::Speed => vehicle.speed = value,
            VehicleField::Course => vehicle.course = value,
        }
    }
}

impl fmt::Display for VehicleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VehicleField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latitude" => Ok(VehicleField::Latitude),
            "longitude" => Ok(VehicleField::Longitude),
            "speed" => Ok(VehicleField::Speed),
            "course" => Ok(VehicleField::Course),
            other => Err(format!("unknown ground vehicle field '{}'", other)),
        }
    }
}

/// Snapshot of one ground vehicle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundVehicle {
    pub id: String,
    /// Session that selected this vehicle, 0 if none
    #[serde(default = "no_session")]
    pub owner_session_id: SessionId,
    /// Aircraft the vehicle is serving
    #[serde(default)]
    pub aircraft_id: Option<String>,
    /// Airport the vehicle operates at
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub assigned_user: Option<String>,
    #[serde(default)]
    pub is_external: bool,

    #[serde(default)]
    pub latitude: f32,
    #[serde(default)]
    pub longitude: f32,
    #[serde(default)]
    pub altitude: f32,
    #[serde(default)]
    pub speed: f32,
    #[serde(default)]
    pub course: f32,

    #[serde(default)]
    pub departure_time: f32,
    #[serde(default)]
    pub plan: Vec<PlanPoint>,

    #[serde(default)]
    pub target_waypoint_index: i32,
    #[serde(default)]
    pub target_waypoint_name: Option<String>,
    #[serde(default)]
    pub target_waypoint_latitude: f32,
    #[serde(default)]
    pub target_waypoint_longitude: f32,

    #[serde(default)]
    pub pending_edit: Option<PlanEdit>,
}

fn no_session() -> SessionId {
    NO_SESSION
}

impl GroundVehicle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, plan: Vec<PlanPoint>) -> Self {
        self.plan = plan;
        self
    }

    pub fn plan_length(&self) -> usize {
        self.plan.len()
    }

    pub fn plan_latitudes(&self) -> Vec<f32> {
        self.plan.iter().map(|p| p.latitude).collect()
    }

    pub fn plan_longitudes(&self) -> Vec<f32> {
        self.plan.iter().map(|p| p.longitude).collect()
    }

    pub fn plan_waypoint_names(&self) -> Vec<String> {
        self.plan.iter().map(|p| p.waypoint_name.clone()).collect()
    }

    /// Apply a plan edit. Returns false when the index is out of range.
    pub fn apply_plan_edit(&mut self, edit: &PlanEdit) -> bool {
        match self.plan.get_mut(edit.index) {
            Some(point) => {
                point.set_coordinate(edit.axis, edit.value);
                true
            }
            None => false,
        }
    }
}
