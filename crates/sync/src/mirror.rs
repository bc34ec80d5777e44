//! Client-held ground vehicle mirror with write-through setters.

use crate::error::SyncError;
use crate::owner::EntityOwner;
use crate::vehicle::{GroundVehicle, PlanAxis, PlanEdit, PlanPoint, VehicleField};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one synchronization attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Owner accepted; the mirror committed the change
    Accepted,
    /// Owner refused with a nonzero status; the mirror is unchanged
    Rejected { status: i32 },
    /// The owner could not be reached; the mirror is unchanged
    Failed { reason: String },
}

impl SyncOutcome {
    fn from_status(status: i32) -> Self {
        if status == 0 {
            SyncOutcome::Accepted
        } else {
            SyncOutcome::Rejected { status }
        }
    }

    /// Integer status: 0 accepted, the owner's code on rejection, -1 on failure
    pub fn status(&self) -> i32 {
        match self {
            SyncOutcome::Accepted => 0,
            SyncOutcome::Rejected { status } => *status,
            SyncOutcome::Failed { .. } => -1,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SyncOutcome::Accepted)
    }
}

/// Local copy of a server-owned ground vehicle.
///
/// Setters take `&mut self`, so edits to one mirror are serialized by the
/// borrow checker.
pub struct GroundVehicleMirror {
    state: GroundVehicle,
    owner: Arc<dyn EntityOwner>,
}

impl std::fmt::Debug for GroundVehicleMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundVehicleMirror")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl GroundVehicleMirror {
    pub fn new(state: GroundVehicle, owner: Arc<dyn EntityOwner>) -> Self {
        Self { state, owner }
    }

    pub fn state(&self) -> &GroundVehicle {
        &self.state
    }

    pub fn into_state(self) -> GroundVehicle {
        self.state
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn is_external(&self) -> bool {
        self.state.is_external
    }

    pub fn latitude(&self) -> f32 {
        self.state.latitude
    }

    pub fn longitude(&self) -> f32 {
        self.state.longitude
    }

    pub fn altitude(&self) -> f32 {
        self.state.altitude
    }

    pub fn speed(&self) -> f32 {
        self.state.speed
    }

    pub fn course(&self) -> f32 {
        self.state.course
    }

    pub fn plan(&self) -> &[PlanPoint] {
        &self.state.plan
    }

    pub fn plan_length(&self) -> usize {
        self.state.plan_length()
    }

    pub fn pending_edit(&self) -> Option<&PlanEdit> {
        self.state.pending_edit.as_ref()
    }

    fn ensure_internal(&self) -> Result<(), SyncError> {
        if self.state.is_external {
            return Err(SyncError::ExternalEntity(self.state.id.clone()));
        }
        Ok(())
    }

    async fn propose(&self, proposal: &GroundVehicle, field: &str) -> SyncOutcome {
        match self
            .owner
            .synchronize_entity_to_server(proposal, field)
            .await
        {
            Ok(status) => SyncOutcome::from_status(status),
            Err(e) => {
                warn!(vehicle = %self.state.id, field, error = %e, "Ground vehicle synchronization failed");
                SyncOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Propose a new value for a live-state field and commit it on acceptance.
    pub async fn set_field(
        &mut self,
        field: VehicleField,
        value: f32,
    ) -> Result<SyncOutcome, SyncError> {
        self.ensure_internal()?;

        let mut proposal = self.state.clone();
        field.set(&mut proposal, value);

        let outcome = self.propose(&proposal, field.name()).await;
        if outcome.is_accepted() {
            field.set(&mut self.state, value);
        }
        debug!(vehicle = %self.state.id, %field, status = outcome.status(), "Field synchronized");
        Ok(outcome)
    }

    pub async fn set_latitude(&mut self, value: f32) -> Result<SyncOutcome, SyncError> {
        self.set_field(VehicleField::Latitude, value).await
    }

    pub async fn set_longitude(&mut self, value: f32) -> Result<SyncOutcome, SyncError> {
        self.set_field(VehicleField::Longitude, value).await
    }

    pub async fn set_speed(&mut self, value: f32) -> Result<SyncOutcome, SyncError> {
        self.set_field(VehicleField::Speed, value).await
    }

    pub async fn set_course(&mut self, value: f32) -> Result<SyncOutcome, SyncError> {
        self.set_field(VehicleField::Course, value).await
    }

    /// Propose moving one drive-plan coordinate.
    ///
    /// The edit is staged on the mirror while the owner decides and cleared
    /// afterwards whatever the outcome. On acceptance the waypoint name at
    /// `index` is cleared if the coordinate actually changed.
    pub async fn set_plan_point(
        &mut self,
        axis: PlanAxis,
        index: i64,
        value: f32,
    ) -> Result<SyncOutcome, SyncError> {
        let plan_length = self.state.plan_length();
        let index = usize::try_from(index)
            .ok()
            .filter(|i| *i < plan_length)
            .ok_or(SyncError::InvalidPlanIndex { index, plan_length })?;
        self.ensure_internal()?;

        let edit = PlanEdit { axis, index, value };
        self.state.pending_edit = Some(edit);
        let proposal = self.state.clone();

        let outcome = self.propose(&proposal, "").await;
        if outcome.is_accepted() {
            self.state.apply_plan_edit(&edit);
        }
        self.state.pending_edit = None;

        debug!(vehicle = %self.state.id, ?axis, index, status = outcome.status(), "Plan point synchronized");
        Ok(outcome)
    }

    pub async fn set_plan_latitude(
        &mut self,
        index: i64,
        value: f32,
    ) -> Result<SyncOutcome, SyncError> {
        self.set_plan_point(PlanAxis::Latitude, index, value).await
    }

    pub async fn set_plan_longitude(
        &mut self,
        index: i64,
        value: f32,
    ) -> Result<SyncOutcome, SyncError> {
        self.set_plan_point(PlanAxis::Longitude, index, value).await
    }
}
