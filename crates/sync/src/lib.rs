//! Write-through synchronization of client-held entity mirrors.
//!
//! The server owns every ground vehicle ([`VehicleStore`]). A client holds a
//! [`GroundVehicleMirror`] whose setters propose the change to the owner and
//! only commit it locally once the owner accepts. Getters never leave the
//! process.

pub mod error;
pub mod mirror;
pub mod owner;
pub mod store;
pub mod vehicle;

pub use error::{StoreError, SyncError};
pub use mirror::{GroundVehicleMirror, SyncOutcome};
pub use owner::{EntityOwner, RemoteEntityOwner, SYNCHRONIZE_METHOD};
pub use store::{status, ExternalProfile, ExternalState, VehicleStore};
pub use vehicle::{GroundVehicle, PlanAxis, PlanEdit, PlanPoint, VehicleField};
