//! Server capability objects for a Simlink node.
//!
//! The node exports:
//!
//! | Name | Object |
//! |---|---|
//! | `NATS` | [`CoreService`]: login, logout, info, process id, shutdown |
//! | `Simulation` | [`SimulationService`]: run control and status |
//! | `GroundVehicle` | [`GroundVehicleService`]: authoritative ground vehicles |
//! | `Entity`, `Equipment`, `Environment`, `RiskMeasures` | [`AlgorithmService`] forwarding to an [`AlgorithmBackend`] |
//!
//! Every operation resolves the caller through the node's
//! [`SessionManager`](simlink_session::SessionManager) and checks the
//! permission it needs before touching state.

pub mod algorithm;
pub mod core_service;
pub mod error;
pub mod ground_vehicle;
pub mod handshake;
pub mod node;
pub mod simulation;

pub use core_service::CoreService;
pub use algorithm::{AlgorithmBackend, AlgorithmService, UnsupportedBackend, ALGORITHM_GROUPS};
pub use error::ServerError;
pub use ground_vehicle::GroundVehicleService;
pub use handshake::HandshakeLoop;
pub use node::ServerNode;
pub use simulation::{SimulationService, SimulationStatus};

/// Export name of the simulation control object
pub const SIMULATION_NAME: &str = "Simulation";
/// Export name of the ground vehicle object
pub const GROUND_VEHICLE_NAME: &str = "GroundVehicle";
