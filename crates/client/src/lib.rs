//! Client side of a Simlink deployment.
//!
//! [`SimClient`] connects to a node's registry, learns its session id in
//! network mode, and hands out typed capability facades. The standalone
//! orchestrator binds to it late through [`ClientModuleFactory`].

pub mod client;
pub mod error;
pub mod facade;
pub mod module;

pub use client::{SimClient, SimClientFactory};
pub use error::ClientError;
pub use facade::{
    EntityInterface, EnvironmentInterface, EquipmentInterface, GroundVehicleInterface,
    RiskMeasuresInterface, SimulationInterface,
};
pub use module::{ClientModule, ClientModuleFactory};
