//! Late-bound client module contract used by the standalone orchestrator.

use crate::error::ClientError;
use crate::facade::{
    EntityInterface, EnvironmentInterface, EquipmentInterface, RiskMeasuresInterface,
    SimulationInterface,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Capability surface of a connected client
#[async_trait]
pub trait ClientModule: Send + Sync {
    fn entity_interface(&self) -> Result<EntityInterface, ClientError>;

    fn simulation_interface(&self) -> Result<SimulationInterface, ClientError>;

    fn equipment_interface(&self) -> Result<EquipmentInterface, ClientError>;

    fn environment_interface(&self) -> Result<EnvironmentInterface, ClientError>;

    fn risk_measures_interface(&self) -> Result<RiskMeasuresInterface, ClientError>;

    /// Ask the co-located server to shut down. Standalone only.
    async fn stop_standalone_server(&self) -> Result<(), ClientError>;

    /// Server information snapshot
    async fn info(&self) -> Result<Value, ClientError>;
}

/// Produces the process-wide client module once the server is ready
#[async_trait]
pub trait ClientModuleFactory: Send + Sync {
    /// Return the singleton module, creating it on first use.
    async fn instance(&self) -> Result<Arc<dyn ClientModule>, ClientError>;
}
