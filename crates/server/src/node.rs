//! Assembly of a running server node.

use crate::algorithm::{AlgorithmBackend, AlgorithmService, ALGORITHM_GROUPS};
use crate::core_service::CoreService;
use crate::error::ServerError;
use crate::ground_vehicle::GroundVehicleService;
use crate::handshake::HandshakeLoop;
use crate::simulation::SimulationService;
use crate::{GROUND_VEHICLE_NAME, SIMULATION_NAME};
use simlink_core::NodeConfig;
use simlink_registry::{
    bootstrap, BootstrapConfig, CoreBinding, EndpointName, RegistryHandle, RemoteObject, CORE_NAME,
};
use simlink_session::{SessionManager, UserDirectory};
use simlink_sync::VehicleStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub struct ServerNode {
    registry: RegistryHandle,
    core: Arc<CoreService>,
    handshake: Arc<HandshakeLoop>,
    vehicles: Arc<VehicleStore>,
}

impl ServerNode {
    /// Build every capability object and publish them.
    ///
    /// Standalone nodes serve only the local administrator and skip the user
    /// directory.
    pub async fn start(
        config: &NodeConfig,
        backend: Arc<dyn AlgorithmBackend>,
    ) -> Result<Self, ServerError> {
        let users = if config.mode.is_standalone() {
            UserDirectory::default()
        } else {
            UserDirectory::load(&config.user_file)?
        };
        let sessions = Arc::new(SessionManager::new(config.mode, users));
        let vehicles = Arc::new(VehicleStore::new());

        let core = Arc::new(CoreService::new(Arc::clone(&sessions)));
        let handshake = Arc::new(HandshakeLoop::new(
            Arc::clone(&sessions),
            SocketAddr::new(config.bind_address, config.session_port),
            config.keepalive_interval(),
        ));

        let mut auxiliary: Vec<(String, Arc<dyn RemoteObject>)> = vec![
            (
                SIMULATION_NAME.to_string(),
                Arc::new(SimulationService::new(
                    Arc::clone(&sessions),
                    Arc::clone(&vehicles),
                )) as Arc<dyn RemoteObject>,
            ),
            (
                GROUND_VEHICLE_NAME.to_string(),
                Arc::new(GroundVehicleService::new(
                    Arc::clone(&sessions),
                    Arc::clone(&vehicles),
                )) as Arc<dyn RemoteObject>,
            ),
        ];
        for group in ALGORITHM_GROUPS {
            auxiliary.push((
                group.to_string(),
                Arc::new(AlgorithmService::new(
                    group,
                    Arc::clone(&sessions),
                    Arc::clone(&backend),
                )) as Arc<dyn RemoteObject>,
            ));
        }

        let binding = CoreBinding::new(core.clone()).with_listener(handshake.clone());
        let registry = bootstrap(&BootstrapConfig::from(config), binding, auxiliary).await?;
        info!(
            mode = %config.mode,
            rpc = %registry.local_addr(),
            exports = registry.registry().len(),
            "Server node running"
        );

        Ok(Self {
            registry,
            core,
            handshake,
            vehicles,
        })
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn core(&self) -> &Arc<CoreService> {
        &self.core
    }

    pub fn vehicles(&self) -> &Arc<VehicleStore> {
        &self.vehicles
    }

    /// Advertised endpoint of the core object
    pub fn core_endpoint(&self) -> Option<EndpointName> {
        self.registry.endpoint(CORE_NAME)
    }

    /// Bound session handshake address
    pub fn session_addr(&self) -> Option<SocketAddr> {
        self.handshake.local_addr()
    }

    pub async fn wait_for_shutdown(&self) {
        self.core.wait_for_shutdown().await;
    }

    /// Stop accepting calls and session connections.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}
