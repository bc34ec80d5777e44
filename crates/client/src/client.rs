//! Connected client and its process-wide factory.

use crate::error::ClientError;
use crate::facade::{
    EntityInterface, EnvironmentInterface, EquipmentInterface, RiskMeasuresInterface,
    SimulationInterface, ENTITY_NAME, ENVIRONMENT_NAME, EQUIPMENT_NAME, RISK_MEASURES_NAME,
    SIMULATION_NAME,
};
use crate::module::{ClientModule, ClientModuleFactory};
use async_trait::async_trait;
use serde_json::{json, Value};
use simlink_core::{ClientConfig, DeploymentMode, SessionId};
use simlink_registry::{EndpointName, RemoteHandle};
use simlink_session::{ClientSession, PermissionLevel, SessionChannel};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// A client attached to one node
pub struct SimClient {
    mode: DeploymentMode,
    session: Arc<ClientSession>,
    channel: Option<SessionChannel>,
    core: RemoteHandle,
}

impl std::fmt::Debug for SimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimClient")
            .field("mode", &self.mode)
            .field("core", self.core.endpoint())
            .field("session_id", &self.session.session_id())
            .finish()
    }
}

impl SimClient {
    /// Attach to the node described by `config`.
    ///
    /// In server mode this also opens the session channel and waits for the
    /// node to assign a session id. Standalone clients never get one.
    pub async fn connect(mode: DeploymentMode, config: ClientConfig) -> Result<Self, ClientError> {
        let session = Arc::new(ClientSession::new());
        let core = RemoteHandle::new(
            EndpointName::core(config.server_address.clone(), config.rpc_port),
            config.call_timeout(),
            Arc::clone(&session),
        );

        let channel = match mode {
            DeploymentMode::Standalone => None,
            DeploymentMode::Server => {
                let addr = resolve(&config.server_address, config.session_port).await?;
                let channel = SessionChannel::connect(addr, Arc::clone(&session)).await?;
                let id = session
                    .wait_for_id(config.call_timeout())
                    .await
                    .ok_or_else(|| ClientError::NoSession(addr.to_string()))?;
                info!(session_id = id, %addr, "Session established");
                Some(channel)
            }
        };

        info!(%mode, endpoint = %core.endpoint(), "Client attached");
        Ok(Self {
            mode,
            session,
            channel,
            core,
        })
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn session_id(&self) -> SessionId {
        self.session.session_id()
    }

    /// Identity the node last reported for this session
    pub fn auth_id(&self) -> Option<String> {
        self.session.auth_id()
    }

    /// Whether the node reported that this session's connection is busy
    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    /// Bind this session to a user. Server mode only.
    pub async fn login(&self, auth_id: &str) -> Result<PermissionLevel, ClientError> {
        self.require_mode(DeploymentMode::Server, "login")?;
        let level = self
            .core
            .call_typed("login", &json!({ "auth_id": auth_id }))
            .await?;
        info!(auth_id, ?level, "Logged in");
        Ok(level)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.require_mode(DeploymentMode::Server, "logout")?;
        self.core.call("logout", Value::Null).await?;
        Ok(())
    }

    pub async fn server_process_id(&self) -> Result<u32, ClientError> {
        Ok(self
            .core
            .call_typed("get_server_process_id", &Value::Null)
            .await?)
    }

    /// Close the session channel. The node closes the session when it sees EOF.
    pub fn disconnect(&self) {
        if let Some(channel) = &self.channel {
            channel.close();
        }
    }

    fn require_mode(&self, mode: DeploymentMode, operation: &'static str) -> Result<(), ClientError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(ClientError::WrongMode {
                operation,
                mode: self.mode,
            })
        }
    }

    fn object(&self, name: &str) -> Result<RemoteHandle, ClientError> {
        Ok(self.core.sibling(name)?)
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ClientError> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ClientError::Resolve(format!("{}: {}", host, e)))?
        .next()
        .ok_or_else(|| ClientError::Resolve(host.to_string()))
}

#[async_trait]
impl ClientModule for SimClient {
    fn entity_interface(&self) -> Result<EntityInterface, ClientError> {
        Ok(EntityInterface::new(self.object(ENTITY_NAME)?))
    }

    fn simulation_interface(&self) -> Result<SimulationInterface, ClientError> {
        Ok(SimulationInterface::new(self.object(SIMULATION_NAME)?))
    }

    fn equipment_interface(&self) -> Result<EquipmentInterface, ClientError> {
        Ok(EquipmentInterface::new(self.object(EQUIPMENT_NAME)?))
    }

    fn environment_interface(&self) -> Result<EnvironmentInterface, ClientError> {
        Ok(EnvironmentInterface::new(self.object(ENVIRONMENT_NAME)?))
    }

    fn risk_measures_interface(&self) -> Result<RiskMeasuresInterface, ClientError> {
        Ok(RiskMeasuresInterface::new(self.object(RISK_MEASURES_NAME)?))
    }

    async fn stop_standalone_server(&self) -> Result<(), ClientError> {
        self.require_mode(DeploymentMode::Standalone, "stop_standalone_server")?;
        let pid = self.server_process_id().await?;
        info!(pid, "Stopping standalone server");
        self.core.call("shutdown", Value::Null).await?;
        Ok(())
    }

    async fn info(&self) -> Result<Value, ClientError> {
        Ok(self.core.call("info", Value::Null).await?)
    }
}

impl Drop for SimClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Creates the single [`SimClient`] of this process on first use
pub struct SimClientFactory {
    mode: DeploymentMode,
    config: ClientConfig,
    instance: OnceCell<Arc<SimClient>>,
}

impl SimClientFactory {
    pub fn new(mode: DeploymentMode, config: ClientConfig) -> Self {
        Self {
            mode,
            config,
            instance: OnceCell::new(),
        }
    }

    /// Factory for a client of a co-located standalone server
    pub fn standalone() -> Self {
        Self::new(DeploymentMode::Standalone, ClientConfig::standalone())
    }

    pub async fn client(&self) -> Result<Arc<SimClient>, ClientError> {
        self.instance
            .get_or_try_init(|| async {
                SimClient::connect(self.mode, self.config.clone())
                    .await
                    .map(Arc::new)
                    .inspect_err(|e| warn!(error = %e, "Client connection failed"))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl ClientModuleFactory for SimClientFactory {
    async fn instance(&self) -> Result<Arc<dyn ClientModule>, ClientError> {
        let client = self.client().await?;
        Ok(client as Arc<dyn ClientModule>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlink_registry::{
        bootstrap, BootstrapConfig, CallContext, CoreBinding, RegistryHandle, RemoteError,
        RemoteObject,
    };
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCore {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteObject for RecordingCore {
        async fn invoke(
            &self,
            _ctx: &CallContext,
            method: &str,
            _args: Value,
        ) -> Result<Value, RemoteError> {
            self.calls.lock().unwrap().push(method.to_string());
            match method {
                "get_server_process_id" => Ok(json!(4242)),
                "shutdown" => Ok(json!(true)),
                "info" => Ok(json!({ "name": "test" })),
                other => Err(RemoteError::unknown_method(other)),
            }
        }
    }

    struct Echo;

    #[async_trait]
    impl RemoteObject for Echo {
        async fn invoke(
            &self,
            _ctx: &CallContext,
            method: &str,
            args: Value,
        ) -> Result<Value, RemoteError> {
            Ok(json!({ "method": method, "args": args }))
        }
    }

    async fn start_node(core: Arc<RecordingCore>) -> RegistryHandle {
        let config = BootstrapConfig {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            route_probe: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9),
        };
        bootstrap(
            &config,
            CoreBinding::new(core),
            vec![("Entity".to_string(), Arc::new(Echo) as Arc<dyn RemoteObject>)],
        )
        .await
        .unwrap()
    }

    fn standalone_config(port: u16) -> ClientConfig {
        ClientConfig {
            rpc_port: port,
            ..ClientConfig::standalone()
        }
    }

    #[tokio::test]
    async fn stop_standalone_server_asks_for_pid_then_shutdown() {
        let core = Arc::new(RecordingCore::default());
        let node = start_node(core.clone()).await;

        let client = SimClient::connect(DeploymentMode::Standalone, standalone_config(node.port()))
            .await
            .unwrap();
        assert_eq!(client.session_id(), simlink_core::NO_SESSION);
        client.stop_standalone_server().await.unwrap();

        assert_eq!(
            *core.calls.lock().unwrap(),
            vec!["get_server_process_id".to_string(), "shutdown".to_string()]
        );
    }

    #[tokio::test]
    async fn login_is_refused_in_standalone_mode() {
        let core = Arc::new(RecordingCore::default());
        let node = start_node(core.clone()).await;
        let client = SimClient::connect(DeploymentMode::Standalone, standalone_config(node.port()))
            .await
            .unwrap();

        let err = client.login("user1").await.unwrap_err();
        assert!(matches!(err, ClientError::WrongMode { operation: "login", .. }));
        assert!(core.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn facades_target_sibling_exports() {
        let node = start_node(Arc::new(RecordingCore::default())).await;
        let client = SimClient::connect(DeploymentMode::Standalone, standalone_config(node.port()))
            .await
            .unwrap();

        let entity = client.entity_interface().unwrap();
        let reply = entity.call("aircraft_ids", json!([1])).await.unwrap();
        assert_eq!(reply["method"], "aircraft_ids");

        // Nothing is exported as RiskMeasures on this node.
        let risk = client.risk_measures_interface().unwrap();
        let err = risk.call("conflicts", Value::Null).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Remote(ref e) if e.kind == simlink_registry::RemoteErrorKind::NotFound
        ));
    }

    #[tokio::test]
    async fn factory_hands_out_one_instance() {
        let node = start_node(Arc::new(RecordingCore::default())).await;
        let factory = SimClientFactory::new(DeploymentMode::Standalone, standalone_config(node.port()));

        let first = factory.client().await.unwrap();
        let second = factory.client().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let module = factory.instance().await.unwrap();
        assert_eq!(module.info().await.unwrap()["name"], "test");
    }

    #[tokio::test]
    async fn server_mode_without_handshake_listener_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig {
            server_address: "127.0.0.1".to_string(),
            rpc_port: port,
            session_port: port,
            call_timeout_ms: 200,
        };
        let err = SimClient::connect(DeploymentMode::Server, config)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Session(_)));
    }
}
