//! Registry bootstrap and the RPC accept loop.
//!
//! Bootstrap runs in a fixed order:
//!
//! 1. discover the advertised address
//! 2. bind the RPC listener
//! 3. stage every export (core under [`CORE_NAME`], auxiliaries by key)
//! 4. freeze the map and start accepting calls
//! 5. start the core object's listener loop
//!
//! Any failure before step 4 drops everything staged so far; nothing is ever
//! reachable from a half-populated registry.

use crate::endpoint::{validate_name, EndpointName, CORE_NAME};
use crate::error::{RegistryError, RemoteError};
use crate::object::{CallContext, CoreBinding, ListenerLoop, RemoteObject};
use crate::wire::{RpcRequest, RpcResponse};
use simlink_core::NodeConfig;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Step of bootstrap that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    /// Advertised address discovery
    AddressDiscovery,
    /// Binding the RPC listener
    Bind,
    /// Staging an export
    Export,
    /// Starting the core listener loop
    Listener,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BootstrapStage::AddressDiscovery => "address discovery",
            BootstrapStage::Bind => "listener bind",
            BootstrapStage::Export => "export",
            BootstrapStage::Listener => "core listener start",
        };
        f.write_str(text)
    }
}

/// Bootstrap failure naming the stage
#[derive(Debug, Error)]
#[error("registry bootstrap failed during {stage}: {reason}")]
pub struct BootstrapError {
    /// Failed stage
    pub stage: BootstrapStage,
    /// Underlying cause
    pub reason: String,
}

impl BootstrapError {
    fn new(stage: BootstrapStage, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Network parameters for bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Local address for the RPC listener
    pub bind_address: IpAddr,
    /// RPC port, 0 for an ephemeral port
    pub port: u16,
    /// Public address used only to learn the outbound interface
    pub route_probe: SocketAddr,
}

impl From<&NodeConfig> for BootstrapConfig {
    fn from(config: &NodeConfig) -> Self {
        Self {
            bind_address: config.bind_address,
            port: config.effective_rpc_port(),
            route_probe: config.route_probe,
        }
    }
}

/// Learn the address other hosts reach this node on.
///
/// Connecting a UDP socket sends nothing; it only selects the outbound
/// interface, whose address is then read back.
pub async fn discover_advertised_address(route_probe: SocketAddr) -> std::io::Result<IpAddr> {
    let unspecified = match route_probe {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0)).await?;
    socket.connect(route_probe).await?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no route to probe address",
        ));
    }
    Ok(ip)
}

/// Frozen map of exported objects
pub struct Registry {
    objects: HashMap<String, Arc<dyn RemoteObject>>,
}

impl Registry {
    /// Object exported under `name`, if any
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn RemoteObject>> {
        self.objects.get(name).cloned()
    }

    /// Exported names, unordered
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Number of exported objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing is exported
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Route one request to its object
    pub async fn dispatch(&self, request: RpcRequest, peer: Option<SocketAddr>) -> RpcResponse {
        let endpoint: EndpointName = match request.endpoint.parse() {
            Ok(endpoint) => endpoint,
            Err(e) => return RpcResponse::Err(RemoteError::invalid_args(e.to_string())),
        };
        let Some(object) = self.resolve(endpoint.name()) else {
            return RpcResponse::Err(RemoteError::not_found(endpoint.name()));
        };

        let ctx = CallContext {
            session_id: request.session_id,
            peer,
        };
        debug!(
            endpoint = endpoint.name(),
            method = %request.method,
            session_id = ctx.session_id,
            "Dispatching call"
        );
        let result = object.invoke(&ctx, &request.method, request.args).await;
        if let Err(e) = &result {
            debug!(endpoint = endpoint.name(), method = %request.method, error = %e, "Call failed");
        }
        result.into()
    }
}

fn stage_exports(
    core: &CoreBinding,
    auxiliary: &[(String, Arc<dyn RemoteObject>)],
) -> Result<HashMap<String, Arc<dyn RemoteObject>>, RegistryError> {
    let mut staged: HashMap<String, Arc<dyn RemoteObject>> = HashMap::new();
    let entries = std::iter::once((CORE_NAME, &core.object))
        .chain(auxiliary.iter().map(|(name, object)| (name.as_str(), object)));

    for (name, object) in entries {
        validate_name(name)?;
        if staged.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        object
            .prepare_export()
            .map_err(|e| RegistryError::ExportRefused {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        staged.insert(name.to_string(), Arc::clone(object));
        debug!(name, "Export staged");
    }

    Ok(staged)
}

/// Running registry. Dropping the handle stops the accept loop.
pub struct RegistryHandle {
    advertised: IpAddr,
    local_addr: SocketAddr,
    registry: Arc<Registry>,
    accept_task: JoinHandle<()>,
    core_listener: Option<Arc<dyn ListenerLoop>>,
}

impl RegistryHandle {
    /// Address embedded in endpoint names
    pub fn advertised_address(&self) -> IpAddr {
        self.advertised
    }

    /// Socket the RPC listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Actually bound RPC port
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// The frozen export map
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Object exported under `name`
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn RemoteObject>> {
        self.registry.resolve(name)
    }

    /// Advertised endpoint of an exported object
    pub fn endpoint(&self, name: &str) -> Option<EndpointName> {
        self.registry
            .resolve(name)
            .and_then(|_| EndpointName::new(self.advertised.to_string(), self.port(), name).ok())
    }

    /// Advertised endpoints of every exported object
    pub fn endpoints(&self) -> Vec<EndpointName> {
        let mut names: Vec<&str> = self.registry.names().collect();
        names.sort_unstable();
        names
            .into_iter()
            .filter_map(|name| self.endpoint(name))
            .collect()
    }

    /// True once the accept loop has exited
    pub fn is_finished(&self) -> bool {
        self.accept_task.is_finished()
    }

    /// Stop accepting calls and stop the core listener loop
    pub fn shutdown(&self) {
        self.accept_task.abort();
        if let Some(listener) = &self.core_listener {
            listener.stop();
        }
    }
}

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Publish the core object and auxiliary objects.
pub async fn bootstrap(
    config: &BootstrapConfig,
    core: CoreBinding,
    auxiliary: Vec<(String, Arc<dyn RemoteObject>)>,
) -> Result<RegistryHandle, BootstrapError> {
    let fail = |stage: BootstrapStage, reason: &dyn fmt::Display| {
        let err = BootstrapError::new(stage, reason);
        error!(stage = %stage, reason = %err.reason, "Registry bootstrap failed");
        err
    };

    let advertised = discover_advertised_address(config.route_probe)
        .await
        .map_err(|e| fail(BootstrapStage::AddressDiscovery, &e))?;
    info!(%advertised, "Advertised address discovered");

    let listener = TcpListener::bind(SocketAddr::new(config.bind_address, config.port))
        .await
        .map_err(|e| fail(BootstrapStage::Bind, &e))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| fail(BootstrapStage::Bind, &e))?;

    let objects = stage_exports(&core, &auxiliary).map_err(|e| fail(BootstrapStage::Export, &e))?;
    let registry = Arc::new(Registry { objects });

    let accept_task = tokio::spawn(accept_loop(listener, Arc::clone(&registry)));
    let handle = RegistryHandle {
        advertised,
        local_addr,
        registry,
        accept_task,
        core_listener: core.listener.clone(),
    };

    for endpoint in handle.endpoints() {
        info!(%endpoint, "Exported");
    }

    if let Some(listener) = &core.listener {
        if let Err(e) = listener.start(advertised).await {
            handle.accept_task.abort();
            return Err(fail(BootstrapStage::Listener, &e));
        }
    }

    Ok(handle)
}

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn accept_failed(e: &std::io::Error) {
    warn!(error = %e, "RPC accept failed");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

async fn accept_loop(listener: TcpListener, registry: Arc<Registry>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, peer, registry).await {
                        debug!(%peer, error = %e, "RPC connection ended with error");
                    }
                });
            }
            Err(e) => accept_failed(&e).await,
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<Registry>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => registry.dispatch(request, Some(peer)).await,
            Err(e) => RpcResponse::Err(RemoteError::transport(format!("malformed request: {}", e))),
        };

        let mut frame = serde_json::to_vec(&response)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }

    Ok(())
}
