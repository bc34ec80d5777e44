//! Fixtures for end-to-end tests over loopback TCP

use simlink_core::{ClientConfig, DeploymentMode, NodeConfig};
use simlink_server::{ServerNode, UnsupportedBackend};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const USERS: &str = "\
# integration users
[Administrator]
admin
[Simulation_Admin]
sim1
[Normal_User]
user1:{AC_1},{GV_1}
user2
";

pub const VEHICLES: &str = r#"[
  {
    "id": "GV_1",
    "aircraft_id": "AC_1",
    "location_id": "KDFW",
    "latitude": 32.89,
    "longitude": -97.04,
    "speed": 5.0,
    "course": 90.0,
    "plan": [
      { "latitude": 32.890, "longitude": -97.040, "waypoint_name": "RAMP_A" },
      { "latitude": 32.895, "longitude": -97.041, "waypoint_name": "TWY_B" },
      { "latitude": 32.900, "longitude": -97.042, "waypoint_name": "GATE_C" }
    ]
  },
  { "id": "GV_2", "location_id": "KDFW" }
]"#;

/// Per-process path under the system temp directory
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("simlink-it-{}-{}", std::process::id(), name))
}

pub fn write_fixture(name: &str, content: &str) -> PathBuf {
    let path = temp_path(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn loopback() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Node config bound to loopback on ephemeral ports
pub fn node_config(mode: DeploymentMode, user_file: Option<PathBuf>) -> NodeConfig {
    let mut config = NodeConfig::for_mode(mode);
    config.bind_address = loopback();
    config.rpc_port = Some(0);
    config.session_port = 0;
    config.route_probe = SocketAddr::new(loopback(), 9);
    config.keepalive_interval_ms = 100;
    if let Some(path) = user_file {
        config.user_file = path;
    }
    config
}

pub async fn start_server_node(name: &str) -> ServerNode {
    let users = write_fixture(&format!("{}-users.conf", name), USERS);
    let config = node_config(DeploymentMode::Server, Some(users));
    ServerNode::start(&config, Arc::new(UnsupportedBackend))
        .await
        .unwrap()
}

pub async fn start_standalone_node() -> ServerNode {
    let config = node_config(DeploymentMode::Standalone, None);
    ServerNode::start(&config, Arc::new(UnsupportedBackend))
        .await
        .unwrap()
}

/// Client settings pointing at a running node
pub fn client_config(node: &ServerNode) -> ClientConfig {
    ClientConfig {
        server_address: loopback().to_string(),
        rpc_port: node.registry().port(),
        session_port: node.session_addr().map(|a| a.port()).unwrap_or(0),
        call_timeout_ms: 2_000,
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
