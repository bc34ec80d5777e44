//! Configuration management for Simlink.
//!
//! The deployment mode is decided once by the entry point and carried in
//! these structs; nothing downstream consults ambient global state.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// RPC port used by a networked server node when none is given.
pub const DEFAULT_SERVER_RPC_PORT: u16 = 2017;
/// RPC port used by a standalone server node when none is given.
pub const DEFAULT_STANDALONE_RPC_PORT: u16 = 2020;
/// Session handshake port. Also the standalone readiness probe target.
pub const SESSION_PORT: u16 = 2019;

/// Environment variable the node entry point reads to pick its mode.
pub const MODE_ENV_VAR: &str = "SIMLINK_MODE";
/// Environment variable pointing at the client installation directory.
pub const CLIENT_HOME_ENV_VAR: &str = "SIMLINK_CLIENT_HOME";
/// Name of the two-line client connection file.
pub const CLIENT_CONFIG_FILE: &str = "simlink.config";

/// Deployment topology of a node or client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Networked multi-client server
    #[default]
    Server,
    /// Server runs as a child process co-located with its only client
    Standalone,
}

impl DeploymentMode {
    /// Read the mode from `SIMLINK_MODE`, defaulting to [`DeploymentMode::Server`].
    pub fn from_env() -> Result<Self> {
        match std::env::var(MODE_ENV_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::default()),
        }
    }

    /// RPC port selected when the startup arguments give none (or a negative one).
    pub fn default_rpc_port(self) -> u16 {
        match self {
            DeploymentMode::Server => DEFAULT_SERVER_RPC_PORT,
            DeploymentMode::Standalone => DEFAULT_STANDALONE_RPC_PORT,
        }
    }

    pub fn is_standalone(self) -> bool {
        self == DeploymentMode::Standalone
    }
}

impl std::str::FromStr for DeploymentMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" | "" => Ok(DeploymentMode::Server),
            "standalone" => Ok(DeploymentMode::Standalone),
            other => Err(CoreError::Config(format!(
                "unknown deployment mode '{}' (expected 'server' or 'standalone')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Server => write!(f, "server"),
            DeploymentMode::Standalone => write!(f, "standalone"),
        }
    }
}

/// Server node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub mode: DeploymentMode,
    /// Address the RPC and session listeners bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// RPC port; `None` selects the mode default
    #[serde(default)]
    pub rpc_port: Option<u16>,
    #[serde(default = "default_session_port")]
    pub session_port: u16,
    /// Public address the advertised-address probe "connects" to
    #[serde(default = "default_route_probe")]
    pub route_probe: SocketAddr,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Debug flag forwarded to the simulation engine (`-gdb`)
    #[serde(default)]
    pub debug: bool,
    /// Location of the user directory file; ignored in standalone mode
    #[serde(default = "default_user_file")]
    pub user_file: PathBuf,
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_session_port() -> u16 {
    SESSION_PORT
}

fn default_route_probe() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 10002)
}

fn default_user_file() -> PathBuf {
    PathBuf::from("share").join("user.conf")
}

fn default_keepalive_interval_ms() -> u64 {
    2000
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::for_mode(DeploymentMode::Server)
    }
}

impl NodeConfig {
    pub fn for_mode(mode: DeploymentMode) -> Self {
        Self {
            mode,
            bind_address: default_bind_address(),
            rpc_port: None,
            session_port: default_session_port(),
            route_probe: default_route_probe(),
            log_level: None,
            debug: false,
            user_file: default_user_file(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
        }
    }

    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            CoreError::Config(format!("unable to parse {}: {}", path.display(), e))
        })
    }

    /// RPC port after applying the mode default.
    pub fn effective_rpc_port(&self) -> u16 {
        self.rpc_port.unwrap_or_else(|| self.mode.default_rpc_port())
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }
}

/// Where a client finds the server RPC registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_address: String,
    pub rpc_port: u16,
    pub session_port: u16,
    /// Upper bound on a single remote call
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

impl ClientConfig {
    /// Loopback defaults for a client attached to a standalone child server.
    pub fn standalone() -> Self {
        Self {
            server_address: Ipv4Addr::LOCALHOST.to_string(),
            rpc_port: DEFAULT_STANDALONE_RPC_PORT,
            session_port: SESSION_PORT,
            call_timeout_ms: default_call_timeout_ms(),
        }
    }

    /// Parse the two-line connection file: server address, then RPC port.
    ///
    /// Blank lines are skipped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        let server_address = lines
            .next()
            .ok_or_else(|| CoreError::Config("missing server address line".to_string()))?
            .to_string();
        let port_line = lines
            .next()
            .ok_or_else(|| CoreError::Config("missing server port line".to_string()))?;
        let rpc_port = port_line
            .parse::<u16>()
            .map_err(|e| CoreError::Config(format!("invalid port '{}': {}", port_line, e)))?;

        Ok(Self {
            server_address,
            rpc_port,
            session_port: SESSION_PORT,
            call_timeout_ms: default_call_timeout_ms(),
        })
    }

    /// Read `<dir>/simlink.config`, falling back to
    /// `$SIMLINK_CLIENT_HOME/<dir>/simlink.config`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        match std::fs::read_to_string(dir.join(CLIENT_CONFIG_FILE)) {
            Ok(content) => Self::parse(&content),
            Err(first) => {
                let home = std::env::var(CLIENT_HOME_ENV_VAR).map_err(|_| {
                    CoreError::Config(format!(
                        "cannot read {} ({}) and {} is not set",
                        dir.join(CLIENT_CONFIG_FILE).display(),
                        first,
                        CLIENT_HOME_ENV_VAR
                    ))
                })?;
                let path = PathBuf::from(home).join(dir).join(CLIENT_CONFIG_FILE);
                let content = std::fs::read_to_string(&path)?;
                Self::parse(&content)
            }
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_default_ports() {
        assert_eq!(DeploymentMode::Server.default_rpc_port(), 2017);
        assert_eq!(DeploymentMode::Standalone.default_rpc_port(), 2020);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!(
            "Standalone".parse::<DeploymentMode>().unwrap(),
            DeploymentMode::Standalone
        );
        assert_eq!(
            "server".parse::<DeploymentMode>().unwrap(),
            DeploymentMode::Server
        );
        assert!("cluster".parse::<DeploymentMode>().is_err());
    }

    #[test]
    fn node_config_applies_mode_default_port() {
        let mut config = NodeConfig::for_mode(DeploymentMode::Standalone);
        assert_eq!(config.effective_rpc_port(), DEFAULT_STANDALONE_RPC_PORT);
        config.rpc_port = Some(4000);
        assert_eq!(config.effective_rpc_port(), 4000);
    }

    #[test]
    fn node_config_from_toml_uses_defaults() {
        let config: NodeConfig = toml::from_str("mode = \"standalone\"\ndebug = true\n").unwrap();
        assert_eq!(config.mode, DeploymentMode::Standalone);
        assert!(config.debug);
        assert_eq!(config.session_port, SESSION_PORT);
        assert_eq!(config.route_probe.port(), 10002);
    }

    #[test]
    fn client_config_parses_two_lines() {
        let config = ClientConfig::parse("\n  10.0.0.5 \n\n2017\n").unwrap();
        assert_eq!(config.server_address, "10.0.0.5");
        assert_eq!(config.rpc_port, 2017);
        assert_eq!(config.session_port, SESSION_PORT);
    }

    #[test]
    fn client_config_rejects_missing_port() {
        assert!(ClientConfig::parse("10.0.0.5\n").is_err());
        assert!(ClientConfig::parse("10.0.0.5\nabc\n").is_err());
    }
}
