//! Orchestrator configuration

use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use simlink_core::SESSION_PORT;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the child's stdout and stderr reach the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Child writes straight to the parent's streams
    Inherit,
    /// Lines are read by background tasks and forwarded to the log
    Drain,
}

impl Default for OutputMode {
    fn default() -> Self {
        if cfg!(windows) {
            OutputMode::Drain
        } else {
            OutputMode::Inherit
        }
    }
}

/// Program and fixed arguments used to start the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LaunchCommand {
    fn default() -> Self {
        let program = if cfg!(windows) { "run.bat" } else { "./run" };
        Self {
            program: PathBuf::from(program),
            args: Vec::new(),
        }
    }
}

impl LaunchCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub launch: LaunchCommand,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Address probed for readiness
    #[serde(default = "default_probe_address")]
    pub probe_address: SocketAddr,
    /// Delay between spawning and the first probe
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Bound on the whole readiness wait
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// How long `stop` waits for the child to exit before killing it
    #[serde(default = "default_exit_wait_ms")]
    pub exit_wait_ms: u64,
    #[serde(default)]
    pub output: OutputMode,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_probe_address() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, SESSION_PORT))
}

fn default_grace_ms() -> u64 {
    1_000
}

fn default_interval_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_exit_wait_ms() -> u64 {
    5_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            launch: LaunchCommand::default(),
            working_dir: default_working_dir(),
            probe_address: default_probe_address(),
            grace_ms: default_grace_ms(),
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            exit_wait_ms: default_exit_wait_ms(),
            output: OutputMode::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OrchestratorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrchestratorError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| OrchestratorError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the readiness wait meaningless.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.interval_ms == 0 {
            return Err(OrchestratorError::Config(
                "interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.timeout_ms < self.interval_ms {
            return Err(OrchestratorError::Config(format!(
                "timeout_ms ({}) is shorter than interval_ms ({})",
                self.timeout_ms, self.interval_ms
            )));
        }
        Ok(())
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn exit_wait(&self) -> Duration {
        Duration::from_millis(self.exit_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_probe_the_session_port() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.probe_address.port(), SESSION_PORT);
        assert!(config.probe_address.ip().is_loopback());
        assert_eq!(config.interval(), Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.grace(), Duration::from_secs(1));
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: OrchestratorConfig = toml::from_str(
            r#"
            working_dir = "/opt/simlink"
            output = "drain"

            [launch]
            program = "bin/node"
            args = ["2020", "log=debug"]
            "#,
        )
        .unwrap();
        assert_eq!(config.working_dir, PathBuf::from("/opt/simlink"));
        assert_eq!(config.output, OutputMode::Drain);
        assert_eq!(config.launch.args, vec!["2020", "log=debug"]);
        assert_eq!(config.timeout_ms, 60_000);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = OrchestratorConfig {
            interval_ms: 0,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_toml() {
        let path = std::env::temp_dir().join(format!(
            "simlink-orchestrator-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "interval_ms = 250\ntimeout_ms = 1000\n").unwrap();
        let config = OrchestratorConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.launch, LaunchCommand::default());
    }
}
