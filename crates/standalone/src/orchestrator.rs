//! Child server lifecycle and late binding of the client module.

use crate::config::{OrchestratorConfig, OutputMode};
use crate::drain::spawn_drain;
use crate::error::OrchestratorError;
use crate::probe::{wait_until_ready, ReadinessProbe, TcpProbe};
use serde_json::Value;
use simlink_client::{
    ClientError, ClientModule, ClientModuleFactory, EntityInterface, EnvironmentInterface,
    EquipmentInterface, RiskMeasuresInterface, SimulationInterface,
};
use simlink_core::banner::{failure_banner, version_text};
use simlink_core::DeploymentMode;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Argument that prints the version banner instead of launching
pub const VERSION_FLAG: &str = "-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Spawning,
    WaitingForReady,
    Ready,
    Stopped,
    Failed,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Spawning => "spawning",
            OrchestratorState::WaitingForReady => "waiting for ready",
            OrchestratorState::Ready => "ready",
            OrchestratorState::Stopped => "stopped",
            OrchestratorState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs the server as a child process of its only client
pub struct StandaloneOrchestrator {
    config: OrchestratorConfig,
    factory: Option<Arc<dyn ClientModuleFactory>>,
    probe: Arc<dyn ReadinessProbe>,
    state: OrchestratorState,
    child: Option<Child>,
    drains: Vec<JoinHandle<()>>,
    module: Option<Arc<dyn ClientModule>>,
}

impl StandaloneOrchestrator {
    /// `factory` is the optional client module; without it the orchestrator
    /// still manages the server but hands out no facades.
    pub fn new(config: OrchestratorConfig, factory: Option<Arc<dyn ClientModuleFactory>>) -> Self {
        let probe = Arc::new(TcpProbe::new(config.probe_address, config.interval()));
        Self {
            config,
            factory,
            probe,
            state: OrchestratorState::Idle,
            child: None,
            drains: Vec::new(),
            module: None,
        }
    }

    /// Replace the readiness check.
    pub fn with_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == OrchestratorState::Ready
    }

    pub fn has_module(&self) -> bool {
        self.module.is_some()
    }

    /// OS id of the launched server, while it is held by the orchestrator
    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Launch the server and wait for it to accept connections.
    ///
    /// `args` are forwarded to the launch script. If they contain
    /// [`VERSION_FLAG`] the version banner is printed and nothing is launched.
    /// On a readiness timeout the child keeps running; see [`Self::kill`].
    pub async fn start(&mut self, args: &[String]) -> Result<(), OrchestratorError> {
        if args.iter().any(|a| a == VERSION_FLAG) {
            println!("{}", version_text(DeploymentMode::Standalone));
            return Ok(());
        }
        if self.state != OrchestratorState::Idle {
            return Err(OrchestratorError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        self.state = OrchestratorState::Spawning;
        if let Err(e) = self.spawn(args) {
            return Err(self.fail(e));
        }

        self.state = OrchestratorState::WaitingForReady;
        tokio::time::sleep(self.config.grace()).await;
        if let Err(e) = wait_until_ready(
            self.probe.as_ref(),
            self.config.interval(),
            self.config.timeout(),
        )
        .await
        {
            return Err(self.fail(e));
        }

        self.state = OrchestratorState::Ready;
        self.bind_module().await;
        Ok(())
    }

    fn spawn(&mut self, args: &[String]) -> Result<(), OrchestratorError> {
        let launch = &self.config.launch;
        let mut command = Command::new(&launch.program);
        command
            .args(&launch.args)
            .args(args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null());
        match self.config.output {
            OutputMode::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Drain => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        let mut child = command.spawn().map_err(|source| OrchestratorError::Launch {
            program: launch.program.display().to_string(),
            source,
        })?;
        info!(
            program = %launch.program.display(),
            pid = child.id(),
            output = ?self.config.output,
            "Standalone server launched"
        );

        if let Some(stdout) = child.stdout.take() {
            self.drains.push(spawn_drain("stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            self.drains.push(spawn_drain("stderr", stderr));
        }
        self.child = Some(child);
        Ok(())
    }

    fn fail(&mut self, err: OrchestratorError) -> OrchestratorError {
        self.state = OrchestratorState::Failed;
        if let Some(stage) = err.stage() {
            eprintln!(
                "{}",
                failure_banner(DeploymentMode::Standalone, stage, &err.to_string())
            );
        }
        error!(error = %err, "Standalone startup failed");
        err
    }

    async fn bind_module(&mut self) {
        let Some(factory) = &self.factory else {
            info!("No client module available, facades disabled");
            return;
        };
        match factory.instance().await {
            Ok(module) => {
                info!("Client module bound");
                self.module = Some(module);
            }
            Err(e) => warn!(error = %e, "Client module unavailable, facades disabled"),
        }
    }

    /// Ask the server to shut down through the client module, then reap it.
    ///
    /// Without a bound module this does nothing. Shutdown failures are
    /// returned to the caller.
    pub async fn stop(&mut self) -> Result<(), OrchestratorError> {
        let Some(module) = self.module.clone() else {
            return Ok(());
        };

        module
            .stop_standalone_server()
            .await
            .map_err(OrchestratorError::Shutdown)?;
        self.module = None;

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(self.config.exit_wait(), child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    info!(%status, "Standalone server exited");
                }
                Err(_) => {
                    warn!(wait = ?self.config.exit_wait(), "Server still running, killing it");
                    child.kill().await?;
                }
            }
        }
        self.join_drains().await;

        self.state = OrchestratorState::Stopped;
        info!("Standalone orchestrator stopped");
        Ok(())
    }

    /// Kill a child left behind by a failed start.
    pub async fn kill(&mut self) -> Result<(), OrchestratorError> {
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
            warn!("Standalone server killed");
        }
        self.join_drains().await;
        Ok(())
    }

    /// Join the output drains, aborting any still reading after `exit_wait`.
    ///
    /// A server started by the launch script may outlive it and keep the
    /// pipes open.
    async fn join_drains(&mut self) {
        let wait = self.config.exit_wait();
        for mut drain in self.drains.drain(..) {
            match tokio::time::timeout(wait, &mut drain).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Output drain task failed"),
                Err(_) => {
                    warn!(?wait, "Output still open after exit, abandoning drain");
                    drain.abort();
                }
            }
        }
    }

    /// Server information from the client module, if one is bound.
    pub async fn info(&self) -> Option<Value> {
        let module = self.module.as_ref()?;
        match module.info().await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "Server info unavailable");
                None
            }
        }
    }

    fn facade<T>(
        &self,
        group: &'static str,
        get: impl FnOnce(&dyn ClientModule) -> Result<T, ClientError>,
    ) -> Option<T> {
        let module = self.module.as_ref()?;
        match get(module.as_ref()) {
            Ok(facade) => Some(facade),
            Err(e) => {
                warn!(group, error = %e, "Capability unavailable");
                None
            }
        }
    }

    pub fn entity(&self) -> Option<EntityInterface> {
        self.facade("Entity", |m| m.entity_interface())
    }

    pub fn simulation(&self) -> Option<SimulationInterface> {
        self.facade("Simulation", |m| m.simulation_interface())
    }

    pub fn equipment(&self) -> Option<EquipmentInterface> {
        self.facade("Equipment", |m| m.equipment_interface())
    }

    pub fn environment(&self) -> Option<EnvironmentInterface> {
        self.facade("Environment", |m| m.environment_interface())
    }

    pub fn risk_measures(&self) -> Option<RiskMeasuresInterface> {
        self.facade("RiskMeasures", |m| m.risk_measures_interface())
    }
}
