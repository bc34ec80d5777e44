//! Standalone node driven by its co-located client

use crate::test_utils::*;
use simlink_client::{ClientError, ClientModule, SimClient, SimClientFactory};
use simlink_core::{DeploymentMode, NO_SESSION};
use std::time::Duration;

#[tokio::test]
async fn standalone_client_is_local_admin_without_login() {
    let node = start_standalone_node().await;
    let client = SimClient::connect(DeploymentMode::Standalone, client_config(&node))
        .await
        .unwrap();
    assert_eq!(client.session_id(), NO_SESSION);

    let sim = client.simulation_interface().unwrap();
    assert_eq!(sim.setup(60.0, 0.5).await.unwrap(), 1);
    assert_eq!(sim.start().await.unwrap(), 1);

    let err = client.logout().await.unwrap_err();
    assert!(matches!(err, ClientError::WrongMode { operation: "logout", .. }));
}

#[tokio::test]
async fn stop_standalone_server_signals_node_shutdown() {
    let node = start_standalone_node().await;
    let client = SimClient::connect(DeploymentMode::Standalone, client_config(&node))
        .await
        .unwrap();

    assert_eq!(client.server_process_id().await.unwrap(), std::process::id());
    client.stop_standalone_server().await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), node.wait_for_shutdown())
        .await
        .unwrap();
    assert!(node.core().is_shutdown_requested());
}

#[tokio::test]
async fn network_client_cannot_stop_server() {
    let node = start_server_node("no-stop").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();

    let err = client.stop_standalone_server().await.unwrap_err();
    assert!(matches!(err, ClientError::WrongMode { .. }));
    assert!(!node.core().is_shutdown_requested());
}

#[cfg(unix)]
#[tokio::test]
async fn orchestrator_binds_client_and_stops_server() {
    use simlink_standalone::{
        LaunchCommand, OrchestratorConfig, OrchestratorState, OutputMode, StandaloneOrchestrator,
    };
    use std::sync::Arc;

    let node = start_standalone_node().await;
    let config = OrchestratorConfig {
        launch: LaunchCommand::new("sleep").arg("5"),
        working_dir: std::env::temp_dir(),
        probe_address: node.session_addr().unwrap(),
        grace_ms: 0,
        interval_ms: 20,
        timeout_ms: 2_000,
        exit_wait_ms: 100,
        output: OutputMode::Drain,
    };
    let factory = Arc::new(SimClientFactory::new(
        DeploymentMode::Standalone,
        client_config(&node),
    ));
    let mut orchestrator = StandaloneOrchestrator::new(config, Some(factory));

    orchestrator.start(&[]).await.unwrap();
    assert_eq!(orchestrator.state(), OrchestratorState::Ready);

    let sim = orchestrator.simulation().unwrap();
    sim.setup(10.0, 1.0).await.unwrap();
    assert!(orchestrator.entity().is_some());
    assert!(orchestrator.equipment().is_some());
    assert!(orchestrator.environment().is_some());
    assert!(orchestrator.risk_measures().is_some());
    assert_eq!(orchestrator.info().await.unwrap()["mode"], "standalone");

    orchestrator.stop().await.unwrap();
    assert_eq!(orchestrator.state(), OrchestratorState::Stopped);
    tokio::time::timeout(Duration::from_secs(2), node.wait_for_shutdown())
        .await
        .unwrap();
}
