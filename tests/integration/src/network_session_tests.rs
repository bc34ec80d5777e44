//! Session handshake, login and permissions across a networked node

use crate::test_utils::*;
use serde_json::Value;
use simlink_client::{ClientError, ClientModule, SimClient};
use simlink_core::{DeploymentMode, NO_SESSION};
use simlink_registry::RemoteErrorKind;
use simlink_session::PermissionLevel;
use std::path::Path;

fn remote_kind(err: &ClientError) -> Option<RemoteErrorKind> {
    match err {
        ClientError::Remote(e) => Some(e.kind),
        _ => None,
    }
}

#[tokio::test]
async fn client_receives_session_id_and_logs_in() {
    let node = start_server_node("login").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();

    assert_ne!(client.session_id(), NO_SESSION);
    assert!(node.core().sessions().get(client.session_id()).is_some());

    let level = client.login("user1").await.unwrap();
    assert_eq!(level, PermissionLevel::NormalUser);
    assert!(eventually(|| client.auth_id().as_deref() == Some("user1")).await);

    client.logout().await.unwrap();
    assert!(eventually(|| client.auth_id().is_none()).await);
}

#[tokio::test]
async fn session_ids_are_unique_per_connection() {
    let node = start_server_node("unique").await;
    let first = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    let second = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();

    assert_ne!(first.session_id(), second.session_id());
}

#[tokio::test]
async fn unknown_user_is_rejected() {
    let node = start_server_node("unknown").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();

    let err = client.login("mallory").await.unwrap_err();
    assert_eq!(remote_kind(&err), Some(RemoteErrorKind::Rejected));
}

#[tokio::test]
async fn normal_user_cannot_load_vehicles() {
    let node = start_server_node("denied").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user2").await.unwrap();

    let vehicles = client
        .equipment_interface()
        .unwrap()
        .ground_vehicle()
        .unwrap();
    let err = vehicles
        .load(Path::new("/nonexistent/vehicles.json"))
        .await
        .unwrap_err();
    assert_eq!(remote_kind(&err), Some(RemoteErrorKind::PermissionDenied));
}

#[tokio::test]
async fn logged_out_session_cannot_call_operations() {
    let node = start_server_node("logged-out").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user1").await.unwrap();
    client.logout().await.unwrap();

    let err = client
        .simulation_interface()
        .unwrap()
        .status()
        .await
        .unwrap_err();
    assert_eq!(remote_kind(&err), Some(RemoteErrorKind::NotLoggedIn));
}

#[tokio::test]
async fn simulation_runs_through_its_lifecycle() {
    let node = start_server_node("lifecycle").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("sim1").await.unwrap();

    let sim = client.simulation_interface().unwrap();
    let sim_id = sim.setup(3600.0, 1.0).await.unwrap();
    assert_eq!(sim.sim_id().await.unwrap(), sim_id);
    assert_eq!(sim.status().await.unwrap(), 0);

    assert_eq!(sim.start().await.unwrap(), 1);
    assert_eq!(sim.pause().await.unwrap(), 2);
    assert_eq!(sim.resume().await.unwrap(), 3);
    assert_eq!(sim.stop().await.unwrap(), 4);

    // Resuming a stopped run is not a valid transition.
    let err = sim.resume().await.unwrap_err();
    assert_eq!(remote_kind(&err), Some(RemoteErrorKind::Rejected));
}

#[tokio::test]
async fn algorithm_groups_answer_unsupported() {
    let node = start_server_node("algorithms").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user2").await.unwrap();

    let err = client
        .environment_interface()
        .unwrap()
        .call("weather_at", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(remote_kind(&err), Some(RemoteErrorKind::Unsupported));
}

#[tokio::test]
async fn info_reports_server_mode() {
    let node = start_server_node("info").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();

    let info = client.info().await.unwrap();
    assert_eq!(info["mode"], "server");
    assert!(info["sessions"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn disconnect_closes_the_session() {
    let node = start_server_node("disconnect").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    let id = client.session_id();

    client.disconnect();
    let sessions = node.core().sessions().clone();
    assert!(eventually(|| sessions.get(id).is_none()).await);
}
