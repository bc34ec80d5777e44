//! Ground vehicle mirrors writing through to a networked node

use crate::test_utils::*;
use simlink_client::{ClientModule, GroundVehicleInterface, SimClient};
use simlink_core::DeploymentMode;
use simlink_sync::{status, ExternalProfile, ExternalState, SyncError, SyncOutcome};

async fn vehicles_for(client: &SimClient) -> GroundVehicleInterface {
    client
        .equipment_interface()
        .unwrap()
        .ground_vehicle()
        .unwrap()
}

/// Node with the vehicle fixture loaded by `sim1`
async fn loaded_node(name: &str) -> simlink_server::ServerNode {
    let node = start_server_node(name).await;
    let admin = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    admin.login("sim1").await.unwrap();

    let path = write_fixture(&format!("{}-vehicles.json", name), VEHICLES);
    let count = vehicles_for(&admin).await.load(&path).await.unwrap();
    assert_eq!(count, 2);
    let _ = std::fs::remove_file(path);
    node
}

#[tokio::test]
async fn assigned_user_moves_vehicle_and_server_follows() {
    let node = loaded_node("assigned").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user1").await.unwrap();
    let vehicles = vehicles_for(&client).await;

    assert_eq!(vehicles.assigned_ids().await.unwrap(), vec!["GV_1".to_string()]);

    let mut gv = vehicles.select("GV_1").await.unwrap().unwrap();
    assert_eq!(gv.state().owner_session_id, client.session_id());

    let outcome = gv.set_speed(12.5).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Accepted);
    assert_eq!(gv.speed(), 12.5);
    assert_eq!(node.vehicles().get("GV_1").unwrap().speed, 12.5);
}

#[tokio::test]
async fn unassigned_user_is_refused_and_mirror_keeps_value() {
    let node = loaded_node("unassigned").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user2").await.unwrap();

    let mut gv = vehicles_for(&client)
        .await
        .select("GV_1")
        .await
        .unwrap()
        .unwrap();
    let before = gv.course();

    let outcome = gv.set_course(270.0).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Rejected {
            status: status::NOT_PERMITTED
        }
    );
    assert_eq!(gv.course(), before);
    assert_eq!(node.vehicles().get("GV_1").unwrap().course, before);
}

#[tokio::test]
async fn plan_edit_clears_waypoint_name_only_when_moved() {
    let node = loaded_node("plan").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user1").await.unwrap();
    let mut gv = vehicles_for(&client)
        .await
        .select("GV_1")
        .await
        .unwrap()
        .unwrap();

    let same = gv.plan()[0].latitude;
    assert!(gv.set_plan_latitude(0, same).await.unwrap().is_accepted());
    assert_eq!(gv.plan()[0].waypoint_name, "RAMP_A");

    assert!(gv.set_plan_longitude(1, -97.05).await.unwrap().is_accepted());
    assert_eq!(gv.plan()[1].longitude, -97.05);
    assert_eq!(gv.plan()[1].waypoint_name, "");
    assert!(gv.pending_edit().is_none());

    let server = node.vehicles().get("GV_1").unwrap();
    assert_eq!(server.plan[1].longitude, -97.05);
    assert_eq!(server.plan[1].waypoint_name, "");
    assert_eq!(server.plan[0].waypoint_name, "RAMP_A");
}

#[tokio::test]
async fn negative_plan_index_never_reaches_the_server() {
    let node = loaded_node("negative").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user1").await.unwrap();
    let mut gv = vehicles_for(&client)
        .await
        .select("GV_1")
        .await
        .unwrap()
        .unwrap();
    let before = gv.state().plan_latitudes();

    let err = gv.set_plan_latitude(-1, 10.0).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidPlanIndex { index: -1, .. }));
    assert_eq!(gv.state().plan_latitudes(), before);
}

#[tokio::test]
async fn external_vehicle_is_read_only_but_accepts_injected_state() {
    let node = loaded_node("external").await;
    let admin = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    admin.login("sim1").await.unwrap();
    let vehicles = vehicles_for(&admin).await;

    let profile = ExternalProfile {
        id: "EXT_1".to_string(),
        aircraft_id: Some("AC_9".to_string()),
        location_id: Some("KDFW".to_string()),
        latitude: 32.8,
        longitude: -97.0,
        speed: 0.0,
        course: 0.0,
    };
    assert_eq!(vehicles.external_create(&profile).await.unwrap(), status::ACCEPTED);

    let sample = ExternalState {
        id: "EXT_1".to_string(),
        aircraft_id: Some("AC_9".to_string()),
        latitude: 32.81,
        longitude: -97.01,
        speed: 8.0,
        course: 45.0,
    };
    assert_eq!(vehicles.external_inject(&sample).await.unwrap(), status::ACCEPTED);

    let mut gv = vehicles.select("EXT_1").await.unwrap().unwrap();
    assert!(gv.is_external());
    assert_eq!(gv.speed(), 8.0);

    let err = gv.set_speed(20.0).await.unwrap_err();
    assert!(matches!(err, SyncError::ExternalEntity(_)));
    assert_eq!(node.vehicles().get("EXT_1").unwrap().speed, 8.0);
}

#[tokio::test]
async fn requested_vehicle_becomes_editable() {
    let node = loaded_node("request").await;
    let client = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    client.login("user2").await.unwrap();

    let granted = client
        .simulation_interface()
        .unwrap()
        .request_ground_vehicle("GV_2")
        .await
        .unwrap();
    assert!(granted);

    let mut gv = vehicles_for(&client)
        .await
        .select("GV_2")
        .await
        .unwrap()
        .unwrap();
    assert!(gv.set_latitude(32.91).await.unwrap().is_accepted());
}

#[tokio::test]
async fn release_drops_every_vehicle() {
    let node = loaded_node("release").await;
    let admin = SimClient::connect(DeploymentMode::Server, client_config(&node))
        .await
        .unwrap();
    admin.login("sim1").await.unwrap();
    let vehicles = vehicles_for(&admin).await;

    assert_eq!(vehicles.release().await.unwrap(), 2);
    assert!(vehicles.ids().await.unwrap().is_empty());
    assert!(vehicles.select("GV_1").await.unwrap().is_none());
}
