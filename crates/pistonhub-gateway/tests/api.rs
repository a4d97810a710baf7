//! End-to-end tests of the HTTP API against a real store, a recording
//! transport, and a running scheduler engine.

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use pistonhub_auth::MockJwtValidator;
use chrono::{DateTime, TimeZone, Utc};
use pistonhub_control::{
    ControlConfig, ControlService, MockSchedulerClient, PistonDispatcher, SchedulerClient,
};
use pistonhub_core::UserId;
use pistonhub_gateway::{create_router, GatewayConfig, GatewayState};
use pistonhub_scheduler::{
    CronScheduler, MockSchedulerAdmin, SchedulerAdmin, SchedulerConfig, TriggerInfo,
};
use pistonhub_store::RocksStore;
use pistonhub_transport::RecordingTransport;

const EIGHT_AM: &str = "0 0 8 * * ?";

struct TestApp {
    server: TestServer,
    transport: Arc<RecordingTransport>,
    _dir: TempDir,
}

fn setup() -> TestApp {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Arc::new(PistonDispatcher::new(store, Arc::clone(&transport)));

    let scheduler = Arc::new(CronScheduler::new(
        Arc::clone(&dispatcher),
        SchedulerConfig::default(),
    ));
    scheduler.start().unwrap();

    let client: Arc<dyn SchedulerClient> = scheduler.clone();
    let control = Arc::new(ControlService::new(
        dispatcher,
        client,
        ControlConfig::default(),
    ));
    let admin: Arc<dyn SchedulerAdmin> = scheduler;
    let state = GatewayState::new(
        control,
        Arc::new(MockJwtValidator),
        admin,
        GatewayConfig::default(),
    );

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        transport,
        _dir: dir,
    }
}

/// An app whose scheduler side is mocked: mutations go to a recording client
/// and introspection serves whatever triggers the test sets.
fn setup_with_mock_scheduler() -> (TestApp, Arc<MockSchedulerAdmin>) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Arc::new(PistonDispatcher::new(store, Arc::clone(&transport)));

    let control = Arc::new(ControlService::new(
        dispatcher,
        Arc::new(MockSchedulerClient::new()),
        ControlConfig::default(),
    ));
    let admin = Arc::new(MockSchedulerAdmin::new());
    let state = GatewayState::new(
        control,
        Arc::new(MockJwtValidator),
        Arc::clone(&admin) as Arc<dyn SchedulerAdmin>,
        GatewayConfig::default(),
    );

    let app = TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        transport,
        _dir: dir,
    };
    (app, admin)
}

fn bearer(user: &UserId) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer test-token:{}", user.to_hex())).unwrap()
}

fn alice() -> UserId {
    UserId::from_bytes([0xa1; 32])
}

fn bob() -> UserId {
    UserId::from_bytes([0xb0; 32])
}

async fn register(app: &TestApp, user: &UserId, name: &str) -> String {
    let response = app
        .server
        .post("/v1/devices")
        .add_header(AUTHORIZATION, bearer(user))
        .json(&json!({ "name": name, "transport_client_id": format!("esp32-{name}") }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["device_id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn create_schedule(app: &TestApp, user: &UserId, body: Value) -> axum_test::TestResponse {
    app.server
        .post("/v1/schedules")
        .add_header(AUTHORIZATION, bearer(user))
        .json(&body)
        .await
}

#[tokio::test]
async fn health_is_public() {
    let app = setup();

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["scheduler_running"], true);
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = setup();

    let response = app.server.get("/v1/devices").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "unauthorized");

    let response = app
        .server
        .get("/v1/devices")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer garbage"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn devices_are_scoped_to_their_owner() {
    let app = setup();
    let device_id = register(&app, &alice(), "greenhouse").await;

    let response = app
        .server
        .get(&format!("/v1/devices/{device_id}"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["name"], "greenhouse");
    assert_eq!(body["status"], "unknown");

    let response = app
        .server
        .get(&format!("/v1/devices/{device_id}"))
        .add_header(AUTHORIZATION, bearer(&bob()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "not_found");

    let bobs = app
        .server
        .get("/v1/devices")
        .add_header(AUTHORIZATION, bearer(&bob()))
        .await
        .json::<Value>();
    assert_eq!(bobs["devices"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn wildcard_transport_client_id_is_rejected() {
    let app = setup();

    let response = app
        .server
        .post("/v1/devices")
        .add_header(AUTHORIZATION, bearer(&alice()))
        .json(&json!({ "name": "bad", "transport_client_id": "esp32/#" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "bad_request");
}

#[tokio::test]
async fn piston_command_updates_view_and_telemetry() {
    let app = setup();
    let device_id = register(&app, &alice(), "barn").await;

    let response = app
        .server
        .post(&format!("/v1/devices/{device_id}/pistons/3"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .json(&json!({ "action": "ACTIVATE" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let snapshot = response.json::<Value>();
    assert_eq!(snapshot["piston_number"], 3);
    assert_eq!(snapshot["state"], "active");

    let published = app.transport.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].device_key, "esp32-barn");
    assert_eq!(published[0].token.to_string(), "activate:3");

    let view = app
        .server
        .get(&format!("/v1/devices/{device_id}/pistons"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await
        .json::<Value>();
    let pistons = view["pistons"].as_array().unwrap();
    assert_eq!(pistons.len(), 8);
    assert_eq!(pistons[2]["state"], "active");
    assert_eq!(pistons[2]["piston_id"], snapshot["piston_id"]);
    assert_eq!(pistons[0]["state"], "inactive");
    assert!(pistons[0]["piston_id"].is_null());

    let telemetry = app
        .server
        .get(&format!("/v1/devices/{device_id}/telemetry?limit=10"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await
        .json::<Value>();
    let events = telemetry["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "activated");
    assert_eq!(events[0]["payload"]["pistonNumber"], 3);
}

#[tokio::test]
async fn rejected_commands_have_no_side_effects() {
    let app = setup();
    let device_id = register(&app, &alice(), "shed").await;
    let path = |n: &str| format!("/v1/devices/{device_id}/pistons/{n}");

    let response = app
        .server
        .post(&path("9"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .json(&json!({ "action": "activate" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "invalid_piston_number"
    );

    let response = app
        .server
        .post(&path("two"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .json(&json!({ "action": "activate" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post(&path("2"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .json(&json!({ "action": "toggle" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "invalid_action");

    let response = app
        .server
        .post(&path("2"))
        .add_header(AUTHORIZATION, bearer(&bob()))
        .json(&json!({ "action": "activate" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    assert_eq!(app.transport.publish_count(), 0);
}

#[tokio::test]
async fn transport_outage_is_bad_gateway_and_persists_nothing() {
    let app = setup();
    let device_id = register(&app, &alice(), "pump").await;
    app.transport.set_failing(true);

    let response = app
        .server
        .post(&format!("/v1/devices/{device_id}/pistons/1"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .json(&json!({ "action": "activate" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "transport_unavailable"
    );

    let view = app
        .server
        .get(&format!("/v1/devices/{device_id}/pistons"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await
        .json::<Value>();
    assert_eq!(view["pistons"][0]["state"], "inactive");
}

#[tokio::test]
async fn schedule_lifecycle_tracks_triggers() {
    let app = setup();
    let device_id = register(&app, &alice(), "orchard").await;

    let response = create_schedule(
        &app,
        &alice(),
        json!({
            "name": "morning",
            "device_id": device_id,
            "piston_number": 4,
            "action": "activate",
            "cron_expression": EIGHT_AM,
        }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created = response.json::<Value>();
    let schedule_id = created["schedule_id"].as_str().unwrap().to_string();
    assert_eq!(created["action"], "ACTIVATE");
    assert_eq!(created["enabled"], true);
    assert!(created["next_fire_at"].is_string());

    let triggers = app
        .server
        .get("/internal/v1/scheduler/triggers")
        .await
        .json::<Value>();
    assert_eq!(triggers["triggers"].as_array().unwrap().len(), 1);
    assert_eq!(triggers["triggers"][0]["schedule_id"], schedule_id.as_str());

    let response = app
        .server
        .patch(&format!("/v1/schedules/{schedule_id}"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .json(&json!({ "enabled": false }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated = response.json::<Value>();
    assert_eq!(updated["enabled"], false);
    assert!(updated["next_fire_at"].is_null());
    assert_eq!(updated["cron_expression"], EIGHT_AM);

    let response = app
        .server
        .get(&format!("/v1/schedules/{schedule_id}"))
        .add_header(AUTHORIZATION, bearer(&bob()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = app
        .server
        .delete(&format!("/v1/schedules/{schedule_id}"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = app
        .server
        .get(&format!("/v1/schedules/{schedule_id}"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let schedules = app
        .server
        .get("/v1/schedules")
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await
        .json::<Value>();
    assert!(schedules["schedules"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn schedule_validation_codes() {
    let app = setup();
    let device_id = register(&app, &alice(), "vineyard").await;
    let body = |cron: &str, piston: i64, action: &str| {
        json!({
            "name": "s",
            "device_id": device_id,
            "piston_number": piston,
            "action": action,
            "cron_expression": cron,
        })
    };

    let cases = [
        (body(EIGHT_AM, 1, "toggle"), "invalid_action"),
        (body(EIGHT_AM, 0, "activate"), "invalid_piston_number"),
        (body("every day", 1, "activate"), "invalid_cron_syntax"),
        (body("0 0 0 1 1 ? 2020", 1, "activate"), "cron_never_fires"),
    ];
    for (request, code) in cases {
        let response = create_schedule(&app, &alice(), request).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["code"], code);
    }

    let response = create_schedule(&app, &bob(), body(EIGHT_AM, 1, "activate")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let schedules = app
        .server
        .get("/v1/schedules")
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await
        .json::<Value>();
    assert!(schedules["schedules"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn internal_reload_rebuilds_triggers() {
    let app = setup();
    let device_id = register(&app, &alice(), "field").await;

    for (name, enabled) in [("on", true), ("off", false)] {
        let response = create_schedule(
            &app,
            &alice(),
            json!({
                "name": name,
                "device_id": device_id,
                "piston_number": 2,
                "action": "deactivate",
                "cron_expression": EIGHT_AM,
                "enabled": enabled,
            }),
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
    }

    let response = app.server.post("/internal/v1/scheduler/reload").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["registered"], 1);
}

#[tokio::test]
async fn schedule_reads_report_engine_fire_times() {
    let (app, admin) = setup_with_mock_scheduler();
    let device_id = register(&app, &alice(), "orchard").await;

    let response = create_schedule(
        &app,
        &alice(),
        json!({
            "name": "dawn",
            "device_id": device_id,
            "piston_number": 4,
            "action": "activate",
            "cron_expression": EIGHT_AM,
            "enabled": true,
        }),
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created = response.json::<Value>();
    assert!(created["next_fire_at"].is_null());
    let schedule_id = created["schedule_id"].as_str().unwrap().to_string();

    let fires_at = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
    admin.set_triggers(vec![TriggerInfo {
        schedule_id: schedule_id.parse().unwrap(),
        next_fire_at: fires_at,
    }]);

    let response = app
        .server
        .get(&format!("/v1/schedules/{schedule_id}"))
        .add_header(AUTHORIZATION, bearer(&alice()))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let reported: DateTime<Utc> =
        serde_json::from_value(response.json::<Value>()["next_fire_at"].clone()).unwrap();
    assert_eq!(reported, fires_at);

    let response = app.server.get("/internal/v1/scheduler/triggers").await;
    let body = response.json::<Value>();
    assert_eq!(body["running"], true);
    assert_eq!(body["triggers"].as_array().unwrap().len(), 1);
    assert_eq!(body["triggers"][0]["schedule_id"], schedule_id.as_str());

    let response = app.server.post("/internal/v1/scheduler/reload").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["registered"], 1);
    assert_eq!(admin.reload_count(), 1);
    assert_eq!(app.transport.publish_count(), 0);
}
