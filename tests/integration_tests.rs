// Integration tests: HTTP endpoints against stubbed hardware commands

use axum::http::StatusCode;
use axum_test::TestServer;
use picontrol::camera::{CameraKind, CameraLock, CameraService};
use picontrol::config::{AudioConfig, CameraConfig, GpioConfig};
use picontrol::control::{AudioControl, GpioState};
use picontrol::discovery::{Aggregator, SnapshotStore};
use picontrol::probe::inspector::SystemInspector;
use picontrol::probe::registry::{ProbeRegistry, command};
use picontrol::probe::{ProbeDomain, parsers};
use picontrol::routes::{self, AppState};
use picontrol::timelapse::TimelapseScheduler;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Duration;

fn stub_registry() -> ProbeRegistry {
    use ProbeDomain::*;
    let budget = Duration::from_secs(5);
    ProbeRegistry::new(vec![
        command(Hardware, "board", budget, &["sh", "-c", "echo stub-board"], parsers::raw_text),
        command(Peripherals, "usb", budget, &["sh", "-c", "exit 1"], parsers::raw_text),
        command(Software, "os", budget, &["sh", "-c", "echo stub-os"], parsers::raw_text),
        command(Network, "dns", budget, &["sh", "-c", "echo 1.1.1.1"], parsers::raw_text),
    ])
}

struct TestApp {
    server: TestServer,
    state: AppState,
    _dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let dir = tempfile::TempDir::new().unwrap();
    let inspector = Arc::new(SystemInspector::new());
    let aggregator = Arc::new(Aggregator::new(
        Arc::new(stub_registry()),
        inspector.clone(),
        4,
    ));
    let store = Arc::new(SnapshotStore::new(dir.path().join("discovery.json")));

    let camera_config = CameraConfig {
        still_command: vec!["sh".into(), "-c".into(), "printf JPEG > {output}".into()],
        stream_command: vec!["cat".into(), "/dev/null".into()],
        capture_timeout_secs: 5,
    };
    let camera_lock = CameraLock::new();
    let camera = Arc::new(CameraService::new(
        camera_lock,
        &camera_config,
        dir.path().join("photos"),
    ));
    let timelapse = Arc::new(TimelapseScheduler::new(
        camera.clone(),
        dir.path().join("frames"),
    ));

    let gpio_config = GpioConfig {
        pins: vec![17, 27],
        set_command: vec!["sh".into(), "-c".into(), "exit 0".into()],
    };
    let audio_config = AudioConfig {
        speak_command: vec!["sh".into(), "-c".into(), "echo {text}".into()],
        play_command: vec!["cat".into()],
        volume_command: vec!["sh".into(), "-c".into(), "exit 0".into()],
    };

    let state = AppState {
        store,
        aggregator,
        run_gate: Arc::new(tokio::sync::Mutex::new(())),
        camera,
        timelapse,
        gpio: Arc::new(GpioState::new(&gpio_config)),
        audio: Arc::new(AudioControl::new(&audio_config)),
        inspector,
    };
    let server = TestServer::new(routes::app(state.clone()));
    TestApp {
        server,
        state,
        _dir: dir,
    }
}

#[tokio::test]
async fn root_and_version_endpoints() {
    let app = test_app();
    let response = app.server.get("/").await;
    response.assert_status_ok();
    response.assert_text("picontrol: ready");

    let response = app.server.get("/version").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], json!("picontrol"));
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn discovery_is_404_until_a_run_completes() {
    let app = test_app();
    app.server.get("/api/discovery").await.assert_status(StatusCode::NOT_FOUND);

    let response = app.server.post("/api/discovery/run").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["probes"], json!(4));
    assert_eq!(body["persisted"], json!(true));

    let response = app.server.get("/api/discovery").await;
    response.assert_status_ok();
    let snapshot: serde_json::Value = response.json();
    assert_eq!(snapshot["hardware"]["board"]["status"], json!("ok"));
    assert_eq!(snapshot["hardware"]["board"]["value"], json!("stub-board"));
    assert_eq!(snapshot["peripherals"]["usb"]["status"], json!("unavailable"));
    assert_eq!(snapshot["peripherals"]["usb"]["detected"], json!(false));
    assert!(snapshot["meta"]["hostname"].as_str().is_some());
}

#[tokio::test]
async fn photo_endpoint_returns_jpeg_bytes() {
    let app = test_app();
    let response = app.server.get("/api/camera/photo").await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "image/jpeg"
    );
    assert_eq!(response.as_bytes().to_vec(), b"JPEG".to_vec());
}

#[tokio::test]
async fn photo_conflicts_with_a_live_stream() {
    let app = test_app();
    let lease = app
        .state
        .camera
        .lock()
        .try_acquire(CameraKind::Stream)
        .unwrap();

    app.server
        .get("/api/camera/photo")
        .await
        .assert_status(StatusCode::CONFLICT);

    drop(lease);
    app.server.get("/api/camera/photo").await.assert_status_ok();
}

#[tokio::test]
async fn timelapse_start_validates_parameters_first() {
    let app = test_app();
    let response = app
        .server
        .post("/api/timelapse/start")
        .json(&json!({ "interval": 0, "duration": 10 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let status: serde_json::Value = app.server.get("/api/timelapse/status").await.json();
    assert_eq!(status["state"], json!("idle"));
    assert_eq!(status["frame_count"], json!(0));
}

#[tokio::test]
async fn timelapse_start_status_stop_cycle() {
    let app = test_app();
    let response = app
        .server
        .post("/api/timelapse/start")
        .json(&json!({ "interval": 1, "duration": 30 }))
        .await;
    response.assert_status_ok();

    // A second start conflicts with the running job.
    app.server
        .post("/api/timelapse/start")
        .json(&json!({ "interval": 1, "duration": 30 }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let status: serde_json::Value = app.server.get("/api/timelapse/status").await.json();
    assert_eq!(status["state"], json!("running"));

    app.server.post("/api/timelapse/stop").await.assert_status_ok();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let status: serde_json::Value = app.server.get("/api/timelapse/status").await.json();
        if status["state"] == json!("idle") {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "stop did not settle");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn timelapse_image_rejects_traversal_names() {
    let app = test_app();
    app.server
        .get("/api/timelapse/image/..%2Fdiscovery.json")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .get("/api/timelapse/image/frame_99999.jpg")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gpio_set_enforces_the_pin_allowlist() {
    let app = test_app();
    app.server
        .post("/api/gpio/set")
        .json(&json!({ "pin": 5, "state": true }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/gpio/set")
        .json(&json!({ "pin": 17, "state": true }))
        .await;
    response.assert_status_ok();

    let status: serde_json::Value = app.server.get("/api/gpio/status").await.json();
    assert_eq!(status["pins"]["17"], json!(true));
    assert_eq!(status["pins"]["27"], json!(false));

    app.server.post("/api/gpio/off").await.assert_status_ok();
    let status: serde_json::Value = app.server.get("/api/gpio/status").await.json();
    assert_eq!(status["pins"]["17"], json!(false));
}

#[tokio::test]
async fn audio_volume_validates_range_and_records_the_level() {
    let app = test_app();
    let response = app
        .server
        .post("/api/audio/volume")
        .json(&json!({ "volume": 30 }))
        .await;
    response.assert_status_ok();
    assert_eq!(app.state.audio.level(), 30);

    app.server
        .post("/api/audio/volume")
        .json(&json!({ "volume": 101 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(app.state.audio.level(), 30);
}

#[tokio::test]
async fn audio_speak_rejects_empty_text() {
    let app = test_app();
    app.server
        .post("/api/audio/speak")
        .json(&json!({ "text": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn log_sources_are_listed_and_validated() {
    let app = test_app();
    let response = app.server.get("/api/logs/sources").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let sources = body["sources"].as_array().unwrap();
    assert!(sources.contains(&json!("syslog")));
    assert!(sources.contains(&json!("dmesg")));

    app.server
        .get("/api/logs/read?source=nonsense")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
