// HTTP routes

mod camera;
mod control;
mod discovery;
mod timelapse;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::camera::CameraService;
use crate::control::{AudioControl, GpioState};
use crate::discovery::{Aggregator, SnapshotStore};
use crate::probe::inspector::SystemInspector;
use crate::timelapse::TimelapseScheduler;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub aggregator: Arc<Aggregator>,
    /// Serializes discovery runs; concurrent triggers wait for the
    /// in-flight run instead of racing the store swap.
    pub run_gate: Arc<tokio::sync::Mutex<()>>,
    pub camera: Arc<CameraService>,
    pub timelapse: Arc<TimelapseScheduler>,
    pub gpio: Arc<GpioState>,
    pub audio: Arc<AudioControl>,
    pub inspector: Arc<SystemInspector>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "picontrol: ready" })) // GET /
        .route("/version", get(control::version_handler)) // GET /version
        .route("/api/info", get(control::info_handler)) // GET /api/info
        .route("/api/stats", get(control::stats_handler)) // GET /api/stats
        .route("/api/discovery", get(discovery::latest_snapshot)) // GET /api/discovery
        .route("/api/discovery/run", post(discovery::run_discovery)) // POST /api/discovery/run
        .route("/api/camera/photo", get(camera::photo)) // GET /api/camera/photo
        .route("/api/camera/stream", get(camera::stream)) // GET /api/camera/stream
        .route("/api/timelapse/status", get(timelapse::status)) // GET /api/timelapse/status
        .route("/api/timelapse/start", post(timelapse::start)) // POST /api/timelapse/start
        .route("/api/timelapse/stop", post(timelapse::stop)) // POST /api/timelapse/stop
        .route("/api/timelapse/clear", delete(timelapse::clear)) // DELETE /api/timelapse/clear
        .route("/api/timelapse/image/{name}", get(timelapse::image)) // GET /api/timelapse/image/{name}
        .route("/api/gpio/status", get(control::gpio_status)) // GET /api/gpio/status
        .route("/api/gpio/set", post(control::gpio_set)) // POST /api/gpio/set
        .route("/api/gpio/off", post(control::gpio_off)) // POST /api/gpio/off
        .route("/api/audio/speak", post(control::audio_speak)) // POST /api/audio/speak
        .route("/api/audio/volume", post(control::audio_volume)) // POST /api/audio/volume
        .route("/api/logs/sources", get(control::log_sources)) // GET /api/logs/sources
        .route("/api/logs/read", get(control::log_read)) // GET /api/logs/read
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
