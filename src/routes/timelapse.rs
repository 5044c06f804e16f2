// Timelapse endpoints, mapping straight onto the scheduler operations.

use super::AppState;
use crate::error::{ApiError, Result};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Duration;

#[derive(Debug, Deserialize)]
pub(super) struct StartRequest {
    interval: u64,
    duration: u64,
}

/// GET /api/timelapse/status
pub(super) async fn status(State(state): State<AppState>) -> Json<crate::timelapse::JobStatus> {
    Json(state.timelapse.status())
}

/// POST /api/timelapse/start {interval, duration} (seconds).
/// Rejected before any scheduling state changes when the parameters are
/// out of range, 409 while a job is already running.
pub(super) async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.interval < 1 {
        return Err(ApiError::InvalidRequest(format!(
            "interval must be >= 1 second, got {}",
            req.interval
        )));
    }
    if req.duration < 1 {
        return Err(ApiError::InvalidRequest(format!(
            "duration must be >= 1 second, got {}",
            req.duration
        )));
    }
    state
        .timelapse
        .start(
            Duration::from_secs(req.interval),
            Duration::from_secs(req.duration),
        )
        .await?;
    Ok(Json(json!({
        "success": true,
        "interval": req.interval,
        "duration": req.duration,
    })))
}

/// POST /api/timelapse/stop — idempotent; an in-flight tick finishes first.
pub(super) async fn stop(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.timelapse.stop();
    Json(json!({ "success": true }))
}

/// DELETE /api/timelapse/clear — removes captured frames; idle jobs only.
pub(super) async fn clear(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let removed = state.timelapse.clear().await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// GET /api/timelapse/image/{name} — serves one captured frame.
pub(super) async fn image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    if !is_safe_frame_name(&name) {
        return Err(ApiError::InvalidRequest(format!("bad frame name: {name}")));
    }
    let path = state.timelapse.frames_dir().join(&name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("no such frame: {name}")));
        }
        Err(e) => return Err(ApiError::Internal(e.into())),
    };
    Response::builder()
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(bytes))
        .map_err(|e| anyhow::Error::from(e).into())
}

fn is_safe_frame_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}
