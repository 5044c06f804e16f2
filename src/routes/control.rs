// Identity, quick stats, GPIO, audio, and log endpoints.

use super::AppState;
use crate::control;
use crate::error::Result;
use crate::probe::exec::{self, ExecOutcome};
use crate::probe::parsers;
use crate::version::{NAME, VERSION};
use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::json;
use tokio::time::Duration;

const QUICK_BUDGET: Duration = Duration::from_secs(3);

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/info — static host identity, each field best-effort.
pub(super) async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let model = tokio::fs::read_to_string("/proc/device-tree/model")
        .await
        .map(|s| s.replace('\0', "").trim().to_string())
        .unwrap_or_else(|_| "unknown".into());
    let os = tokio::fs::read_to_string("/etc/os-release")
        .await
        .ok()
        .and_then(|s| {
            s.lines()
                .find_map(|l| l.strip_prefix("PRETTY_NAME=").map(|v| v.trim_matches('"').to_string()))
        })
        .unwrap_or_else(|| "unknown".into());
    let ip = match exec::run(&["hostname".into(), "-I".into()], QUICK_BUDGET).await {
        ExecOutcome::Output(out) => out.split_whitespace().next().unwrap_or("?").to_string(),
        _ => "?".into(),
    };
    let uptime = state.inspector.uptime();

    Json(json!({
        "hostname": state.inspector.hostname(),
        "model": model,
        "os": os,
        "ip": ip,
        "uptime": uptime.pretty,
    }))
}

/// GET /api/stats — quick poll for the dashboard: temperature, ram, disk.
pub(super) async fn stats_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let temperature = match exec::run(
        &["vcgencmd".into(), "measure_temp".into()],
        QUICK_BUDGET,
    )
    .await
    {
        ExecOutcome::Output(out) => parsers::vcgencmd_temp(&out)
            .and_then(|v| v.get("cpu_celsius").and_then(|c| c.as_f64())),
        _ => None,
    };

    let inspector = state.inspector.clone();
    let (ram, disk) = tokio::task::spawn_blocking(move || {
        let ram = inspector.memory().ok().map(|m| m.ram.usage_percent);
        let disk = inspector.root_usage_percent().ok().flatten();
        (ram, disk)
    })
    .await
    .map_err(anyhow::Error::from)?;

    Ok(Json(json!({
        "temperature": temperature,
        "ram_percent": ram,
        "disk_percent": disk,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct GpioSetRequest {
    pin: u8,
    #[serde(default)]
    state: bool,
}

/// GET /api/gpio/status — current pin levels (single-writer map).
pub(super) async fn gpio_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "pins": state.gpio.levels() }))
}

/// POST /api/gpio/set {pin, state}
pub(super) async fn gpio_set(
    State(state): State<AppState>,
    Json(req): Json<GpioSetRequest>,
) -> Result<Json<serde_json::Value>> {
    state.gpio.set(req.pin, req.state).await?;
    Ok(Json(json!({
        "success": true,
        "pin": req.pin,
        "state": req.state,
    })))
}

/// POST /api/gpio/off — every configured pin low.
pub(super) async fn gpio_off(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    state.gpio.all_off().await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub(super) struct SpeakRequest {
    text: String,
}

/// POST /api/audio/speak {text}
pub(super) async fn audio_speak(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequest>,
) -> Result<Json<serde_json::Value>> {
    state.audio.speak(&req.text).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub(super) struct VolumeRequest {
    volume: u8,
}

/// POST /api/audio/volume {volume}
pub(super) async fn audio_volume(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<serde_json::Value>> {
    let volume = state.audio.set_volume(req.volume).await?;
    Ok(Json(json!({ "success": true, "volume": volume })))
}

/// GET /api/logs/sources
pub(super) async fn log_sources() -> Json<serde_json::Value> {
    Json(json!({ "sources": control::log_source_names() }))
}

#[derive(Debug, Deserialize)]
pub(super) struct LogQuery {
    #[serde(default = "default_log_source")]
    source: String,
    #[serde(default = "default_log_lines")]
    lines: usize,
}

fn default_log_source() -> String {
    "syslog".into()
}

fn default_log_lines() -> usize {
    100
}

/// GET /api/logs/read?source=syslog&lines=100
pub(super) async fn log_read(Query(query): Query<LogQuery>) -> Result<Json<serde_json::Value>> {
    let content = control::read_log(&query.source, query.lines).await?;
    Ok(Json(json!({
        "source": query.source,
        "lines": query.lines.clamp(1, control::MAX_LOG_LINES),
        "content": content,
    })))
}
