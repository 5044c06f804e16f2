// Discovery endpoints: read the latest snapshot, trigger a run.

use super::AppState;
use crate::error::{ApiError, Result};
use axum::Json;
use axum::extract::State;
use serde_json::json;

/// GET /api/discovery — the current snapshot, 404 until a run completes.
pub(super) async fn latest_snapshot(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse> {
    match state.store.latest().await {
        Some(snapshot) => Ok(Json(snapshot.as_ref().clone())),
        None => Err(ApiError::NotFound("no discovery has run yet".into())),
    }
}

/// POST /api/discovery/run — runs every probe, swaps the store, persists.
/// Blocks until the run completes; concurrent triggers queue on the gate.
pub(super) async fn run_discovery(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let _gate = state.run_gate.lock().await;
    let snapshot = state.aggregator.run_all().await;
    let snapshot = state.store.replace(snapshot).await;
    let persisted = match state.store.persist(&snapshot).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, path = %state.store.path().display(), "snapshot persist failed");
            false
        }
    };
    Ok(Json(json!({
        "success": true,
        "persisted": persisted,
        "probes": snapshot.probe_count(),
        "elapsed_ms": snapshot.meta.elapsed_ms,
    })))
}
