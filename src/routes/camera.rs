// Camera endpoints: one-shot photo and live MJPEG stream.

use super::AppState;
use crate::error::Result;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::Response;

/// GET /api/camera/photo — acquire Photo, capture one frame, release.
/// 409 while anything else holds the camera.
pub(super) async fn photo(State(state): State<AppState>) -> Result<Response> {
    let bytes = state.camera.take_photo().await?;
    Response::builder()
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(bytes))
        .map_err(|e| anyhow::Error::from(e).into())
}

/// GET /api/camera/stream — acquire Stream and hold it for the response
/// lifetime. Disconnecting releases the camera and kills the encoder.
pub(super) async fn stream(State(state): State<AppState>) -> Result<Response> {
    let stream = state.camera.open_stream().await?;
    Response::builder()
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .body(Body::from_stream(stream.into_body_stream()))
        .map_err(|e| anyhow::Error::from(e).into())
}
