// Photo and MJPEG stream capture around configurable command templates.

use super::{CameraKind, CameraLease, CameraLock};
use crate::config::CameraConfig;
use crate::error::ApiError;
use crate::probe::exec::{self, ExecOutcome};
use bytes::Bytes;
use futures_util::Stream;
use futures_util::stream;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::Duration;

/// JPEG start-of-image / end-of-image markers in the MJPEG byte stream.
const JPEG_SOI: [u8; 2] = [0xff, 0xd8];
const JPEG_EOI: [u8; 2] = [0xff, 0xd9];

/// A stalled encoder must not grow the frame buffer without bound.
const MAX_FRAME_BUF: usize = 4 * 1024 * 1024;

/// Result of one timelapse capture attempt. Busy is not an error at this
/// level; the scheduler turns it into a skipped tick.
#[derive(Debug)]
pub enum FrameOutcome {
    Captured,
    Busy(CameraKind),
    Failed(String),
}

pub struct CameraService {
    lock: Arc<CameraLock>,
    still_command: Vec<String>,
    stream_command: Vec<String>,
    capture_timeout: Duration,
    photo_dir: PathBuf,
}

impl CameraService {
    pub fn new(lock: Arc<CameraLock>, config: &CameraConfig, photo_dir: PathBuf) -> Self {
        Self {
            lock,
            still_command: config.still_command.clone(),
            stream_command: config.stream_command.clone(),
            capture_timeout: Duration::from_secs(config.capture_timeout_secs),
            photo_dir,
        }
    }

    pub fn lock(&self) -> &Arc<CameraLock> {
        &self.lock
    }

    /// One-shot photo: acquire, capture, release, return the image bytes.
    pub async fn take_photo(&self) -> Result<Vec<u8>, ApiError> {
        let lease = self.acquire(CameraKind::Photo)?;
        tokio::fs::create_dir_all(&self.photo_dir)
            .await
            .map_err(anyhow::Error::from)?;
        let path = self
            .photo_dir
            .join(format!("photo_{}.jpg", chrono::Local::now().format("%H%M%S%3f")));
        let result = self.capture_to(&path).await;
        // The lock covers the physical capture only, not the file read.
        drop(lease);
        result.map_err(|e| ApiError::Unavailable(e.to_string()))?;
        let bytes = tokio::fs::read(&path).await.map_err(anyhow::Error::from)?;
        let _ = tokio::fs::remove_file(&path).await;
        Ok(bytes)
    }

    /// One timelapse frame into `path`. Never blocks on a held lock.
    pub async fn timelapse_frame(&self, path: &Path) -> FrameOutcome {
        let lease = match self.lock.try_acquire(CameraKind::TimelapseFrame) {
            Ok(lease) => lease,
            Err(holder) => return FrameOutcome::Busy(holder),
        };
        let result = self.capture_to(path).await;
        drop(lease);
        match result {
            Ok(()) => FrameOutcome::Captured,
            Err(e) => FrameOutcome::Failed(e.to_string()),
        }
    }

    /// Starts the live MJPEG stream. The returned stream owns the camera
    /// lease and the encoder process; dropping it (client disconnect) kills
    /// the encoder and frees the camera.
    pub async fn open_stream(&self) -> Result<CameraStream, ApiError> {
        let lease = self.acquire(CameraKind::Stream)?;
        let Some((bin, args)) = self.stream_command.split_first() else {
            return Err(ApiError::Internal(anyhow::anyhow!("empty stream command")));
        };
        let mut child = Command::new(bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ApiError::Unavailable(format!("stream tool not installed: {bin}"))
                }
                _ => ApiError::Internal(e.into()),
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("stream stdout not captured"))?;
        tracing::info!(command = %bin, "camera stream started");
        Ok(CameraStream {
            child,
            stdout,
            buf: Vec::new(),
            _lease: lease,
        })
    }

    fn acquire(&self, kind: CameraKind) -> Result<CameraLease, ApiError> {
        self.lock
            .try_acquire(kind)
            .map_err(|holder| ApiError::Busy(format!("camera held by {}", holder.as_str())))
    }

    async fn capture_to(&self, path: &Path) -> anyhow::Result<()> {
        let output = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-utf8 capture path"))?;
        let argv = exec::substitute(&self.still_command, "output", output);
        match exec::run(&argv, self.capture_timeout).await {
            ExecOutcome::Output(_) => Ok(()),
            ExecOutcome::NotFound(bin) => anyhow::bail!("capture tool not installed: {bin}"),
            ExecOutcome::Failed { code, stderr } => {
                if stderr.is_empty() {
                    anyhow::bail!("capture exited with status {}", code.unwrap_or(-1))
                } else {
                    anyhow::bail!("capture failed: {stderr}")
                }
            }
            ExecOutcome::TimedOut => {
                anyhow::bail!("capture timed out after {:?}", self.capture_timeout)
            }
            ExecOutcome::Error(e) => anyhow::bail!("capture error: {e}"),
        }
    }
}

/// Live stream state: encoder process, its stdout, the frame scan buffer,
/// and the camera lease keeping everyone else out.
pub struct CameraStream {
    child: Child,
    stdout: ChildStdout,
    buf: Vec<u8>,
    _lease: CameraLease,
}

impl CameraStream {
    /// multipart/x-mixed-replace chunks, one complete JPEG per part.
    pub fn into_body_stream(self) -> impl Stream<Item = std::io::Result<Bytes>> + Send {
        stream::unfold(self, |mut s| async move {
            loop {
                if let Some(frame) = extract_frame(&mut s.buf) {
                    return Some((Ok(multipart_chunk(&frame)), s));
                }
                if s.buf.len() > MAX_FRAME_BUF {
                    tracing::warn!("stream buffer overflow without a frame boundary, resetting");
                    s.buf.clear();
                }
                let mut chunk = [0u8; 4096];
                match s.stdout.read(&mut chunk).await {
                    Ok(0) => {
                        tracing::info!("camera stream ended");
                        let _ = s.child.start_kill();
                        return None;
                    }
                    Ok(n) => s.buf.extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        tracing::warn!(error = %e, "camera stream read failed");
                        let _ = s.child.start_kill();
                        return None;
                    }
                }
            }
        })
    }
}

/// Pulls one complete JPEG (SOI..EOI) out of the scan buffer.
fn extract_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = find_marker(buf, &JPEG_SOI)?;
    let end = find_marker(&buf[start..], &JPEG_EOI)? + start;
    if end <= start {
        return None;
    }
    let frame = buf[start..end + 2].to_vec();
    buf.drain(..end + 2);
    Some(frame)
}

fn find_marker(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}

fn multipart_chunk(frame: &[u8]) -> Bytes {
    let mut chunk =
        Vec::with_capacity(frame.len() + 64);
    chunk.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    chunk.extend_from_slice(frame);
    chunk.extend_from_slice(b"\r\n");
    Bytes::from(chunk)
}
