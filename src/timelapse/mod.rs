// Timelapse scheduler: one cancellable background task that captures a
// frame per tick through the camera lock.
//
// State machine: Idle -> Running -> Idle (duration elapsed or stop with no
// tick in flight), Running -> Stopping -> Idle (stop while a tick is in
// flight; the tick finishes before the job goes idle so no frame is left
// half-written).

use crate::camera::{CameraService, FrameOutcome};
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Stopping,
}

/// Read-only view for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub interval_secs: f64,
    pub duration_secs: f64,
    pub elapsed_secs: f64,
    pub frame_count: u64,
    pub frames: Vec<String>,
}

#[derive(Debug)]
struct JobInner {
    state: JobState,
    interval: Duration,
    duration: Duration,
    started: Option<Instant>,
    last_elapsed: Duration,
    tick_seq: u64,
    frame_count: u64,
    frames: Vec<String>,
}

impl JobInner {
    fn idle() -> Self {
        Self {
            state: JobState::Idle,
            interval: Duration::ZERO,
            duration: Duration::ZERO,
            started: None,
            last_elapsed: Duration::ZERO,
            tick_seq: 0,
            frame_count: 0,
            frames: Vec::new(),
        }
    }
}

enum TickPlan {
    Capture(u64),
    Finish,
}

pub struct TimelapseScheduler {
    camera: Arc<CameraService>,
    frames_dir: PathBuf,
    inner: Arc<Mutex<JobInner>>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TimelapseScheduler {
    pub fn new(camera: Arc<CameraService>, frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            camera,
            frames_dir: frames_dir.into(),
            inner: Arc::new(Mutex::new(JobInner::idle())),
            stop_tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Begins a new job. Rejected while one is already running.
    pub async fn start(&self, tick_interval: Duration, duration: Duration) -> Result<(), ApiError> {
        if tick_interval.is_zero() {
            return Err(ApiError::InvalidRequest("interval must be positive".into()));
        }
        if duration.is_zero() {
            return Err(ApiError::InvalidRequest("duration must be positive".into()));
        }
        tokio::fs::create_dir_all(&self.frames_dir)
            .await
            .map_err(anyhow::Error::from)?;

        {
            let mut inner = lock(&self.inner);
            if inner.state != JobState::Idle {
                return Err(ApiError::Busy("timelapse already running".into()));
            }
            *inner = JobInner::idle();
            inner.state = JobState::Running;
            inner.interval = tick_interval;
            inner.duration = duration;
            inner.started = Some(Instant::now());
        }

        let (tx, rx) = watch::channel(false);
        *lock(&self.stop_tx) = Some(tx);

        let handle = tokio::spawn(run_job(
            self.camera.clone(),
            self.frames_dir.clone(),
            self.inner.clone(),
            rx,
            tick_interval,
            duration,
        ));
        *lock(&self.task) = Some(handle);

        tracing::info!(
            interval_secs = tick_interval.as_secs_f64(),
            duration_secs = duration.as_secs_f64(),
            "timelapse started"
        );
        Ok(())
    }

    /// Cancels the pending next tick. An in-flight tick finishes first;
    /// captured frames stay on disk.
    pub fn stop(&self) {
        {
            let mut inner = lock(&self.inner);
            match inner.state {
                JobState::Idle => return,
                JobState::Running | JobState::Stopping => inner.state = JobState::Stopping,
            }
        }
        if let Some(tx) = lock(&self.stop_tx).as_ref() {
            let _ = tx.send(true);
        }
        tracing::info!("timelapse stop requested");
    }

    /// Non-blocking read; safe to call concurrently with ticking.
    pub fn status(&self) -> JobStatus {
        let inner = lock(&self.inner);
        let elapsed = match inner.state {
            JobState::Idle => inner.last_elapsed,
            _ => inner
                .started
                .map(|t| t.elapsed())
                .unwrap_or(inner.last_elapsed),
        };
        JobStatus {
            state: inner.state,
            interval_secs: inner.interval.as_secs_f64(),
            duration_secs: inner.duration.as_secs_f64(),
            elapsed_secs: elapsed.as_secs_f64(),
            frame_count: inner.frame_count,
            frames: inner.frames.clone(),
        }
    }

    /// Deletes every captured frame. Only valid while idle.
    pub async fn clear(&self) -> Result<u64, ApiError> {
        {
            let mut inner = lock(&self.inner);
            if inner.state != JobState::Idle {
                return Err(ApiError::Busy("timelapse running, stop it first".into()));
            }
            *inner = JobInner::idle();
        }

        let mut removed = 0u64;
        let mut entries = match tokio::fs::read_dir(&self.frames_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ApiError::Internal(e.into())),
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jpg")
                && tokio::fs::remove_file(&path).await.is_ok()
            {
                removed += 1;
            }
        }
        tracing::info!(removed, "timelapse frames cleared");
        Ok(removed)
    }

    /// Stops the job and waits for the background task to wind down. Used
    /// on process shutdown.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_job(
    camera: Arc<CameraService>,
    frames_dir: PathBuf,
    inner: Arc<Mutex<JobInner>>,
    mut stop_rx: watch::Receiver<bool>,
    tick_interval: Duration,
    duration: Duration,
) {
    // Ticks stay aligned to the job start; a slow capture skips missed
    // ticks instead of firing a burst afterwards.
    let mut tick = interval(tick_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = tick.tick() => {
                let plan = {
                    let mut inner = lock(&inner);
                    match (inner.state, inner.started) {
                        (JobState::Running, Some(started)) if started.elapsed() < duration => {
                            inner.tick_seq += 1;
                            TickPlan::Capture(inner.tick_seq)
                        }
                        _ => TickPlan::Finish,
                    }
                };
                let seq = match plan {
                    TickPlan::Capture(seq) => seq,
                    TickPlan::Finish => break,
                };

                // Frame names derive from the tick sequence: monotonic, and
                // a tick skipped while a stream holds the camera leaves a
                // gap that is never reused.
                let name = format!("frame_{seq:05}.jpg");
                match camera.timelapse_frame(&frames_dir.join(&name)).await {
                    FrameOutcome::Captured => {
                        let mut inner = lock(&inner);
                        inner.frame_count += 1;
                        inner.frames.push(name);
                    }
                    FrameOutcome::Busy(holder) => {
                        tracing::debug!(
                            holder = holder.as_str(),
                            tick = seq,
                            "tick skipped, camera busy"
                        );
                    }
                    FrameOutcome::Failed(reason) => {
                        tracing::warn!(error = %reason, tick = seq, "tick capture failed");
                    }
                }
            }
        }
    }

    let mut inner = lock(&inner);
    inner.last_elapsed = inner
        .started
        .map(|t| t.elapsed())
        .unwrap_or(Duration::ZERO);
    inner.state = JobState::Idle;
    inner.started = None;
    tracing::info!(
        frames = inner.frame_count,
        elapsed_secs = inner.last_elapsed.as_secs_f64(),
        "timelapse finished"
    );
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
