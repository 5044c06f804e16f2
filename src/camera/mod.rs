// Mutual exclusion over the single physical camera.

mod capture;

pub use capture::{CameraService, CameraStream, FrameOutcome};

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Who is asking for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    Stream,
    Photo,
    TimelapseFrame,
}

impl CameraKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraKind::Stream => "stream",
            CameraKind::Photo => "photo",
            CameraKind::TimelapseFrame => "timelapse_frame",
        }
    }
}

/// Single-holder gate. Requests against a held lock fail fast with the
/// current holder instead of queueing; a stream keeps the lock for its
/// entire lifetime, which by design starves photo and timelapse captures
/// until it is stopped.
#[derive(Debug, Default)]
pub struct CameraLock {
    holder: Mutex<Option<CameraKind>>,
}

impl CameraLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Immediate acquire-or-busy; Err carries the current holder.
    pub fn try_acquire(self: &Arc<Self>, kind: CameraKind) -> Result<CameraLease, CameraKind> {
        let mut holder = self.holder.lock().unwrap_or_else(|e| e.into_inner());
        match *holder {
            Some(current) => Err(current),
            None => {
                *holder = Some(kind);
                tracing::debug!(kind = kind.as_str(), "camera lock acquired");
                Ok(CameraLease {
                    lock: self.clone(),
                    kind,
                })
            }
        }
    }

    pub fn holder(&self) -> Option<CameraKind> {
        *self.holder.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holding one of these IS holding the camera. Release happens on drop, on
/// every exit path; a lease can only be dropped once, so release is
/// idempotent by construction.
#[derive(Debug)]
pub struct CameraLease {
    lock: Arc<CameraLock>,
    kind: CameraKind,
}

impl CameraLease {
    pub fn kind(&self) -> CameraKind {
        self.kind
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        let mut holder = self.lock.holder.lock().unwrap_or_else(|e| e.into_inner());
        *holder = None;
        tracing::debug!(kind = self.kind.as_str(), "camera lock released");
    }
}
