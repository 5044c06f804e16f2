// Single-slot snapshot store: the latest snapshot in memory plus one file
// on disk, fully overwritten on every run.

use crate::models::Snapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            current: RwLock::new(None),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted snapshot from disk, if one exists. Used once at
    /// startup so a restart keeps serving the last inventory.
    pub async fn load_persisted(&self) -> anyhow::Result<bool> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        *self.current.write().await = Some(Arc::new(snapshot));
        Ok(true)
    }

    /// Latest snapshot, if any run has completed. Readers get the whole
    /// snapshot or nothing; the slot swap is atomic.
    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    /// Replaces the slot wholesale. A reader holding the previous Arc keeps
    /// a consistent view of the superseded snapshot.
    pub async fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(snapshot.clone());
        snapshot
    }

    /// Writes the snapshot to disk via temp-file-then-rename, so the file
    /// on disk is always one complete snapshot.
    pub async fn persist(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
