//! Snapshot storage
//!
//! Stores hold exactly one snapshot. `load` distinguishes "nothing saved"
//! (`Ok(None)`) from "saved but unreadable" (`Err`), so callers can log the
//! two cases differently before falling back to defaults.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Somewhere a single snapshot of type `T` can be kept.
pub trait SnapshotStore<T> {
    fn save(&mut self, value: &T) -> Result<(), SaveError>;
    fn load(&self) -> Result<Option<T>, SaveError>;
}

/// Pretty-printed JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> SnapshotStore<T> for JsonFileStore
where
    T: Serialize + DeserializeOwned,
{
    fn save(&mut self, value: &T) -> Result<(), SaveError> {
        let text = serde_json::to_string_pretty(value)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<T>, SaveError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store holding the serialized JSON text.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    text: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with raw text, valid or not.
    pub fn with_raw(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl<T> SnapshotStore<T> for MemoryStore
where
    T: Serialize + DeserializeOwned,
{
    fn save(&mut self, value: &T) -> Result<(), SaveError> {
        self.text = Some(serde_json::to_string(value)?);
        Ok(())
    }

    fn load(&self) -> Result<Option<T>, SaveError> {
        match &self.text {
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
            None => Ok(None),
        }
    }
}

/// Writes snapshots to a JSON file from a tokio task.
///
/// `try_submit` never waits: if the queue is full the snapshot is dropped
/// and the next one will carry newer state anyway.
pub struct BackgroundSaver<T> {
    tx: mpsc::Sender<T>,
}

impl<T> BackgroundSaver<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// Start the writer task. It exits once every saver handle is dropped
    /// and the queue is drained; await the returned handle to flush.
    pub fn spawn(runtime: &Handle, path: PathBuf, queue_depth: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<T>(queue_depth.max(1));
        let task = runtime.spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                match write_json(&path, &snapshot).await {
                    Ok(()) => debug!(path = %path.display(), "snapshot written"),
                    Err(err) => error!(path = %path.display(), %err, "snapshot write failed"),
                }
            }
        });
        (Self { tx }, task)
    }

    pub fn try_submit(&self, snapshot: T) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("save queue full; snapshot dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("save writer stopped; snapshot dropped");
                false
            }
        }
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SaveError> {
    let text = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        health: f32,
        charges: u32,
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("saves/slot.json"));
        assert!(SnapshotStore::<Sample>::load(&store).unwrap().is_none());

        let sample = Sample { health: 0.1 + 0.2, charges: 3 };
        store.save(&sample).unwrap();
        assert_eq!(SnapshotStore::<Sample>::load(&store).unwrap(), Some(sample));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot.json");
        std::fs::write(&path, "{\"health\": ").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(
            SnapshotStore::<Sample>::load(&store),
            Err(SaveError::Json(_))
        ));
    }

    #[test]
    fn memory_store_round_trip_and_corruption() {
        let mut store = MemoryStore::new();
        let sample = Sample { health: 7.5, charges: 1 };
        store.save(&sample).unwrap();
        assert_eq!(SnapshotStore::<Sample>::load(&store).unwrap(), Some(sample));

        let broken = MemoryStore::with_raw("garbage");
        assert!(SnapshotStore::<Sample>::load(&broken).is_err());
    }

    #[tokio::test]
    async fn background_saver_writes_last_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg/slot.json");
        let (saver, task) = BackgroundSaver::spawn(&Handle::current(), path.clone(), 4);

        assert!(saver.try_submit(Sample { health: 1.0, charges: 0 }));
        assert!(saver.try_submit(Sample { health: 2.0, charges: 2 }));
        drop(saver);
        task.await.unwrap();

        let store = JsonFileStore::new(path);
        assert_eq!(
            SnapshotStore::<Sample>::load(&store).unwrap(),
            Some(Sample { health: 2.0, charges: 2 })
        );
    }
}
