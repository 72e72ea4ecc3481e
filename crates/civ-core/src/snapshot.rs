//! Push-based observers of the sandbox view.
//!
//! After every turn the orchestrator builds a [`SandboxSnapshot`] and hands
//! it to each registered [`SnapshotListener`]. Publishing is best-effort: a
//! listener error is logged by the orchestrator and never stops the turn.

use std::path::{Path, PathBuf};

use civ_types::SandboxSnapshot;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Snapshots queued for the file writer before new ones are dropped.
const WRITE_QUEUE: usize = 4;

/// Errors a listener can report.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Writing the snapshot file failed.
    #[error("snapshot write to {path} failed: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The background writer for this path has exited.
    #[error("snapshot writer for {path} has stopped")]
    WriterClosed {
        /// Destination path.
        path: PathBuf,
    },
}

/// Receives the sandbox view after each turn.
pub trait SnapshotListener: Send {
    /// Called once per turn with the post-turn view. Must not block.
    fn publish(&mut self, snapshot: &SandboxSnapshot) -> Result<(), SnapshotError>;
}

/// Writes the snapshot as JSON to a fixed path.
///
/// `publish` only serializes and queues; a background task does the file
/// I/O with `tokio::fs`, writing a sibling temp file and renaming it into
/// place so readers never see a half-written snapshot. If the writer falls
/// behind, the newest snapshots are dropped until it catches up.
#[derive(Debug)]
pub struct JsonFileSnapshot {
    path: PathBuf,
    queue: mpsc::Sender<Vec<u8>>,
}

impl JsonFileSnapshot {
    /// Start a writer task for `path`. Must be called inside a `tokio`
    /// runtime.
    ///
    /// The task ends once the listener is dropped and the queue is drained;
    /// await the handle to be sure the last snapshot is on disk.
    pub fn spawn(path: impl Into<PathBuf>) -> (Self, JoinHandle<()>) {
        let path = path.into();
        let (queue, mut pending) = mpsc::channel::<Vec<u8>>(WRITE_QUEUE);
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            while let Some(json) = pending.recv().await {
                if let Err(e) = write_atomic(&writer_path, &json).await {
                    warn!(component = "snapshot", error = %e, "Snapshot write failed");
                }
            }
        });
        (Self { path, queue }, writer)
    }

    /// The destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotListener for JsonFileSnapshot {
    fn publish(&mut self, snapshot: &SandboxSnapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        match self.queue.try_send(json) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(
                    component = "snapshot",
                    turn = snapshot.turn,
                    "Writer busy, snapshot dropped"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SnapshotError::WriterClosed {
                path: self.path.clone(),
            }),
        }
    }
}

/// Write `json` next to `path`, then rename it over `path`.
async fn write_atomic(path: &Path, json: &[u8]) -> Result<(), SnapshotError> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    let io_error = |source: std::io::Error| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&staging, json).await.map_err(io_error)?;
    tokio::fs::rename(&staging, path).await.map_err(io_error)
}

/// Publishes snapshots into a `tokio` watch channel, so any number of
/// in-process readers can see the latest view.
#[derive(Debug)]
pub struct WatchSnapshot {
    tx: watch::Sender<SandboxSnapshot>,
}

impl WatchSnapshot {
    /// Create the listener and a receiver seeded with an empty snapshot.
    pub fn channel() -> (Self, watch::Receiver<SandboxSnapshot>) {
        let (tx, rx) = watch::channel(SandboxSnapshot::default());
        (Self { tx }, rx)
    }

    /// Another receiver for the same channel.
    pub fn subscribe(&self) -> watch::Receiver<SandboxSnapshot> {
        self.tx.subscribe()
    }
}

impl SnapshotListener for WatchSnapshot {
    fn publish(&mut self, snapshot: &SandboxSnapshot) -> Result<(), SnapshotError> {
        // Succeeds with no receivers too; the latest value is kept.
        self.tx.send_replace(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use civ_types::{AgentId, AgentView};

    use super::*;

    fn snapshot(turn: u64) -> SandboxSnapshot {
        SandboxSnapshot {
            turn,
            agents: vec![AgentView {
                id: AgentId::new(),
                name: "Agent-0".to_owned(),
                x: 12.5,
                y: 80.0,
                emotion: "\u{1F4AC}".to_owned(),
                action: "Wandering".to_owned(),
                speech: "Hello".to_owned(),
            }],
        }
    }

    #[tokio::test]
    async fn file_snapshot_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandbox_state.json");
        let (mut listener, writer) = JsonFileSnapshot::spawn(&path);

        listener.publish(&snapshot(1)).unwrap();
        listener.publish(&snapshot(2)).unwrap();
        drop(listener);
        writer.await.unwrap();

        let written: SandboxSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.turn, 2);
        assert_eq!(written.agents.len(), 1);
        assert!(!dir.path().join("sandbox_state.json.tmp").exists());
    }

    #[tokio::test]
    async fn write_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_atomic(&dir.path().join("missing/state.json"), b"{}").await;
        assert!(matches!(result, Err(SnapshotError::Io { .. })));
    }

    #[tokio::test]
    async fn missing_directory_does_not_stop_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/state.json");
        let (mut listener, writer) = JsonFileSnapshot::spawn(path);
        assert!(listener.publish(&snapshot(1)).is_ok());
        drop(listener);
        assert!(writer.await.is_ok());
    }

    #[tokio::test]
    async fn publish_after_writer_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut listener, writer) = JsonFileSnapshot::spawn(dir.path().join("state.json"));
        writer.abort();
        assert!(writer.await.is_err());
        assert!(matches!(
            listener.publish(&snapshot(3)),
            Err(SnapshotError::WriterClosed { .. })
        ));
    }

    #[test]
    fn watch_snapshot_keeps_latest() {
        let (mut listener, rx) = WatchSnapshot::channel();
        assert_eq!(rx.borrow().turn, 0);
        listener.publish(&snapshot(7)).unwrap();
        assert_eq!(rx.borrow().turn, 7);
        assert_eq!(listener.subscribe().borrow().agents.len(), 1);
    }
}
