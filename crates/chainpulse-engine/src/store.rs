//! Snapshot persistence behind a small store trait.
//!
//! The engine reads the previous snapshot once at the start of a run and
//! writes the merged snapshot once at the end; abstracting that behind
//! [`SnapshotStore`] lets the same pipeline serve a static-site build
//! (files on disk) and the HTTP mode (an in-process cache) unchanged.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chainpulse_types::Snapshot;
use tracing::{debug, info};

use crate::error::EngineError;

/// File name of the persisted snapshot document inside each output
/// directory's `data/` subdirectory.
const SNAPSHOT_FILE: &str = "metrics.json";

/// Load/save interface for the single current snapshot.
pub trait SnapshotStore {
    /// Read the previous snapshot, if one exists and parses.
    fn load(&self) -> Result<Option<Snapshot>, EngineError>;

    /// Persist the snapshot, replacing any previous one.
    fn save(&self, snapshot: &Snapshot) -> Result<(), EngineError>;
}

/// Snapshot store backed by one or more output directories.
///
/// `save` writes `<dir>/data/metrics.json` in every directory; `load`
/// returns the first document that exists and parses. Writes go through a
/// temp file and rename so a reader never observes a partial document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dirs: Vec<PathBuf>,
}

impl FileStore {
    /// Create a store over the given output directories.
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Path of the snapshot document inside one output directory.
    fn snapshot_path(dir: &Path) -> PathBuf {
        dir.join("data").join(SNAPSHOT_FILE)
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Result<Option<Snapshot>, EngineError> {
        for dir in &self.dirs {
            let path = Self::snapshot_path(dir);
            let Ok(text) = std::fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str(&text) {
                Ok(snapshot) => {
                    debug!(path = %path.display(), "loaded previous snapshot");
                    return Ok(Some(snapshot));
                }
                Err(e) => {
                    // A corrupt document is treated as absent, not fatal.
                    debug!(path = %path.display(), error = %e, "ignoring unparseable snapshot");
                }
            }
        }
        Ok(None)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), EngineError> {
        let text = serde_json::to_string(snapshot)?;
        for dir in &self.dirs {
            let path = Self::snapshot_path(dir);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, &text)?;
            std::fs::rename(&tmp, &path)?;
            info!(path = %path.display(), bytes = text.len(), "wrote snapshot");
        }
        Ok(())
    }
}

/// In-memory snapshot store used by the HTTP server and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, EngineError> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), EngineError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(snapshot.clone());
        Ok(())
    }
}
