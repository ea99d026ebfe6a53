//! File-backed snapshot store
//!
//! Snapshots are pretty-printed JSON so they stay diffable. Writes land in a
//! sibling temporary file first and are renamed into place.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use epictree_core::Forest;
use tracing::{debug, info};

use crate::{check_consistency, SnapshotError, SnapshotHandle, SnapshotResult, SnapshotStore};

/// Default snapshot location, relative to the working directory
pub const DEFAULT_SNAPSHOT_PATH: &str = "./WorkItems.json";

/// Snapshot store writing a single JSON file
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store that saves to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this store saves to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle of the file this store saves to
    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle::from(self.path.as_path())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for FileSnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_PATH)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, forest: &Forest) -> SnapshotResult<SnapshotHandle> {
        let data = serde_json::to_vec_pretty(forest)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SnapshotError::io(parent, e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &data)
            .await
            .map_err(|e| SnapshotError::io(&temp, e))?;

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(SnapshotError::io(&self.path, e));
        }

        info!(path = %self.path.display(), nodes = forest.len(), bytes = data.len(), "Saved snapshot");
        Ok(self.handle())
    }

    async fn load(&self, handle: &SnapshotHandle) -> SnapshotResult<Forest> {
        let path = handle.as_path();
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(handle.clone()));
            }
            Err(e) => return Err(SnapshotError::io(path, e)),
        };

        let forest: Forest = serde_json::from_slice(&data)?;
        debug!(path = %path.display(), nodes = forest.len(), "Loaded snapshot");
        check_consistency(handle, forest)
    }

    async fn exists(&self, handle: &SnapshotHandle) -> SnapshotResult<bool> {
        match tokio::fs::metadata(handle.as_path()).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SnapshotError::io(handle.as_path(), e)),
        }
    }
}
