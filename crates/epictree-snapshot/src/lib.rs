//! epictree snapshot store
//!
//! Saves an assembled [`Forest`] and loads it back so later runs (and
//! renderers) can skip the backend entirely. The snapshot format is a plain
//! JSON array of nodes in pre-order.

use std::fmt::{self, Debug, Display};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use epictree_core::{Forest, ForestError};
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileSnapshotStore;
pub use memory::InMemorySnapshotStore;

/// Identifies one stored snapshot: a file path or a generated key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotHandle(String);

impl SnapshotHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Get the string representation of the handle
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The handle interpreted as a filesystem path
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl Display for SnapshotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&Path> for SnapshotHandle {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for SnapshotHandle {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<&str> for SnapshotHandle {
    fn from(handle: &str) -> Self {
        Self(handle.to_string())
    }
}

/// Errors that can occur while saving or loading snapshots
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot not found: {0}")]
    NotFound(SnapshotHandle),

    #[error("Snapshot {handle} is inconsistent: {source}")]
    Inconsistent {
        handle: SnapshotHandle,
        #[source]
        source: ForestError,
    },
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Contract for snapshot persistence
#[async_trait]
pub trait SnapshotStore: Send + Sync + Debug {
    /// Persist `forest`, replacing any previous snapshot under the same handle
    async fn save(&self, forest: &Forest) -> SnapshotResult<SnapshotHandle>;

    /// Load a previously saved forest, rejecting structurally broken ones
    async fn load(&self, handle: &SnapshotHandle) -> SnapshotResult<Forest>;

    /// Whether a snapshot exists under `handle`
    async fn exists(&self, handle: &SnapshotHandle) -> SnapshotResult<bool>;
}

/// Reject forests whose parent and child links disagree
pub(crate) fn check_consistency(handle: &SnapshotHandle, forest: Forest) -> SnapshotResult<Forest> {
    forest.validate().map_err(|source| SnapshotError::Inconsistent {
        handle: handle.clone(),
        source,
    })?;
    Ok(forest)
}
