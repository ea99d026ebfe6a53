//! In-memory snapshot store
//!
//! Intended for tests: snapshots live as serialized JSON under generated
//! handles and are lost when the store is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use epictree_core::Forest;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{check_consistency, SnapshotError, SnapshotHandle, SnapshotResult, SnapshotStore};

/// Snapshot store keeping serialized forests in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<SnapshotHandle, Vec<u8>>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under a handle, bypassing serialization
    pub async fn insert_raw(&self, handle: SnapshotHandle, data: Vec<u8>) {
        self.snapshots.write().await.insert(handle, data);
    }

    /// Number of stored snapshots
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, forest: &Forest) -> SnapshotResult<SnapshotHandle> {
        // Same bytes a file snapshot would hold
        let data = serde_json::to_vec(forest)?;
        let handle = SnapshotHandle::new(format!("snapshot:{}", Uuid::new_v4()));

        self.snapshots.write().await.insert(handle.clone(), data);
        Ok(handle)
    }

    async fn load(&self, handle: &SnapshotHandle) -> SnapshotResult<Forest> {
        let store = self.snapshots.read().await;
        let data = store
            .get(handle)
            .ok_or_else(|| SnapshotError::NotFound(handle.clone()))?;

        let forest: Forest = serde_json::from_slice(data)?;
        check_consistency(handle, forest)
    }

    async fn exists(&self, handle: &SnapshotHandle) -> SnapshotResult<bool> {
        Ok(self.snapshots.read().await.contains_key(handle))
    }
}
