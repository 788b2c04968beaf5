//! In-memory timestamp store

use super::TimestampStore;
use crate::error::StoreError;
use crate::path::ArtifactId;
use crate::types::ArtifactRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Shared {
    records: Mutex<BTreeMap<ArtifactId, ArtifactRecord>>,
    upserts: AtomicUsize,
    fail_loads: AtomicBool,
    fail_upserts: AtomicBool,
}

/// Process-local store; clones share the same records
///
/// Useful for embedding and for tests that simulate a restart by
/// bootstrapping a second engine from a clone of the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTimestampStore {
    shared: Arc<Shared>,
}

impl MemoryTimestampStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with records
    pub fn with_records(records: impl IntoIterator<Item = ArtifactRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.artifact.clone(), record))
            .collect();
        Self {
            shared: Arc::new(Shared {
                records: Mutex::new(map),
                ..Shared::default()
            }),
        }
    }

    /// Stored record for an artifact
    pub async fn get(&self, artifact: &ArtifactId) -> Option<ArtifactRecord> {
        self.shared.records.lock().await.get(artifact).cloned()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.shared.records.lock().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.shared.records.lock().await.is_empty()
    }

    /// Number of successful upserts so far
    pub fn upsert_count(&self) -> usize {
        self.shared.upserts.load(Ordering::SeqCst)
    }

    /// Make subsequent `load_all` calls fail
    pub fn set_fail_loads(&self, fail: bool) {
        self.shared.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `upsert` calls fail
    pub fn set_fail_upserts(&self, fail: bool) {
        self.shared.fail_upserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TimestampStore for MemoryTimestampStore {
    async fn load_all(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        if self.shared.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(self.shared.records.lock().await.values().cloned().collect())
    }

    async fn upsert(&self, record: &ArtifactRecord) -> Result<(), StoreError> {
        if self.shared.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store rejected the write".into()));
        }
        let _previous = self
            .shared
            .records
            .lock()
            .await
            .insert(record.artifact.clone(), record.clone());
        let _ = self.shared.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
