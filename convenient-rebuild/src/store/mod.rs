//! Durable storage for recorded dependency timestamps
//!
//! A store holds one [`ArtifactRecord`] per artifact id. Writes replace the
//! whole record for that id; there is no partial merge at the store layer.

mod fs;
mod memory;

pub use fs::FsTimestampStore;
pub use memory::MemoryTimestampStore;

use crate::error::StoreError;
use crate::types::ArtifactRecord;
use async_trait::async_trait;

/// Backend persisting artifact records across process restarts
#[async_trait]
pub trait TimestampStore: Send + Sync {
    /// Load every persisted record
    ///
    /// # Errors
    ///
    /// Fails when the backend is unreachable or holds undecodable data.
    async fn load_all(&self) -> Result<Vec<ArtifactRecord>, StoreError>;

    /// Insert or fully replace the record for `record.artifact`
    ///
    /// # Errors
    ///
    /// Fails when the backend rejects the write.
    async fn upsert(&self, record: &ArtifactRecord) -> Result<(), StoreError>;
}
