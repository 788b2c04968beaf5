//! Filesystem probing

use crate::types::Timestamp;
use async_trait::async_trait;
use std::path::Path;

/// Reads modification times and existence of paths
#[async_trait]
pub trait FileProbe: Send + Sync {
    /// Current modification time of `path`
    ///
    /// # Errors
    ///
    /// Fails when the path is missing or its metadata cannot be read.
    async fn modified(&self, path: &Path) -> std::io::Result<Timestamp>;

    /// Whether `path` currently exists
    async fn exists(&self, path: &Path) -> bool;
}

/// [`FileProbe`] backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileProbe;

#[async_trait]
impl FileProbe for TokioFileProbe {
    async fn modified(&self, path: &Path) -> std::io::Result<Timestamp> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Timestamp::from(metadata.modified()?))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
