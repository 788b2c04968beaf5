//! Directory-backed timestamp store
//!
//! Layout: one JSON document per artifact, named after the SHA-256 of the
//! normalized artifact id:
//!
//! ```text
//! <root>/
//!   3f1c…9a.json   {"artifact":"dist/site.css","dependencies":[…]}
//!   b07e…12.json
//! ```

use super::TimestampStore;
use crate::error::StoreError;
use crate::path::ArtifactId;
use crate::types::ArtifactRecord;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const DOCUMENT_EXT: &str = "json";

/// Durable store keeping one JSON document per artifact in a directory
#[derive(Debug, Clone)]
pub struct FsTimestampStore {
    root: PathBuf,
}

impl FsTimestampStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    /// Store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document holding `artifact`
    pub fn document_path(&self, artifact: &ArtifactId) -> PathBuf {
        let digest = Sha256::digest(artifact.as_str().as_bytes());
        self.root
            .join(format!("{}.{DOCUMENT_EXT}", hex::encode(digest)))
    }

    /// Remove every stored document, returning how many were deleted
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be listed or a document cannot be removed.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for path in self.document_paths().await? {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|source| StoreError::Io { path, source })?;
            removed += 1;
        }
        Ok(removed)
    }

    async fn document_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.root.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(io_err)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXT) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Write-fsync-rename so a crash never leaves a torn document behind
    async fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let temp_path = path.with_extension("tmp");

        let mut file = tokio::fs::File::create(&temp_path).await.map_err(io_err)?;
        file.write_all(data).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        tokio::fs::rename(&temp_path, path).await.map_err(io_err)?;

        if let Some(parent) = path.parent()
            && let Ok(dir) = tokio::fs::File::open(parent).await
        {
            // Not every filesystem supports syncing a directory handle
            let _ = dir.sync_all().await;
        }
        Ok(())
    }
}

#[async_trait]
impl TimestampStore for FsTimestampStore {
    async fn load_all(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        let mut records = Vec::new();
        for path in self.document_paths().await? {
            let data = tokio::fs::read(&path)
                .await
                .map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
            let record: ArtifactRecord = serde_json::from_slice(&data)
                .map_err(|source| StoreError::Serialization { path, source })?;
            records.push(record);
        }
        records.sort_by(|a, b| a.artifact.cmp(&b.artifact));
        debug!("Loaded {} timestamp records from {}", records.len(), self.root.display());
        Ok(records)
    }

    async fn upsert(&self, record: &ArtifactRecord) -> Result<(), StoreError> {
        let path = self.document_path(&record.artifact);
        let data = serde_json::to_vec_pretty(record).map_err(|source| {
            StoreError::Serialization {
                path: path.clone(),
                source,
            }
        })?;
        Self::atomic_write(&path, &data).await
    }
}
