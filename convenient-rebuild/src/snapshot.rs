//! Ad-hoc single-file timestamp snapshots
//!
//! Lets a caller remember a file's modification time and later ask whether
//! it still matches, without declaring an artifact. Snapshots live only for
//! the process lifetime and are never persisted.

use crate::error::{EngineError, Result};
use crate::path::NormalizedPath;
use crate::probe::FileProbe;
use crate::types::Timestamp;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

/// Remembered timestamps keyed by normalized path
#[derive(Debug, Default)]
pub struct TimestampSnapshots {
    saved: Mutex<HashMap<NormalizedPath, Timestamp>>,
}

impl TimestampSnapshots {
    /// Empty snapshot table
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `path` and remember its current modification time
    ///
    /// # Errors
    ///
    /// Fails if the path cannot be normalized or stat'ed.
    pub async fn save(&self, probe: &dyn FileProbe, path: impl AsRef<Path>) -> Result<Timestamp> {
        let path = NormalizedPath::new(path)?;
        debug!("Saving file timestamp: {}", path);
        let ts = probe
            .modified(path.as_path())
            .await
            .map_err(|source| EngineError::Probe {
                path: path.clone(),
                source,
            })?;
        let _ = self.saved.lock().await.insert(path, ts);
        Ok(ts)
    }

    /// Whether `path` still has the modification time saved earlier
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSnapshot`] if the path was never saved,
    /// or [`EngineError::Probe`] if it can no longer be stat'ed.
    pub async fn is_unchanged(&self, probe: &dyn FileProbe, path: impl AsRef<Path>) -> Result<bool> {
        let path = NormalizedPath::new(path)?;
        let saved = self
            .saved
            .lock()
            .await
            .get(&path)
            .copied()
            .ok_or_else(|| EngineError::UnknownSnapshot { path: path.clone() })?;
        let current = probe
            .modified(path.as_path())
            .await
            .map_err(|source| EngineError::Probe {
                path: path.clone(),
                source,
            })?;
        debug!("Checking file timestamp {}: saved {} current {}", path, saved, current);
        Ok(saved == current)
    }
}
