//! In-memory artifact registry
//!
//! Holds the current dependency view and latest rebuild action of every
//! artifact known to one engine. The map lock is only held for short,
//! non-suspending sections; callers serialize per artifact through
//! [`ArtifactLocks`](crate::locks::ArtifactLocks).

use crate::action::RebuildAction;
use crate::path::ArtifactId;
use crate::types::{ArtifactEntry, ArtifactRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Artifact id → entry table
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<ArtifactId, ArtifactEntry>>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with persisted records (no actions attached)
    pub async fn restore(&self, records: Vec<ArtifactRecord>) -> usize {
        let mut entries = self.entries.write().await;
        let count = records.len();
        for record in records {
            let _ = entries.insert(
                record.artifact.clone(),
                ArtifactEntry {
                    record,
                    action: None,
                },
            );
        }
        count
    }

    /// Clone of an entry
    pub async fn get(&self, artifact: &ArtifactId) -> Option<ArtifactEntry> {
        self.entries.read().await.get(artifact).cloned()
    }

    /// Clone of an entry's dependency view
    pub async fn record(&self, artifact: &ArtifactId) -> Option<ArtifactRecord> {
        self.entries
            .read()
            .await
            .get(artifact)
            .map(|entry| entry.record.clone())
    }

    /// Insert or replace an entry
    pub async fn commit(&self, entry: ArtifactEntry) {
        let _ = self
            .entries
            .write()
            .await
            .insert(entry.record.artifact.clone(), entry);
    }

    /// Replace only the action of an existing entry; false if unknown
    pub async fn set_action(&self, artifact: &ArtifactId, action: RebuildAction) -> bool {
        match self.entries.write().await.get_mut(artifact) {
            Some(entry) => {
                entry.action = Some(action);
                true
            }
            None => false,
        }
    }

    /// Snapshot of every dependency view, sorted by artifact id
    pub async fn records(&self) -> Vec<ArtifactRecord> {
        let mut records: Vec<_> = self
            .entries
            .read()
            .await
            .values()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| a.artifact.cmp(&b.artifact));
        records
    }
}
