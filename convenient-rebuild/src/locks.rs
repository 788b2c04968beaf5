//! Per-artifact mutual exclusion
//!
//! Two registrations of the same artifact must not interleave their
//! probe-compare-persist-rebuild sequences, otherwise both may observe a
//! change and run the rebuild action twice. Unrelated artifacts never wait on
//! each other.
//!
//! A table slot lives only while someone holds or waits for it. Guards and
//! waiters keep their own `Arc` to the mutex, so a slot whose only reference
//! is the table itself is idle and gets pruned on the next acquire.

use crate::path::ArtifactId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock table keyed by normalized artifact id
#[derive(Debug, Default)]
pub struct ArtifactLocks {
    locks: Mutex<HashMap<ArtifactId, Arc<Mutex<()>>>>,
}

/// Held for the whole check-then-act sequence; released on drop
pub type ArtifactGuard = OwnedMutexGuard<()>;

impl ArtifactLocks {
    /// Empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `artifact`
    pub async fn acquire(&self, artifact: &ArtifactId) -> ArtifactGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Clones only happen under the table lock, so a count of one is stable here
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(artifact.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::NormalizedPath;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_artifact_serializes() {
        let locks = Arc::new(ArtifactLocks::new());
        let id = NormalizedPath::new("dist/app.js").unwrap();

        let guard = locks.acquire(&id).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_artifacts_do_not_block() {
        let locks = ArtifactLocks::new();
        let _a = locks.acquire(&NormalizedPath::new("a.css").unwrap()).await;
        let b = tokio::time::timeout(
            Duration::from_millis(200),
            locks.acquire(&NormalizedPath::new("b.css").unwrap()),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_slots_are_pruned() {
        let locks = ArtifactLocks::new();
        for i in 0..50 {
            let _guard = locks.acquire(&NormalizedPath::new(format!("dist/{i}.css")).unwrap()).await;
        }
        assert_eq!(locks.len().await, 1);

        let held = locks.acquire(&NormalizedPath::new("dist/held.css").unwrap()).await;
        let other = locks.acquire(&NormalizedPath::new("dist/other.css").unwrap()).await;
        assert_eq!(locks.len().await, 2);

        // A held slot survives pruning and still excludes
        drop(other);
        let retry = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(&NormalizedPath::new("dist/held.css").unwrap()),
        )
        .await;
        assert!(retry.is_err());
        drop(held);
        let _again = locks.acquire(&NormalizedPath::new("dist/held.css").unwrap()).await;
    }
}
