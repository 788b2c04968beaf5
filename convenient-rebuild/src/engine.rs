//! Registration / invalidation engine
//!
//! The engine owns the artifact registry for one process (or one test) and
//! decides, per registration, whether a producer's rebuild action has to run.
//!
//! ## Checked modes
//!
//! 1. Normalize the artifact id and dependency paths.
//! 2. Take the per-artifact lock for the whole sequence.
//! 3. Probe every dependency concurrently. A probe failure aborts the call
//!    before anything is committed.
//! 4. A dependency that is new, or whose timestamp differs from the recorded
//!    one, marks the artifact as changed. Dropping a dependency does not.
//! 5. Changed: persist the new record and rebuild (order set by
//!    [`PersistOrdering`]). Unchanged: rebuild only if the artifact is missing.
//!
//! ## Trusted mode
//!
//! Every registration runs its action. The registry, the store and the
//! filesystem are never touched.

use crate::action::RebuildAction;
use crate::error::{EngineError, Result};
use crate::locks::ArtifactLocks;
use crate::mode::Mode;
use crate::path::{ArtifactId, IntoDependencies, NormalizedPath};
use crate::probe::{FileProbe, TokioFileProbe};
use crate::registry::Registry;
use crate::snapshot::TimestampSnapshots;
use crate::store::TimestampStore;
use crate::types::{ArtifactEntry, ArtifactRecord, DependencyRecord, RebuildOutcome, RebuildReason, Timestamp};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// When updated timestamps are written relative to the rebuild action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum PersistOrdering {
    /// Persist first, then rebuild. A store failure skips the rebuild; a
    /// rebuild failure leaves the new timestamps persisted.
    #[default]
    BeforeRebuild,

    /// Rebuild first, persist only on success. The registry takes the new
    /// view only once both succeeded, so a failed rebuild or write costs a
    /// redundant rebuild next time, never a stale artifact.
    AfterRebuild,
}

/// Engine settings fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Execution mode
    pub mode: Mode,
    /// Persist/rebuild ordering for changed artifacts
    pub persist_ordering: PersistOrdering,
}

impl EngineConfig {
    /// Config with the default persist ordering
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            persist_ordering: PersistOrdering::default(),
        }
    }

    /// Override the persist ordering
    #[must_use]
    pub fn with_persist_ordering(mut self, persist_ordering: PersistOrdering) -> Self {
        self.persist_ordering = persist_ordering;
        self
    }
}

/// Read-only staleness report for a known artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Recorded timestamps match and the artifact exists
    UpToDate,
    /// These recorded dependencies have a different timestamp now
    Stale {
        /// Dependencies whose timestamp moved
        changed: Vec<NormalizedPath>,
    },
    /// Timestamps match but the artifact is absent on disk
    ArtifactMissing,
}

/// Dependency-aware rebuild cache
pub struct RebuildEngine {
    config: EngineConfig,
    store: Option<Arc<dyn TimestampStore>>,
    probe: Arc<dyn FileProbe>,
    registry: Registry,
    locks: ArtifactLocks,
    snapshots: TimestampSnapshots,
}

impl std::fmt::Debug for RebuildEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildEngine")
            .field("config", &self.config)
            .field("has_store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl RebuildEngine {
    /// Engine in [`Mode::Trusted`]; needs no timestamp store
    pub fn trusted() -> Self {
        Self::from_parts(EngineConfig::new(Mode::Trusted), None, Arc::new(TokioFileProbe))
    }

    /// Start an engine, loading every persisted record in checked modes
    ///
    /// In [`Mode::Trusted`] the store is not consulted at all.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Bootstrap`] if the store cannot be loaded. The
    /// engine refuses to start without its baseline rather than guessing.
    pub async fn bootstrap(
        config: EngineConfig,
        store: Arc<dyn TimestampStore>,
        probe: Arc<dyn FileProbe>,
    ) -> Result<Self> {
        if !config.mode.performs_checks() {
            info!("Starting rebuild engine in {} mode, timestamp store unused", config.mode);
            return Ok(Self::from_parts(config, None, probe));
        }

        let records = store.load_all().await.map_err(EngineError::Bootstrap)?;
        let engine = Self::from_parts(config, Some(store), probe);
        let restored = engine.registry.restore(records).await;
        info!(
            "Starting rebuild engine in {} mode with {} recorded artifacts",
            config.mode, restored
        );
        Ok(engine)
    }

    fn from_parts(
        config: EngineConfig,
        store: Option<Arc<dyn TimestampStore>>,
        probe: Arc<dyn FileProbe>,
    ) -> Self {
        Self {
            config,
            store,
            probe,
            registry: Registry::new(),
            locks: ArtifactLocks::new(),
            snapshots: TimestampSnapshots::new(),
        }
    }

    /// Execution mode
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Engine settings
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Declare `artifact` as generated from `dependencies` by `action`, and
    /// run the action if the artifact is out of date
    ///
    /// `dependencies` may be a single path or a list. Re-registering replaces
    /// the dependency list and the action; a new action alone never forces a
    /// rebuild.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidPath`] / [`EngineError::NoDependencies`] for bad input
    /// - [`EngineError::Probe`] if a dependency cannot be stat'ed; nothing is updated
    /// - [`EngineError::Persist`] if the store rejects the new timestamps
    /// - [`EngineError::Rebuild`] if the action fails
    pub async fn register(
        &self,
        artifact: impl AsRef<Path>,
        dependencies: impl IntoDependencies,
        action: RebuildAction,
    ) -> Result<RebuildOutcome> {
        let artifact = NormalizedPath::new(artifact)?;
        let dependencies = dependencies.into_dependencies()?;
        if dependencies.is_empty() {
            return Err(EngineError::NoDependencies { artifact });
        }

        if !self.config.mode.performs_checks() {
            return self.rebuild(&artifact, &action, RebuildReason::Trusted).await;
        }

        debug!("Registering generated file: {}", artifact);
        if self.config.mode.is_verbose() {
            for dependency in &dependencies {
                debug!("Dependency file: {}", dependency);
            }
        }

        let _guard = self.locks.acquire(&artifact).await;

        let previous = self.registry.record(&artifact).await;
        let probed = self.probe_all(dependencies.iter()).await?;

        let mut changed = false;
        for dependency in &probed {
            let recorded = previous
                .as_ref()
                .and_then(|record| record.last_seen(&dependency.path));
            if recorded != Some(dependency.last_seen) {
                changed = true;
            }
            self.trace_dependency(&dependency.path, recorded, dependency.last_seen);
        }

        let next = ArtifactRecord {
            artifact: artifact.clone(),
            dependencies: probed,
        };
        self.settle(previous, next, Some(action), changed).await
    }

    /// Re-validate an already registered artifact against its recorded
    /// dependencies, rebuilding with its stored action if stale
    ///
    /// Unknown artifacts (and every artifact in trusted mode, which keeps no
    /// registry) yield [`RebuildOutcome::NotRegistered`].
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register), plus [`EngineError::MissingAction`]
    /// when a rebuild is needed for an artifact restored from the store that no
    /// producer has registered in this process.
    pub async fn check_and_rebuild_if_stale(
        &self,
        artifact: impl AsRef<Path>,
    ) -> Result<RebuildOutcome> {
        let artifact = NormalizedPath::new(artifact)?;
        if !self.config.mode.performs_checks() {
            return Ok(RebuildOutcome::NotRegistered);
        }

        debug!("Checking if need to rebuild: {}", artifact);
        let _guard = self.locks.acquire(&artifact).await;

        let Some(entry) = self.registry.get(&artifact).await else {
            return Ok(RebuildOutcome::NotRegistered);
        };

        let probed = self
            .probe_all(entry.record.dependencies.iter().map(|dep| &dep.path))
            .await?;

        let mut next = entry.record.clone();
        let mut changed = false;
        for (recorded, current) in next.dependencies.iter_mut().zip(&probed) {
            self.trace_dependency(&recorded.path, Some(recorded.last_seen), current.last_seen);
            if recorded.last_seen != current.last_seen {
                recorded.last_seen = current.last_seen;
                changed = true;
            }
        }

        self.settle(Some(entry.record), next, entry.action, changed)
            .await
    }

    /// Re-supply the rebuild action of a known artifact without touching its
    /// dependencies; returns whether the artifact was known
    pub async fn attach_action(&self, artifact: impl AsRef<Path>, action: RebuildAction) -> Result<bool> {
        let artifact = NormalizedPath::new(artifact)?;
        if !self.config.mode.performs_checks() {
            return Ok(false);
        }
        let _guard = self.locks.acquire(&artifact).await;
        Ok(self.registry.set_action(&artifact, action).await)
    }

    /// Report whether a known artifact is stale, without persisting or
    /// rebuilding anything
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Probe`] if a recorded dependency cannot be stat'ed.
    pub async fn status(&self, artifact: impl AsRef<Path>) -> Result<Option<ArtifactStatus>> {
        let artifact = NormalizedPath::new(artifact)?;
        let Some(record) = self.registry.record(&artifact).await else {
            return Ok(None);
        };

        let probed = self
            .probe_all(record.dependencies.iter().map(|dep| &dep.path))
            .await?;
        let changed: Vec<NormalizedPath> = record
            .dependencies
            .iter()
            .zip(probed)
            .filter(|(recorded, current)| recorded.last_seen != current.last_seen)
            .map(|(_, current)| current.path)
            .collect();

        if !changed.is_empty() {
            return Ok(Some(ArtifactStatus::Stale { changed }));
        }
        if self.probe.exists(artifact.as_path()).await {
            Ok(Some(ArtifactStatus::UpToDate))
        } else {
            Ok(Some(ArtifactStatus::ArtifactMissing))
        }
    }

    /// Current dependency view of every known artifact, sorted by id
    pub async fn entries(&self) -> Vec<ArtifactRecord> {
        self.registry.records().await
    }

    /// Remember the current modification time of `path`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Probe`] if the path cannot be stat'ed.
    pub async fn save_file_timestamp(&self, path: impl AsRef<Path>) -> Result<Timestamp> {
        self.snapshots.save(self.probe.as_ref(), path).await
    }

    /// Whether `path` still has the modification time saved earlier
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSnapshot`] if the path was never saved.
    pub async fn check_file_timestamp(&self, path: impl AsRef<Path>) -> Result<bool> {
        self.snapshots.is_unchanged(self.probe.as_ref(), path).await
    }

    /// Probe dependencies concurrently, keeping their order
    async fn probe_all<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a NormalizedPath>,
    ) -> Result<Vec<DependencyRecord>> {
        let probes = paths.into_iter().map(|path| async move {
            let last_seen = self
                .probe
                .modified(path.as_path())
                .await
                .map_err(|source| EngineError::Probe {
                    path: path.clone(),
                    source,
                })?;
            Ok::<_, EngineError>(DependencyRecord {
                path: path.clone(),
                last_seen,
            })
        });
        try_join_all(probes).await
    }

    /// Commit the new view and run the action if needed
    ///
    /// Called with the artifact lock held.
    async fn settle(
        &self,
        previous: Option<ArtifactRecord>,
        next: ArtifactRecord,
        action: Option<RebuildAction>,
        changed: bool,
    ) -> Result<RebuildOutcome> {
        let artifact = next.artifact.clone();

        if !changed {
            self.registry
                .commit(ArtifactEntry {
                    record: next,
                    action: action.clone(),
                })
                .await;

            if self.probe.exists(artifact.as_path()).await {
                debug!("{} is up to date", artifact);
                return Ok(RebuildOutcome::UpToDate);
            }
            let action = action.ok_or_else(|| EngineError::MissingAction {
                artifact: artifact.clone(),
            })?;
            return self
                .rebuild(&artifact, &action, RebuildReason::ArtifactMissing)
                .await;
        }

        let Some(action) = action else {
            return Err(EngineError::MissingAction { artifact });
        };

        match self.config.persist_ordering {
            PersistOrdering::BeforeRebuild => {
                self.persist(&next).await?;
                self.registry
                    .commit(ArtifactEntry {
                        record: next,
                        action: Some(Arc::clone(&action)),
                    })
                    .await;
                self.rebuild(&artifact, &action, RebuildReason::DependenciesChanged)
                    .await
            }
            PersistOrdering::AfterRebuild => {
                let result = match self
                    .rebuild(&artifact, &action, RebuildReason::DependenciesChanged)
                    .await
                {
                    Ok(outcome) => self.persist(&next).await.map(|()| outcome),
                    Err(err) => Err(err),
                };

                match result {
                    Ok(outcome) => {
                        self.registry
                            .commit(ArtifactEntry {
                                record: next,
                                action: Some(action),
                            })
                            .await;
                        Ok(outcome)
                    }
                    Err(err) => {
                        // Registry keeps the previous view so the next call
                        // detects the change again
                        if previous.is_some() {
                            let _ = self.registry.set_action(&artifact, action).await;
                        }
                        Err(err)
                    }
                }
            }
        }
    }

    async fn persist(&self, record: &ArtifactRecord) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.upsert(record).await.map_err(|source| {
            warn!("Failed to persist timestamps for {}: {}", record.artifact, source);
            EngineError::Persist {
                artifact: record.artifact.clone(),
                source,
            }
        })
    }

    async fn rebuild(
        &self,
        artifact: &ArtifactId,
        action: &RebuildAction,
        reason: RebuildReason,
    ) -> Result<RebuildOutcome> {
        info!("Building {} ({})", artifact, reason);
        action().await.map_err(|source| EngineError::Rebuild {
            artifact: artifact.clone(),
            source,
        })?;
        Ok(RebuildOutcome::Rebuilt(reason))
    }

    fn trace_dependency(&self, path: &NormalizedPath, recorded: Option<Timestamp>, current: Timestamp) {
        if !self.config.mode.is_verbose() {
            return;
        }
        match recorded {
            None => debug!("{}: first seen at {}", path, current),
            Some(recorded) if recorded == current => debug!("{}: unchanged ({})", path, current),
            Some(recorded) => debug!("{}: changed {} -> {}", path, recorded, current),
        }
    }
}
