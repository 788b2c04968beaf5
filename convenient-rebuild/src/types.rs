//! Core records shared by the engine, registry and stores

use crate::action::RebuildAction;
use crate::path::{ArtifactId, NormalizedPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Modification time of a file, compared with exact equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Underlying date-time
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self(DateTime::<Utc>::from(time))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Last timestamp observed for one input of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Normalized input path
    pub path: NormalizedPath,
    /// Modification time seen when the artifact was last judged up to date
    pub last_seen: Timestamp,
}

/// Persisted view of an artifact: its id and recorded dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Output artifact id
    pub artifact: ArtifactId,
    /// Dependencies in declaration order
    pub dependencies: Vec<DependencyRecord>,
}

impl ArtifactRecord {
    /// Record with no dependencies yet
    pub fn empty(artifact: ArtifactId) -> Self {
        Self {
            artifact,
            dependencies: Vec::new(),
        }
    }

    /// Recorded timestamp of a dependency, if it is part of this record
    pub fn last_seen(&self, path: &NormalizedPath) -> Option<Timestamp> {
        self.dependencies
            .iter()
            .find(|dep| &dep.path == path)
            .map(|dep| dep.last_seen)
    }
}

/// Registry view of an artifact
///
/// The action is never persisted; entries restored from the store carry
/// `None` until a producer registers the artifact again.
#[derive(Clone)]
pub struct ArtifactEntry {
    /// Current dependency view
    pub record: ArtifactRecord,
    /// Most recently registered rebuild action
    pub action: Option<RebuildAction>,
}

impl fmt::Debug for ArtifactEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactEntry")
            .field("record", &self.record)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Why a rebuild action ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    /// Trusted mode rebuilds unconditionally
    Trusted,
    /// A dependency is new or its timestamp moved
    DependenciesChanged,
    /// Timestamps matched but the artifact is absent on disk
    ArtifactMissing,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::Trusted => f.write_str("trusted mode"),
            RebuildReason::DependenciesChanged => f.write_str("dependencies changed"),
            RebuildReason::ArtifactMissing => f.write_str("artifact missing"),
        }
    }
}

/// Result of a registration or staleness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Nothing to do: dependencies unchanged and artifact present
    UpToDate,
    /// The rebuild action ran and succeeded
    Rebuilt(RebuildReason),
    /// The artifact is unknown to the registry, nothing was validated
    NotRegistered,
}

impl RebuildOutcome {
    /// Whether the rebuild action ran
    pub fn rebuilt(&self) -> bool {
        matches!(self, RebuildOutcome::Rebuilt(_))
    }
}

impl fmt::Display for RebuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildOutcome::UpToDate => f.write_str("up to date"),
            RebuildOutcome::Rebuilt(reason) => write!(f, "rebuilt ({reason})"),
            RebuildOutcome::NotRegistered => f.write_str("not registered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_timestamp_keeps_nanoseconds_through_json() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let ts = Timestamp::from(time);
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn test_record_lookup_by_path() {
        let path = NormalizedPath::new("src/a.css").unwrap();
        let ts = Timestamp::from(UNIX_EPOCH + Duration::from_secs(10));
        let record = ArtifactRecord {
            artifact: NormalizedPath::new("dist/site.css").unwrap(),
            dependencies: vec![DependencyRecord {
                path: path.clone(),
                last_seen: ts,
            }],
        };
        assert_eq!(record.last_seen(&path), Some(ts));
        assert_eq!(record.last_seen(&NormalizedPath::new("src/b.css").unwrap()), None);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(RebuildOutcome::UpToDate.to_string(), "up to date");
        assert_eq!(
            RebuildOutcome::Rebuilt(RebuildReason::ArtifactMissing).to_string(),
            "rebuilt (artifact missing)"
        );
        assert!(RebuildOutcome::Rebuilt(RebuildReason::Trusted).rebuilt());
        assert!(!RebuildOutcome::NotRegistered.rebuilt());
    }
}
