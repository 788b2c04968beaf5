//! Error types for the rebuild engine and its timestamp stores

use crate::action::BoxError;
use crate::path::NormalizedPath;
use std::path::PathBuf;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by a [`TimestampStore`](crate::TimestampStore) backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing a store document failed
    #[error("timestamp store I/O error at {}: {source}", path.display())]
    Io {
        /// Path of the document or directory involved
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A stored document could not be encoded or decoded
    #[error("timestamp store document {} is invalid: {source}", path.display())]
    Serialization {
        /// Path of the offending document
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// The backend refused the operation
    #[error("timestamp store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by [`RebuildEngine`](crate::RebuildEngine) operations
///
/// Nothing is swallowed inside the engine: each variant reaches the caller of
/// the operation that hit it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The timestamp store could not be loaded while starting in a checked mode
    #[error("failed to load recorded timestamps: {0}")]
    Bootstrap(#[source] StoreError),

    /// A dependency could not be stat'ed
    #[error("cannot read modification time of {path}: {source}")]
    Probe {
        /// Dependency that failed
        path: NormalizedPath,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The timestamp store rejected an update
    #[error("failed to persist timestamps for {artifact}: {source}")]
    Persist {
        /// Artifact whose record was being written
        artifact: NormalizedPath,
        /// Store failure
        source: StoreError,
    },

    /// The producer's rebuild action failed
    #[error("rebuilding {artifact} failed: {source}")]
    Rebuild {
        /// Artifact being regenerated
        artifact: NormalizedPath,
        /// Error returned by the action
        source: BoxError,
    },

    /// The artifact needs a rebuild but no action was registered in this process
    #[error("{artifact} is stale but no rebuild action has been registered for it")]
    MissingAction {
        /// Artifact restored from the store without an action
        artifact: NormalizedPath,
    },

    /// A path could not be normalized
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// An artifact was registered without any dependency
    #[error("{artifact} was registered without dependencies")]
    NoDependencies {
        /// Artifact being registered
        artifact: NormalizedPath,
    },

    /// A file timestamp was checked without having been saved first
    #[error("no timestamp snapshot saved for {path}")]
    UnknownSnapshot {
        /// Path that was checked
        path: NormalizedPath,
    },
}

impl EngineError {
    /// Whether the error came out of the producer's own rebuild action
    pub fn is_rebuild_failure(&self) -> bool {
        matches!(self, EngineError::Rebuild { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_display() {
        let err = EngineError::Probe {
            path: NormalizedPath::new("src/style.scss").unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/style.scss"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_bootstrap_error_keeps_source() {
        let err = EngineError::Bootstrap(StoreError::Unavailable("connection refused".into()));
        assert!(err.to_string().contains("failed to load recorded timestamps"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("timestamp store unavailable: connection refused")
        );
    }

    #[test]
    fn test_rebuild_failure_flag() {
        let err = EngineError::Rebuild {
            artifact: NormalizedPath::new("dist/app.html").unwrap(),
            source: "template missing".into(),
        };
        assert!(err.is_rebuild_failure());
        assert!(err.to_string().contains("dist/app.html"));

        let err = EngineError::MissingAction {
            artifact: NormalizedPath::new("dist/app.html").unwrap(),
        };
        assert!(!err.is_rebuild_failure());
    }
}
