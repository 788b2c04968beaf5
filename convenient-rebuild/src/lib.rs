//! Dependency-aware artifact rebuild cache
//!
//! Producers (a CSS bundler, a page renderer, a shell command) declare an
//! output artifact, the input files it is generated from, and an async
//! rebuild action. The [`RebuildEngine`] decides whether that action has to
//! run:
//!
//! - an input's modification timestamp differs from the last one recorded,
//! - an input was never seen before for this artifact,
//! - the artifact itself is missing on disk,
//!
//! or unconditionally when running in [`Mode::Trusted`], which trusts a
//! pre-built snapshot and never consults the timestamp store.
//!
//! Recorded timestamps survive restarts through a [`TimestampStore`]
//! ([`FsTimestampStore`] for a directory on disk, [`MemoryTimestampStore`]
//! for tests and embedding).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use convenient_rebuild::{
//!     rebuild_action, EngineConfig, FsTimestampStore, Mode, RebuildEngine, TokioFileProbe,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FsTimestampStore::open(".restamp").await?);
//! let engine = RebuildEngine::bootstrap(
//!     EngineConfig::new(Mode::Checked),
//!     store,
//!     Arc::new(TokioFileProbe),
//! )
//! .await?;
//!
//! let outcome = engine
//!     .register(
//!         "dist/notes.html",
//!         "docs/notes.md",
//!         rebuild_action(|| async {
//!             tokio::fs::copy("docs/notes.md", "dist/notes.html").await?;
//!             Ok(())
//!         }),
//!     )
//!     .await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod action;
pub mod engine;
pub mod error;
pub mod locks;
pub mod mode;
pub mod path;
pub mod probe;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod types;

pub use action::{BoxError, RebuildAction, rebuild_action};
pub use engine::{ArtifactStatus, EngineConfig, PersistOrdering, RebuildEngine};
pub use error::{EngineError, Result, StoreError};
pub use mode::Mode;
pub use path::{ArtifactId, Dependencies, IntoDependencies, NormalizedPath};
pub use probe::{FileProbe, TokioFileProbe};
pub use store::{FsTimestampStore, MemoryTimestampStore, TimestampStore};
pub use types::{ArtifactRecord, DependencyRecord, RebuildOutcome, RebuildReason, Timestamp};
