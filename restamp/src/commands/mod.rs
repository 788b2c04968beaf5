//! Restamp command-line interface
//!
//! - `build`: register manifest artifacts, rebuilding the stale ones
//! - `check`: re-validate one recorded artifact
//! - `status`: report staleness without rebuilding
//! - `clean`: forget every recorded timestamp

use crate::manifest::Manifest;
use clap::{Parser, Subcommand};
use convenient_rebuild::{
    EngineConfig, FsTimestampStore, Mode, PersistOrdering, RebuildEngine, TokioFileProbe,
};
use std::path::PathBuf;
use std::sync::Arc;

pub mod build;
pub mod check;
pub mod clean;
pub mod status;

/// Error type at command boundaries
pub type CommandError = Box<dyn std::error::Error + Send + Sync>;

/// Restamp - rebuild generated files only when their inputs changed
#[derive(Parser)]
#[command(name = "restamp")]
#[command(about = "Rebuild generated files only when their inputs changed")]
#[command(version)]
pub struct Cli {
    /// Manifest file
    #[arg(short, long, global = true, default_value = "restamp.yml")]
    pub manifest: PathBuf,

    /// Execution mode (trusted/0, checked/1, checked-verbose/2), overrides the manifest
    #[arg(long, global = true, env = "RESTAMP_MODE")]
    pub mode: Option<Mode>,

    /// Timestamp store directory, overrides the manifest
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// When to persist timestamps of changed artifacts, overrides the manifest
    #[arg(long, global = true)]
    pub persist: Option<PersistOrdering>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register artifacts and rebuild the stale ones
    Build {
        /// Outputs to build (default: every artifact in the manifest)
        artifacts: Vec<String>,
    },

    /// Re-validate a recorded artifact and rebuild it if stale
    Check {
        /// Output to check
        artifact: String,
    },

    /// Show which recorded artifacts are stale
    Status,

    /// Delete every recorded timestamp
    Clean,
}

/// Manifest merged with command-line overrides
#[derive(Debug, Clone)]
pub struct Session {
    /// Loaded manifest
    pub manifest: Manifest,
    /// Resolved engine settings
    pub config: EngineConfig,
    /// Resolved store directory
    pub store_dir: PathBuf,
}

impl Session {
    /// Load the manifest named on the command line and apply overrides
    pub async fn load(cli: &Cli) -> Result<Self, CommandError> {
        let manifest = Manifest::load(&cli.manifest).await?;
        Ok(Self::resolve(cli, manifest))
    }

    /// Command line wins over the manifest, which wins over the defaults
    pub fn resolve(cli: &Cli, manifest: Manifest) -> Self {
        let mode = cli.mode.or(manifest.mode).unwrap_or_default();
        let persist = cli.persist.or(manifest.persist).unwrap_or_default();
        let store_dir = cli.store.clone().unwrap_or_else(|| manifest.store_dir());

        Self {
            manifest,
            config: EngineConfig::new(mode).with_persist_ordering(persist),
            store_dir,
        }
    }

    /// Start an engine over the session's store
    ///
    /// Trusted mode never opens the store.
    pub async fn engine(&self) -> Result<RebuildEngine, CommandError> {
        if !self.config.mode.performs_checks() {
            return Ok(RebuildEngine::trusted());
        }
        let store = FsTimestampStore::open(&self.store_dir).await?;
        let engine =
            RebuildEngine::bootstrap(self.config, Arc::new(store), Arc::new(TokioFileProbe)).await?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_accepts_numeric_levels() {
        for (arg, mode) in [("0", Mode::Trusted), ("1", Mode::Checked), ("2", Mode::CheckedVerbose)] {
            let cli = Cli::parse_from(["restamp", "--mode", arg, "status"]);
            assert_eq!(cli.mode, Some(mode));
        }
        let cli = Cli::parse_from(["restamp", "--mode", "prod", "status"]);
        assert_eq!(cli.mode, Some(Mode::Trusted));
        assert!(Cli::try_parse_from(["restamp", "--mode", "3", "status"]).is_err());
    }
}
