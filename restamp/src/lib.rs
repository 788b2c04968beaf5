//! Restamp - manifest-driven front end for `convenient-rebuild`
//!
//! A `restamp.yml` manifest declares generated files, their inputs and the
//! shell command producing each one. `restamp build` runs a command only when
//! one of its inputs changed since the last recorded build or the output is
//! missing.

pub mod commands;
pub mod manifest;
pub mod producer;

pub use commands::{Cli, CommandError, Commands, Session};
pub use manifest::{ArtifactSpec, Inputs, Manifest, ManifestError};
pub use producer::{ProducerError, command_action};
