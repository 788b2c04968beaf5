//! Shell command producer
//!
//! Turns a manifest artifact into a [`RebuildAction`] that runs its command
//! with `sh -c` and checks the output was actually written.

use crate::manifest::ArtifactSpec;
use convenient_rebuild::{BoxError, RebuildAction, rebuild_action};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Command producer errors
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// The shell could not be started
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The output's parent directory could not be created
    #[error("Failed to create {}: {source}", path.display())]
    OutputDir {
        /// Directory that was being created
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The command exited unsuccessfully
    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        /// Command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The command succeeded but the output is not there
    #[error("`{command}` did not produce {}", output.display())]
    NotProduced {
        /// Command line
        command: String,
        /// Expected output path
        output: PathBuf,
    },
}

/// Rebuild action running the artifact's command in its working directory
pub fn command_action(spec: &ArtifactSpec) -> RebuildAction {
    let command = spec.command.clone();
    let workdir = spec.workdir().to_path_buf();
    let output = spec.output.clone();

    rebuild_action(move || {
        let command = command.clone();
        let workdir = workdir.clone();
        let output = output.clone();
        async move {
            run(&command, &workdir, &output).await.map_err(BoxError::from)
        }
    })
}

async fn run(command: &str, workdir: &Path, output: &Path) -> Result<(), ProducerError> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ProducerError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    debug!("Running `{}` in {}", command, workdir.display());
    let result = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| ProducerError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if !result.status.success() {
        return Err(ProducerError::Failed {
            command: command.to_string(),
            status: result.status.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }

    if !tokio::fs::try_exists(output).await.unwrap_or(false) {
        return Err(ProducerError::NotProduced {
            command: command.to_string(),
            output: output.to_path_buf(),
        });
    }
    Ok(())
}
