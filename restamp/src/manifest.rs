//! `restamp.yml` manifest loading
//!
//! ```yaml
//! mode: development
//! store: .restamp
//! persist: before-rebuild
//! artifacts:
//!   - output: dist/site.css
//!     inputs: [src/base.css, src/theme.css]
//!     command: "cat src/base.css src/theme.css > dist/site.css"
//! ```
//!
//! Relative paths are resolved against the directory holding the manifest,
//! so the tool behaves the same from any working directory.

use convenient_rebuild::{Mode, NormalizedPath, PersistOrdering};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default timestamp store directory, relative to the manifest
pub const DEFAULT_STORE_DIR: &str = ".restamp";

/// Manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file could not be read
    #[error("Failed to read manifest {0}: {1}")]
    IoError(PathBuf, String),

    /// Manifest file is not valid YAML or has the wrong shape
    #[error("Failed to parse manifest {0}: {1}")]
    ParseError(PathBuf, String),

    /// Two artifacts declare the same output
    #[error("Output {0} is declared more than once")]
    DuplicateOutput(String),

    /// An artifact lists no inputs
    #[error("Artifact {0} has no inputs")]
    NoInputs(String),

    /// Name given on the command line matches no artifact
    #[error("No artifact named {0} in the manifest")]
    UnknownArtifact(String),

    /// A path could not be normalized
    #[error("Invalid path {0}")]
    InvalidPath(String),
}

/// One input path or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Inputs {
    /// `inputs: src/page.md`
    One(PathBuf),
    /// `inputs: [a, b]`
    Many(Vec<PathBuf>),
}

impl Inputs {
    /// Paths in declaration order
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Inputs::One(path) => std::slice::from_ref(path),
            Inputs::Many(paths) => paths,
        }
    }

    fn resolve(self, base: &Path) -> Self {
        match self {
            Inputs::One(path) => Inputs::One(base.join(path)),
            Inputs::Many(paths) => Inputs::Many(paths.into_iter().map(|p| base.join(p)).collect()),
        }
    }
}

/// One declared artifact
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactSpec {
    /// Generated file
    pub output: PathBuf,
    /// Files it is generated from
    pub inputs: Inputs,
    /// Shell command that writes `output`
    pub command: String,
    /// Working directory for `command`, defaults to the manifest directory
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl ArtifactSpec {
    /// Working directory, always set after loading
    pub fn workdir(&self) -> &Path {
        self.workdir.as_deref().unwrap_or_else(|| Path::new("."))
    }
}

/// Parsed manifest with every path made absolute-or-manifest-relative
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    /// Execution mode, overridable from the command line
    #[serde(default)]
    pub mode: Option<Mode>,
    /// Timestamp store directory
    #[serde(default)]
    pub store: Option<PathBuf>,
    /// Persist ordering for changed artifacts
    #[serde(default)]
    pub persist: Option<PersistOrdering>,
    /// Declared artifacts
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl Manifest {
    /// Read and validate a manifest file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ManifestError::IoError(path.to_path_buf(), e.to_string()))?;

        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let manifest = Self::parse(&content, &base_dir)
            .map_err(|e| match e {
                ManifestError::ParseError(_, msg) => ManifestError::ParseError(path.to_path_buf(), msg),
                other => other,
            })?;

        tracing::debug!(
            "Loaded manifest {} with {} artifacts",
            path.display(),
            manifest.artifacts.len()
        );
        Ok(manifest)
    }

    /// Parse manifest text, resolving relative paths against `base_dir`
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, ManifestError> {
        let mut manifest: Manifest = serde_yaml::from_str(content)
            .map_err(|e| ManifestError::ParseError(base_dir.to_path_buf(), e.to_string()))?;

        manifest.base_dir = base_dir.to_path_buf();
        manifest.store = manifest.store.map(|store| base_dir.join(store));
        manifest.artifacts = manifest
            .artifacts
            .into_iter()
            .map(|spec| ArtifactSpec {
                output: base_dir.join(spec.output),
                inputs: spec.inputs.resolve(base_dir),
                workdir: Some(match spec.workdir {
                    Some(workdir) => base_dir.join(workdir),
                    None => base_dir.to_path_buf(),
                }),
                command: spec.command,
            })
            .collect();

        let mut seen = HashSet::new();
        for spec in &manifest.artifacts {
            let id = normalized(&spec.output)?;
            if spec.inputs.paths().is_empty() {
                return Err(ManifestError::NoInputs(id.to_string()));
            }
            if !seen.insert(id.clone()) {
                return Err(ManifestError::DuplicateOutput(id.to_string()));
            }
        }

        Ok(manifest)
    }

    /// Timestamp store directory, falling back to [`DEFAULT_STORE_DIR`]
    pub fn store_dir(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_STORE_DIR))
    }

    /// Find an artifact by output path, as written in the manifest or
    /// relative to the current directory
    pub fn artifact(&self, name: &str) -> Result<&ArtifactSpec, ManifestError> {
        let candidates = [normalized(&self.base_dir.join(name)), normalized(Path::new(name))];
        self.artifacts
            .iter()
            .find(|spec| {
                let Ok(id) = normalized(&spec.output) else {
                    return false;
                };
                candidates.iter().flatten().any(|candidate| *candidate == id)
            })
            .ok_or_else(|| ManifestError::UnknownArtifact(name.to_string()))
    }

    /// Artifacts named on the command line, or all of them when none are
    pub fn select(&self, names: &[String]) -> Result<Vec<&ArtifactSpec>, ManifestError> {
        if names.is_empty() {
            return Ok(self.artifacts.iter().collect());
        }
        names.iter().map(|name| self.artifact(name)).collect()
    }
}

fn normalized(path: &Path) -> Result<NormalizedPath, ManifestError> {
    NormalizedPath::new(path).map_err(|_| ManifestError::InvalidPath(path.display().to_string()))
}
