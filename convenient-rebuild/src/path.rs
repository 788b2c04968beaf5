//! Path normalization for artifact ids and dependency paths
//!
//! Registry and store keys must collide for equivalent spellings of the same
//! path (`src\a.css`, `src//a.css`, `./src/a.css`), so every path entering the
//! engine goes through [`NormalizedPath::new`] first. Normalization is purely
//! lexical: the filesystem is never consulted and `..` is kept as written.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of Windows extended-length paths, which are kept verbatim
const EXTENDED_LENGTH_PREFIX: &str = r"\\?\";

/// Separator-normalized path, stable across runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedPath(String);

/// Identifier of a generated artifact (its normalized output path)
pub type ArtifactId = NormalizedPath;

impl NormalizedPath {
    /// Normalize a path
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPath`] for empty input or paths that are
    /// not valid UTF-8.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = path
            .to_str()
            .ok_or_else(|| EngineError::InvalidPath(path.to_string_lossy().into_owned()))?;
        Self::from_str_lossless(raw)
    }

    fn from_str_lossless(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(EngineError::InvalidPath(raw.to_string()));
        }
        if raw.starts_with(EXTENDED_LENGTH_PREFIX) {
            return Ok(Self(raw.to_string()));
        }

        let unified = raw.replace('\\', "/");
        let absolute = unified.starts_with('/');
        let parts: Vec<&str> = unified
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect();

        let joined = parts.join("/");
        let normalized = match (absolute, joined.is_empty()) {
            (true, _) => format!("/{joined}"),
            (false, true) => ".".to_string(),
            (false, false) => joined,
        };
        Ok(Self(normalized))
    }

    /// Normalized string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrow as a filesystem path
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Owned filesystem path
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl TryFrom<String> for NormalizedPath {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_str_lossless(&value)
    }
}

impl From<NormalizedPath> for String {
    fn from(value: NormalizedPath) -> Self {
        value.0
    }
}

/// Ordered, duplicate-free list of normalized dependency paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Vec<NormalizedPath>);

impl Dependencies {
    /// Normalize and deduplicate paths, keeping first-occurrence order
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPath`] if any path cannot be normalized.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut deps: Vec<NormalizedPath> = Vec::new();
        for path in paths {
            let path = NormalizedPath::new(path)?;
            if !deps.contains(&path) {
                deps.push(path);
            }
        }
        Ok(Self(deps))
    }

    /// Number of distinct dependencies
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no dependencies
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedPath> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Dependencies {
    type Item = &'a NormalizedPath;
    type IntoIter = std::slice::Iter<'a, NormalizedPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Anything a producer may pass as the dependency argument of
/// [`RebuildEngine::register`](crate::RebuildEngine::register)
///
/// A bare path counts as a single-element list.
pub trait IntoDependencies {
    /// Normalize into a dependency list
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidPath`] if any path cannot be normalized.
    fn into_dependencies(self) -> Result<Dependencies>;
}

impl IntoDependencies for Dependencies {
    fn into_dependencies(self) -> Result<Dependencies> {
        Ok(self)
    }
}

impl IntoDependencies for &str {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths([self])
    }
}

impl IntoDependencies for String {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths([self])
    }
}

impl IntoDependencies for &Path {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths([self])
    }
}

impl IntoDependencies for PathBuf {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths([self])
    }
}

impl IntoDependencies for &PathBuf {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths([self])
    }
}

impl IntoDependencies for NormalizedPath {
    fn into_dependencies(self) -> Result<Dependencies> {
        Ok(Dependencies(vec![self]))
    }
}

impl<P: AsRef<Path>> IntoDependencies for Vec<P> {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths(self)
    }
}

impl<P: AsRef<Path>> IntoDependencies for &[P] {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths(self)
    }
}

impl<P: AsRef<Path>, const N: usize> IntoDependencies for [P; N] {
    fn into_dependencies(self) -> Result<Dependencies> {
        Dependencies::from_paths(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(path: &str) -> String {
        NormalizedPath::new(path).unwrap().as_str().to_string()
    }

    #[test]
    fn test_separators_collide() {
        assert_eq!(norm(r"src\css\main.scss"), "src/css/main.scss");
        assert_eq!(norm("src//css/./main.scss"), "src/css/main.scss");
        assert_eq!(norm("./src/css/main.scss/"), "src/css/main.scss");
        assert_eq!(norm(r"C:\www\index.html"), "C:/www/index.html");
    }

    #[test]
    fn test_absolute_and_relative_roots() {
        assert_eq!(norm("/var/www//index.html"), "/var/www/index.html");
        assert_eq!(norm("/"), "/");
        assert_eq!(norm("./"), ".");
        assert_eq!(norm("../shared/base.css"), "../shared/base.css");
    }

    #[test]
    fn test_extended_length_paths_untouched() {
        let raw = r"\\?\C:\very\long\path.css";
        assert_eq!(norm(raw), raw);
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(
            NormalizedPath::new(""),
            Err(EngineError::InvalidPath(_))
        ));
        assert!(NormalizedPath::new("   ").is_err());
    }

    #[test]
    fn test_scalar_dependency_is_single_element() {
        let deps = "docs/readme.md".into_dependencies().unwrap();
        assert_eq!(deps.len(), 1);
        let deps = PathBuf::from(r"docs\readme.md").into_dependencies().unwrap();
        assert_eq!(deps.iter().next().unwrap().as_str(), "docs/readme.md");
    }

    #[test]
    fn test_duplicates_collapse_in_order() {
        let deps = vec!["b.css", "a.css", r".\b.css", "c.css"]
            .into_dependencies()
            .unwrap();
        let names: Vec<_> = deps.iter().map(NormalizedPath::as_str).collect();
        assert_eq!(names, ["b.css", "a.css", "c.css"]);
    }

    #[test]
    fn test_serde_normalizes_on_read() {
        let path: NormalizedPath = serde_json::from_str(r#""dist\\site.css""#).unwrap();
        assert_eq!(path.as_str(), "dist/site.css");
        assert_eq!(serde_json::to_string(&path).unwrap(), r#""dist/site.css""#);
    }
}
