//! Source paths and the directory an operation writes into.

use serde::{Deserialize, Serialize};

use crate::error::{FsError, TargetError};
use crate::path::Path;
use crate::stat::{FileStat, stat};

/// What an operation works on.
///
/// For copy and move, `destination` is the directory the sources are placed
/// into. For delete it is informational only (the parent of the first
/// source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub sources: Vec<Path>,
    pub destination: Path,
}

impl Target {
    pub fn new(sources: impl IntoIterator<Item = Path>, destination: impl Into<Path>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            destination: destination.into(),
        }
    }

    /// A target for deleting `sources`.
    pub fn for_delete(sources: impl IntoIterator<Item = Path>) -> Self {
        let sources: Vec<Path> = sources.into_iter().collect();
        let destination = sources
            .first()
            .and_then(Path::parent)
            .unwrap_or_default();
        Self {
            sources,
            destination,
        }
    }

    /// Check that there is something to do.
    pub fn check_sources(&self) -> Result<(), TargetError> {
        if self.sources.is_empty() {
            Err(TargetError::NoSources)
        } else {
            Ok(())
        }
    }

    /// Check that the destination is a readable directory that is not one
    /// of the sources and does not lie beneath one.
    pub fn resolve(&self) -> Result<FileStat, TargetError> {
        self.check_sources()?;
        let st = stat(&self.destination).map_err(TargetError::Unreadable)?;
        if !st.is_dir() {
            return Err(TargetError::NotADirectory {
                path: self.destination.clone(),
            });
        }
        let destination = absolute(&self.destination)?;
        for source in &self.sources {
            if destination.starts_with(&absolute(source)?) {
                return Err(TargetError::DestinationInsideSource {
                    source_path: source.clone(),
                    destination: self.destination.clone(),
                });
            }
        }
        Ok(st)
    }
}

/// `path` against the working directory, lexically normalized.
fn absolute(path: &Path) -> Result<Path, TargetError> {
    path.to_absolute()
        .map(|p| p.normalize())
        .map_err(|err| TargetError::Unreadable(FsError::io(path.clone(), &err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_accepts_directory() {
        let dir = TempDir::new().unwrap();
        let root = Path::from(dir.path());
        fs::write(dir.path().join("a"), b"").unwrap();
        fs::create_dir(dir.path().join("dst")).unwrap();

        let target = Target::new([root.child("a")], root.child("dst"));
        assert!(target.resolve().unwrap().is_dir());
    }

    #[test]
    fn test_resolve_rejects_file_destination() {
        let dir = TempDir::new().unwrap();
        let root = Path::from(dir.path());
        fs::write(dir.path().join("f"), b"").unwrap();

        let target = Target::new([root.child("x")], root.child("f"));
        assert!(matches!(target.resolve(), Err(TargetError::NotADirectory { .. })));

        let target = Target::new([root.child("x")], root.child("missing"));
        assert!(matches!(target.resolve(), Err(TargetError::Unreadable(_))));
    }

    #[test]
    fn test_resolve_rejects_destination_inside_source() {
        let dir = TempDir::new().unwrap();
        let root = Path::from(dir.path());
        fs::create_dir_all(dir.path().join("a/b")).unwrap();

        let target = Target::new([root.child("a")], root.child("a/b"));
        assert!(matches!(
            target.resolve(),
            Err(TargetError::DestinationInsideSource { .. })
        ));
        let target = Target::new([root.child("a")], root.child("a"));
        assert!(target.resolve().is_err());
    }

    /// `path` spelled relative to the working directory.
    fn relative(path: &std::path::Path) -> Path {
        let cwd = std::env::current_dir().unwrap();
        let ups = "../".repeat(cwd.components().count());
        let rest = path.to_str().unwrap().trim_start_matches('/');
        Path::from(format!("{ups}{rest}"))
    }

    #[test]
    fn test_resolve_compares_relative_and_absolute_spellings() {
        let dir = TempDir::new().unwrap();
        let root = Path::from(dir.path());
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join("c")).unwrap();
        let source = relative(&dir.path().join("a"));
        assert!(!source.is_absolute());

        let target = Target::new([source.clone()], root.child("a/b"));
        assert!(matches!(
            target.resolve(),
            Err(TargetError::DestinationInsideSource { .. })
        ));

        let target = Target::new([root.child("a")], relative(&dir.path().join("a/b")));
        assert!(target.resolve().is_err());

        let target = Target::new([source], root.child("c"));
        assert!(target.resolve().is_ok());
    }

    #[test]
    fn test_empty_sources() {
        let target = Target::new(Vec::new(), "/");
        assert_eq!(target.resolve(), Err(TargetError::NoSources));
    }

    #[test]
    fn test_for_delete_uses_parent() {
        let target = Target::for_delete([Path::from("/a/b"), Path::from("/c")]);
        assert_eq!(target.destination, Path::from("/a"));
    }
}
