//! Error types shared by every tidefile crate.

use rustix::io::Errno;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::Path;

fn describe(errno: i32) -> std::io::Error {
    std::io::Error::from_raw_os_error(errno)
}

/// A failed system call, tagged by cause.
///
/// Every variant carries the path the call was made on and the raw errno
/// the kernel returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FsError {
    /// The final component (or an intermediate one) does not exist.
    #[error("Path not found: {path}")]
    NotFound { path: Path, errno: i32 },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: Path, errno: i32 },

    /// Something already exists at the path.
    #[error("Already exists: {path}")]
    AlreadyExists { path: Path, errno: i32 },

    /// A directory could not be removed because it still has entries.
    #[error("Directory not empty: {path}")]
    DirectoryNotEmpty { path: Path, errno: i32 },

    /// A directory was required.
    #[error("Not a directory: {path}")]
    NotADirectory { path: Path, errno: i32 },

    /// A non-directory was required.
    #[error("Is a directory: {path}")]
    IsADirectory { path: Path, errno: i32 },

    /// Source and destination live on different filesystems.
    #[error("Cross-device link: {path}")]
    CrossDevice { path: Path, errno: i32 },

    /// Any other errno.
    #[error("I/O error at {path}: {}", describe(*errno))]
    Io { path: Path, errno: i32 },
}

impl FsError {
    /// Classify a rustix errno for `path`.
    pub fn from_errno(path: impl Into<Path>, errno: Errno) -> Self {
        let path = path.into();
        let code = errno.raw_os_error();
        match errno {
            Errno::NOENT => Self::NotFound { path, errno: code },
            Errno::ACCESS | Errno::PERM => Self::PermissionDenied { path, errno: code },
            Errno::EXIST => Self::AlreadyExists { path, errno: code },
            Errno::NOTEMPTY => Self::DirectoryNotEmpty { path, errno: code },
            Errno::NOTDIR => Self::NotADirectory { path, errno: code },
            Errno::ISDIR => Self::IsADirectory { path, errno: code },
            Errno::XDEV => Self::CrossDevice { path, errno: code },
            _ => Self::Io { path, errno: code },
        }
    }

    /// Classify a `std::io::Error` for `path`.
    ///
    /// Errors that carry no OS code are mapped from their kind.
    pub fn io(path: impl Into<Path>, source: &std::io::Error) -> Self {
        let errno = Errno::from_io_error(source).unwrap_or(match source.kind() {
            std::io::ErrorKind::NotFound => Errno::NOENT,
            std::io::ErrorKind::PermissionDenied => Errno::ACCESS,
            std::io::ErrorKind::AlreadyExists => Errno::EXIST,
            std::io::ErrorKind::Interrupted => Errno::INTR,
            _ => Errno::IO,
        });
        Self::from_errno(path, errno)
    }

    /// The path the failed call was made on.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::AlreadyExists { path, .. }
            | Self::DirectoryNotEmpty { path, .. }
            | Self::NotADirectory { path, .. }
            | Self::IsADirectory { path, .. }
            | Self::CrossDevice { path, .. }
            | Self::Io { path, .. } => path,
        }
    }

    /// The raw errno returned by the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound { errno, .. }
            | Self::PermissionDenied { errno, .. }
            | Self::AlreadyExists { errno, .. }
            | Self::DirectoryNotEmpty { errno, .. }
            | Self::NotADirectory { errno, .. }
            | Self::IsADirectory { errno, .. }
            | Self::CrossDevice { errno, .. }
            | Self::Io { errno, .. } => *errno,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<FsError> for std::io::Error {
    fn from(err: FsError) -> Self {
        let errno = err.errno();
        std::io::Error::new(describe(errno).kind(), err)
    }
}

/// Errors from path manipulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path does not start with the prefix being replaced.
    #[error("Cannot rebase {path}: not under {prefix}")]
    IllegalRebase { path: Path, prefix: Path },

    /// A name was empty or contained a forbidden byte.
    #[error("Invalid file name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// Errors from constructing a [`Progress`](crate::Progress).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("Processed ({processed}) exceeds total ({total})")]
    ProcessedExceedsTotal { total: u64, processed: u64 },

    #[error("Negative progress value (total {total}, processed {processed})")]
    Negative { total: i64, processed: i64 },
}

/// Failures detected before any work on a target starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// No source paths were given.
    #[error("No sources given")]
    NoSources,

    /// The destination could not be read.
    #[error("Destination unreadable: {0}")]
    Unreadable(#[source] FsError),

    /// The destination exists but is not a directory.
    #[error("Destination is not a directory: {path}")]
    NotADirectory { path: Path },

    /// The destination is one of the sources or lies beneath one.
    #[error("Cannot paste {source_path} into itself ({destination})")]
    DestinationInsideSource { source_path: Path, destination: Path },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errno_classifies() {
        let err = FsError::from_errno("/a", Errno::NOENT);
        assert!(err.is_not_found());
        assert_eq!(err.errno(), Errno::NOENT.raw_os_error());
        assert_eq!(err.path(), &Path::from("/a"));

        assert!(matches!(
            FsError::from_errno("/a", Errno::PERM),
            FsError::PermissionDenied { .. }
        ));
        assert!(matches!(
            FsError::from_errno("/a", Errno::XDEV),
            FsError::CrossDevice { .. }
        ));
        assert!(matches!(
            FsError::from_errno("/a", Errno::NAMETOOLONG),
            FsError::Io { .. }
        ));
    }

    #[test]
    fn test_io_without_os_code() {
        let err = FsError::io(
            "/test/path",
            &std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, FsError::PermissionDenied { .. }));
    }

    #[test]
    fn test_display_includes_path() {
        let err = FsError::from_errno("/x/y", Errno::NOTEMPTY);
        assert_eq!(err.to_string(), "Directory not empty: /x/y");
    }
}
