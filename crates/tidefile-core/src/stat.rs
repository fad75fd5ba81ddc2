//! File identity and metadata, read with a single `stat`/`lstat` call.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use rustix::fs::{self as rfs, AtFlags, FileType};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::FsError;
use crate::path::Path;

/// Whether a call resolves a trailing symbolic link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkOption {
    #[default]
    Follow,
    NoFollow,
}

/// Inode information for identity and hardlink detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InodeInfo {
    /// Inode number.
    pub inode: u64,
    /// Device ID.
    pub device: u64,
}

impl InodeInfo {
    /// Create new inode info.
    pub fn new(inode: u64, device: u64) -> Self {
        Self { inode, device }
    }
}

/// Type of a filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Fifo,
    Socket,
    CharacterDevice,
    BlockDevice,
    Unknown,
}

impl FileKind {
    /// Anything that is not a regular file, directory or symlink.
    pub fn is_other(self) -> bool {
        !matches!(self, Self::Regular | Self::Directory | Self::Symlink)
    }
}

impl From<FileType> for FileKind {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::RegularFile => Self::Regular,
            FileType::Directory => Self::Directory,
            FileType::Symlink => Self::Symlink,
            FileType::Fifo => Self::Fifo,
            FileType::Socket => Self::Socket,
            FileType::CharacterDevice => Self::CharacterDevice,
            FileType::BlockDevice => Self::BlockDevice,
            FileType::Unknown => Self::Unknown,
        }
    }
}

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timespec {
    pub secs: i64,
    pub nanos: u32,
}

impl Timespec {
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    pub fn to_system_time(self) -> SystemTime {
        let nanos = Duration::from_nanos(u64::from(self.nanos));
        if self.secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(self.secs.unsigned_abs()) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(self.secs.unsigned_abs()) + nanos
        }
    }

    /// `None` if the timestamp is outside chrono's representable range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.secs, self.nanos)
    }
}

/// A snapshot of one file's metadata.
///
/// Two snapshots with equal `(device, inode)` referred to the same object at
/// the time they were read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub device: u64,
    pub inode: u64,
    pub kind: FileKind,
    /// Permission bits, including setuid, setgid and sticky.
    pub mode: u32,
    pub size: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub blksize: u64,
    pub blocks: u64,
    pub accessed: Timespec,
    pub modified: Timespec,
    pub changed: Timespec,
}

impl FileStat {
    /// Read metadata for `path`.
    #[allow(clippy::unnecessary_cast)]
    pub fn of(path: &Path, option: LinkOption) -> Result<Self, FsError> {
        let flags = match option {
            LinkOption::Follow => AtFlags::empty(),
            LinkOption::NoFollow => AtFlags::SYMLINK_NOFOLLOW,
        };
        let st = rfs::statat(rfs::CWD, path.to_bytes().as_slice(), flags)
            .map_err(|errno| FsError::from_errno(path.clone(), errno))?;

        Ok(Self {
            device: st.st_dev as u64,
            inode: st.st_ino as u64,
            kind: FileType::from_raw_mode(st.st_mode as rfs::RawMode).into(),
            mode: (st.st_mode as u32) & 0o7777,
            size: st.st_size as u64,
            nlink: st.st_nlink as u64,
            uid: st.st_uid as u32,
            gid: st.st_gid as u32,
            rdev: st.st_rdev as u64,
            blksize: st.st_blksize as u64,
            blocks: st.st_blocks as u64,
            accessed: Timespec::new(st.st_atime as i64, st.st_atime_nsec as u32),
            modified: Timespec::new(st.st_mtime as i64, st.st_mtime_nsec as u32),
            changed: Timespec::new(st.st_ctime as i64, st.st_ctime_nsec as u32),
        })
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_regular_file(&self) -> bool {
        self.kind == FileKind::Regular
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    pub fn is_other(&self) -> bool {
        self.kind.is_other()
    }

    pub fn inode(&self) -> InodeInfo {
        InodeInfo::new(self.inode, self.device)
    }

    /// Whether both snapshots describe the same underlying object.
    pub fn same_file(&self, other: &FileStat) -> bool {
        self.inode() == other.inode()
    }

    pub fn modified(&self) -> SystemTime {
        self.modified.to_system_time()
    }

    pub fn accessed(&self) -> SystemTime {
        self.accessed.to_system_time()
    }

    #[cfg(unix)]
    pub fn permissions(&self) -> std::fs::Permissions {
        use std::os::unix::fs::PermissionsExt;
        std::fs::Permissions::from_mode(self.mode)
    }

    /// `ls -l` style mode string, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let kind = match self.kind {
            FileKind::Directory => 'd',
            FileKind::Symlink => 'l',
            FileKind::Fifo => 'p',
            FileKind::Socket => 's',
            FileKind::CharacterDevice => 'c',
            FileKind::BlockDevice => 'b',
            FileKind::Regular | FileKind::Unknown => '-',
        };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }
}

/// Metadata for `path`, following a trailing symlink.
pub fn stat(path: &Path) -> Result<FileStat, FsError> {
    FileStat::of(path, LinkOption::Follow)
}

/// Metadata for `path` itself, even if it is a symlink.
pub fn lstat(path: &Path) -> Result<FileStat, FsError> {
    FileStat::of(path, LinkOption::NoFollow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_stat_regular_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let st = stat(&Path::from(file.as_path())).unwrap();
        assert!(st.is_regular_file());
        assert_eq!(st.size, 5);
        assert_eq!(st.nlink, 1);
        assert_eq!(st.mode_string().len(), 10);
    }

    #[test]
    fn test_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = Path::from(dir.path().join("nope"));
        assert!(stat(&missing).unwrap_err().is_not_found());
        assert!(lstat(&missing).unwrap_err().is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn test_lstat_does_not_follow() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let link = Path::from(link.as_path());
        assert!(lstat(&link).unwrap().is_symlink());
        let followed = stat(&link).unwrap();
        assert!(followed.is_dir());
        assert!(followed.same_file(&stat(&Path::from(target.as_path())).unwrap()));
    }

    #[test]
    fn test_timespec_conversions() {
        let ts = Timespec::new(1, 500);
        assert_eq!(
            ts.to_system_time(),
            UNIX_EPOCH + Duration::from_secs(1) + Duration::from_nanos(500)
        );
        assert_eq!(ts.to_datetime().unwrap().timestamp(), 1);
    }

    #[test]
    fn test_file_kind_display() {
        assert_eq!(FileKind::Directory.to_string(), "directory");
        assert!(FileKind::Fifo.is_other());
        assert!(!FileKind::Symlink.is_other());
    }
}
