//! Directory listing over `openat` + `getdents`.

use rustix::fs::{self as rfs, Mode, OFlags};
use serde::{Deserialize, Serialize};

use crate::error::FsError;
use crate::path::{Name, Path};
use crate::stat::FileKind;

/// One raw directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub ino: u64,
    /// Type as reported by the directory itself; may be `Unknown` on
    /// filesystems that do not fill in `d_type`.
    pub kind: FileKind,
    pub name: Vec<u8>,
}

impl DirEntry {
    /// `.` or `..`
    pub fn is_dot(&self) -> bool {
        self.name == b"." || self.name == b".."
    }

    /// The entry name, or `None` for `.` and `..`.
    pub fn to_name(&self) -> Option<Name> {
        if self.is_dot() {
            None
        } else {
            Name::new(self.name.clone()).ok()
        }
    }
}

/// A forward-only cursor over an open directory, `.` and `..` included.
///
/// The file descriptor is released when the cursor is dropped.
pub struct Dir {
    path: Path,
    inner: rfs::Dir,
}

impl Dir {
    pub fn open(path: &Path) -> Result<Self, FsError> {
        let fd = rfs::openat(
            rfs::CWD,
            path.to_bytes().as_slice(),
            OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(|errno| FsError::from_errno(path.clone(), errno))?;
        let inner = rfs::Dir::read_from(&fd).map_err(|errno| FsError::from_errno(path.clone(), errno))?;
        Ok(Self {
            path: path.clone(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for Dir {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(
            entry
                .map(|entry| DirEntry {
                    ino: entry.ino(),
                    kind: entry.file_type().into(),
                    name: entry.file_name().to_bytes().to_vec(),
                })
                .map_err(|errno| FsError::from_errno(self.path.clone(), errno)),
        )
    }
}

/// Read the children of `path` in one scan, without `.` and `..`.
pub fn list(path: &Path) -> Result<Vec<DirEntry>, FsError> {
    let mut entries = Vec::new();
    for entry in Dir::open(path)? {
        let entry = entry?;
        if !entry.is_dot() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Child paths of `path`, sorted by name bytes.
pub fn list_children(path: &Path) -> Result<Vec<Path>, FsError> {
    let mut names: Vec<Vec<u8>> = list(path)?.into_iter().map(|e| e.name).collect();
    names.sort_unstable();
    Ok(names.into_iter().map(|name| path.child(name)).collect())
}
