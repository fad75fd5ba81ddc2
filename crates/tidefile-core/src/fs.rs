//! Thin wrappers over the `*at` system calls, relative to the working
//! directory, with errno-tagged errors.

use rustix::fs::{self as rfs, AtFlags, Mode};
use tracing::debug;

use crate::dirent;
use crate::error::FsError;
use crate::path::Path;
use crate::stat::{FileStat, LinkOption, Timespec, lstat};

/// Create a symbolic link at `link` pointing to `target`.
pub fn symlink(target: &Path, link: &Path) -> Result<(), FsError> {
    rfs::symlinkat(target.to_bytes().as_slice(), rfs::CWD, link.to_bytes().as_slice())
        .map_err(|errno| FsError::from_errno(link.clone(), errno))
}

/// Read the target of the symbolic link at `path`.
pub fn read_link(path: &Path) -> Result<Path, FsError> {
    let target = rfs::readlinkat(rfs::CWD, path.to_bytes().as_slice(), Vec::new())
        .map_err(|errno| FsError::from_errno(path.clone(), errno))?;
    Ok(Path::from_bytes(target.as_bytes()))
}

/// Create a single directory with the given permission bits (before umask).
pub fn create_dir(path: &Path, mode: u32) -> Result<(), FsError> {
    rfs::mkdirat(
        rfs::CWD,
        path.to_bytes().as_slice(),
        Mode::from_bits_truncate(mode as rfs::RawMode),
    )
    .map_err(|errno| FsError::from_errno(path.clone(), errno))
}

/// Set the permission bits of `path`, following symlinks. The umask does
/// not apply.
pub fn set_mode(path: &Path, mode: u32) -> Result<(), FsError> {
    rfs::chmodat(
        rfs::CWD,
        path.to_bytes().as_slice(),
        Mode::from_bits_truncate(mode as rfs::RawMode),
        AtFlags::empty(),
    )
    .map_err(|errno| FsError::from_errno(path.clone(), errno))
}

pub fn remove_file(path: &Path) -> Result<(), FsError> {
    rfs::unlinkat(rfs::CWD, path.to_bytes().as_slice(), AtFlags::empty())
        .map_err(|errno| FsError::from_errno(path.clone(), errno))
}

pub fn remove_dir(path: &Path) -> Result<(), FsError> {
    rfs::unlinkat(rfs::CWD, path.to_bytes().as_slice(), AtFlags::REMOVEDIR)
        .map_err(|errno| FsError::from_errno(path.clone(), errno))
}

/// Atomically rename `from` to `to` within one filesystem.
///
/// Fails with [`FsError::CrossDevice`] when they live on different devices.
pub fn rename(from: &Path, to: &Path) -> Result<(), FsError> {
    rfs::renameat(
        rfs::CWD,
        from.to_bytes().as_slice(),
        rfs::CWD,
        to.to_bytes().as_slice(),
    )
    .map_err(|errno| FsError::from_errno(from.clone(), errno))
}

/// Set access and modification times.
pub fn set_times(
    path: &Path,
    accessed: Timespec,
    modified: Timespec,
    option: LinkOption,
) -> Result<(), FsError> {
    let flags = match option {
        LinkOption::Follow => AtFlags::empty(),
        LinkOption::NoFollow => AtFlags::SYMLINK_NOFOLLOW,
    };
    let times = rfs::Timestamps {
        last_access: rfs::Timespec {
            tv_sec: accessed.secs,
            tv_nsec: accessed.nanos as _,
        },
        last_modification: rfs::Timespec {
            tv_sec: modified.secs,
            tv_nsec: modified.nanos as _,
        },
    };
    rfs::utimensat(rfs::CWD, path.to_bytes().as_slice(), &times, flags)
        .map_err(|errno| FsError::from_errno(path.clone(), errno))
}

/// Delete a file, symlink or empty directory.
///
/// A non-empty directory fails with [`FsError::DirectoryNotEmpty`].
pub fn delete(path: &Path) -> Result<(), FsError> {
    if lstat(path)?.is_dir() {
        remove_dir(path)
    } else {
        remove_file(path)
    }
}

/// Delete `path` and everything beneath it. Symlinks are removed, never
/// followed. Stops at the first failure.
pub fn delete_recursive(path: &Path) -> Result<(), FsError> {
    // (path, children already queued)
    let mut stack = vec![(path.clone(), false)];
    while let Some((current, expanded)) = stack.pop() {
        if expanded {
            remove_dir(&current)?;
            continue;
        }
        let st = lstat(&current)?;
        if st.is_dir() {
            stack.push((current.clone(), true));
            for child in dirent::list_children(&current)? {
                stack.push((child, false));
            }
        } else {
            remove_file(&current)?;
        }
    }
    debug!(path = %path, "Deleted recursively");
    Ok(())
}

/// Whether something exists at `path`. Only "not found" maps to `false`.
pub fn exists(path: &Path, option: LinkOption) -> Result<bool, FsError> {
    match FileStat::of(path, option) {
        Ok(_) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::stat;
    use std::fs as sfs;
    use tempfile::TempDir;

    fn root(dir: &TempDir) -> Path {
        Path::from(dir.path())
    }

    #[test]
    fn test_symlink_and_read_link() {
        let dir = TempDir::new().unwrap();
        let link = root(&dir).child("link");
        symlink(&Path::from("some/../target"), &link).unwrap();

        assert_eq!(read_link(&link).unwrap(), Path::from("some/../target"));
        assert!(exists(&link, LinkOption::NoFollow).unwrap());
        assert!(!exists(&link, LinkOption::Follow).unwrap());
    }

    #[test]
    fn test_create_and_remove_dir() {
        let dir = TempDir::new().unwrap();
        let sub = root(&dir).child("sub");
        create_dir(&sub, 0o755).unwrap();
        assert!(stat(&sub).unwrap().is_dir());
        assert!(matches!(create_dir(&sub, 0o755), Err(FsError::AlreadyExists { .. })));
        remove_dir(&sub).unwrap();
        assert!(!exists(&sub, LinkOption::Follow).unwrap());
    }

    #[test]
    fn test_set_mode_ignores_umask() {
        let dir = TempDir::new().unwrap();
        let sub = root(&dir).child("sub");
        create_dir(&sub, 0o700).unwrap();
        set_mode(&sub, 0o751).unwrap();
        assert_eq!(stat(&sub).unwrap().mode, 0o751);
    }

    #[test]
    fn test_delete_non_empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        let sub = root(&dir).child("sub");
        create_dir(&sub, 0o755).unwrap();
        sfs::write(sub.child("f").to_path_buf(), b"x").unwrap();

        assert!(matches!(delete(&sub), Err(FsError::DirectoryNotEmpty { .. })));
        assert!(exists(&sub, LinkOption::Follow).unwrap());
    }

    #[test]
    fn test_delete_recursive_removes_tree() {
        let dir = TempDir::new().unwrap();
        let top = root(&dir).child("top");
        sfs::create_dir_all(top.child("a/b/c").to_path_buf()).unwrap();
        sfs::write(top.child("a/b/c/f").to_path_buf(), b"x").unwrap();
        sfs::write(top.child("g").to_path_buf(), b"y").unwrap();
        symlink(&root(&dir), &top.child("a/loop")).unwrap();

        delete_recursive(&top).unwrap();
        assert!(!exists(&top, LinkOption::NoFollow).unwrap());
        // The symlink target survives.
        assert!(exists(&root(&dir), LinkOption::Follow).unwrap());
    }

    #[test]
    fn test_rename_over_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = rename(&root(&dir).child("a"), &root(&dir).child("b")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_set_times() {
        let dir = TempDir::new().unwrap();
        let file = root(&dir).child("f");
        sfs::write(file.to_path_buf(), b"x").unwrap();
        let when = Timespec::new(1_000_000, 42);
        set_times(&file, when, when, LinkOption::NoFollow).unwrap();
        assert_eq!(stat(&file).unwrap().modified, when);
    }
}
