//! Copy: recreate each source tree under a fresh name in the destination.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;

use rustix::io::Errno;
use tidefile_core::{FileKind, FileStat, FsError, LinkOption, Path, fs, lstat};
use tidefile_scan::{WalkEntry, Walker};
use tracing::{debug, warn};

use crate::conflict::fresh_destination;
use crate::job::{Cancelled, Job};

pub(crate) fn run(job: &mut Job) -> Result<(), Cancelled> {
    let destination = job.target.destination.clone();
    for source in job.target.sources.clone() {
        job.checkpoint()?;
        match root_destination(&source, &destination) {
            Ok(dest) => {
                copy_tree(job, &source, &dest)?;
            }
            Err(err) => job.fail(source, err),
        }
    }
    Ok(())
}

/// Where `source` lands inside `dir`: its own name, or the first free
/// numbered variant of it.
pub(crate) fn root_destination(source: &Path, dir: &Path) -> Result<Path, FsError> {
    let stat = lstat(source)?;
    let name = source
        .name()
        .ok_or_else(|| FsError::from_errno(source.clone(), Errno::INVAL))?;
    fresh_destination(dir, name, stat.is_dir())
}

/// Copy `source` and everything beneath it to `dest`, which must not exist.
///
/// Returns whether every entry was copied.
pub(crate) fn copy_tree(job: &mut Job, source: &Path, dest: &Path) -> Result<bool, Cancelled> {
    let mut complete = true;
    // Source directories that were not recreated; their subtrees are skipped.
    let mut skipped: HashSet<Path> = HashSet::new();
    let mut created_dirs: Vec<(Path, FileStat)> = Vec::new();

    for visit in Walker::new([source.clone()]) {
        if let Err(cancelled) = job.checkpoint() {
            finish_dirs(job, &created_dirs);
            return Err(cancelled);
        }

        let entry = match visit {
            Ok(entry) => entry,
            Err(err) => {
                complete = false;
                job.fail(err.path().clone(), err);
                continue;
            }
        };

        if entry.path.parent().is_some_and(|p| skipped.contains(&p)) {
            complete = false;
            if entry.stat.is_dir() {
                skipped.insert(entry.path);
            }
            continue;
        }

        let target = match entry.path.rebase(source, dest) {
            Ok(target) => target,
            Err(_) => continue,
        };

        match copy_entry(job, &entry, &target) {
            Ok(()) => {
                if entry.stat.is_dir() {
                    created_dirs.push((target, entry.stat));
                }
            }
            Err(err) => {
                complete = false;
                if entry.stat.is_dir() {
                    skipped.insert(entry.path.clone());
                }
                job.fail(entry.path, err);
            }
        }
    }

    finish_dirs(job, &created_dirs);
    Ok(complete)
}

fn copy_entry(job: &mut Job, entry: &WalkEntry, target: &Path) -> Result<(), FsError> {
    match entry.stat.kind {
        FileKind::Directory => {
            // Writable until its children are in; see `finish_dirs`.
            fs::create_dir(target, entry.stat.mode | 0o700)?;
            job.reporter.advance(1, entry.stat.size);
        }
        FileKind::Symlink => {
            let link = fs::read_link(&entry.path)?;
            fs::symlink(&link, target)?;
            preserve_times(job, target, &entry.stat);
            job.reporter.advance(1, entry.stat.size);
        }
        FileKind::Regular => {
            copy_file(job, &entry.path, target, &entry.stat)?;
            job.reporter.advance(1, 0);
        }
        _ => return Err(FsError::from_errno(entry.path.clone(), Errno::OPNOTSUPP)),
    }
    debug!(source = %entry.path, target = %target, "Copied");
    Ok(())
}

/// Copy file content. A partially written target is removed on failure.
fn copy_file(job: &mut Job, source: &Path, target: &Path, stat: &FileStat) -> Result<(), FsError> {
    let mut reader = File::open(source.to_path_buf()).map_err(|e| FsError::io(source.clone(), &e))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(stat.mode)
        .open(target.to_path_buf())
        .map_err(|e| FsError::io(target.clone(), &e))?;

    let result = pump(job, &mut reader, &mut writer, source, target);
    drop(writer);

    if let Err(err) = result {
        if let Err(cleanup) = fs::remove_file(target) {
            warn!(path = %target, error = %cleanup, "Failed to delete partial copy");
        }
        return Err(err);
    }

    preserve_times(job, target, stat);
    Ok(())
}

fn pump(
    job: &mut Job,
    reader: &mut File,
    writer: &mut File,
    source: &Path,
    target: &Path,
) -> Result<(), FsError> {
    let mut buf = vec![0u8; job.config.copy_buffer_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsError::io(source.clone(), &e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| FsError::io(target.clone(), &e))?;
        job.reporter.advance(0, n as u64);
    }
}

/// Best effort; a failure is logged, not reported.
fn preserve_times(job: &Job, target: &Path, stat: &FileStat) {
    if !job.config.preserve_timestamps {
        return;
    }
    if let Err(err) = fs::set_times(target, stat.accessed, stat.modified, LinkOption::NoFollow) {
        warn!(path = %target, error = %err, "Failed to preserve timestamps");
    }
}

/// Directory modes and times are set last, deepest first, since writing
/// children needs write access and changes the times.
fn finish_dirs(job: &Job, dirs: &[(Path, FileStat)]) {
    for (path, stat) in dirs.iter().rev() {
        if let Err(err) = fs::set_mode(path, stat.mode) {
            warn!(path = %path, error = %err, "Failed to set directory mode");
        }
        preserve_times(job, path, stat);
    }
}
