//! Delete: remove each source tree, children before parents.

use std::collections::HashSet;

use tidefile_core::{FsError, Path, fs};
use tidefile_scan::{WalkEntry, Walker};
use tracing::debug;

use crate::job::{Cancelled, Job};
use crate::operation::Failure;

type Visit = Result<WalkEntry, FsError>;

pub(crate) fn run(job: &mut Job) -> Result<(), Cancelled> {
    for source in job.target.sources.clone() {
        delete_tree(job, &source, true)?;
    }
    Ok(())
}

/// Remove `root` and everything beneath it.
///
/// The tree is walked breadth-first and then removed in reverse, so every
/// directory is emptied before it is removed. When an entry cannot be
/// removed its ancestors are left in place without further failures.
/// Failures are reported in walk order. `report` controls whether removed
/// entries count towards progress.
pub(crate) fn delete_tree(job: &mut Job, root: &Path, report: bool) -> Result<(), Cancelled> {
    let mut visits: Vec<Visit> = Vec::new();
    for visit in Walker::new([root.clone()]) {
        if job.checkpoint().is_err() {
            for err in visits.into_iter().filter_map(Result::err) {
                job.fail(err.path().clone(), err);
            }
            return Err(Cancelled);
        }
        visits.push(visit);
    }
    remove_walked(job, root, visits, report)
}

/// Remove what a walk of `root` produced, deepest first.
///
/// Entries that are already gone count as removed.
fn remove_walked(
    job: &mut Job,
    root: &Path,
    visits: Vec<Visit>,
    report: bool,
) -> Result<(), Cancelled> {
    let mut entries = Vec::new();
    let mut failures: Vec<(usize, Failure)> = Vec::new();
    // Directories that must stay because something beneath them stayed.
    let mut kept: HashSet<Path> = HashSet::new();

    for (index, visit) in visits.into_iter().enumerate() {
        match visit {
            Ok(entry) => entries.push((index, entry)),
            Err(err) if err.is_not_found() && err.path() != root => {
                debug!(path = %err.path(), "Vanished before delete");
            }
            Err(err) => {
                let path = err.path().clone();
                if let Some(parent) = path.parent() {
                    kept.insert(parent);
                }
                kept.insert(path.clone());
                failures.push((index, Failure::new(path, err)));
            }
        }
    }

    let mut cancelled = false;
    for (index, entry) in entries.into_iter().rev() {
        if job.checkpoint().is_err() {
            cancelled = true;
            break;
        }
        if kept.contains(&entry.path) {
            if let Some(parent) = entry.path.parent() {
                kept.insert(parent);
            }
            continue;
        }
        let removed = if entry.stat.is_dir() {
            fs::remove_dir(&entry.path)
        } else {
            fs::remove_file(&entry.path)
        };
        match removed {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(path = %entry.path, "Vanished before delete");
            }
            Err(err) => {
                if let Some(parent) = entry.path.parent() {
                    kept.insert(parent);
                }
                failures.push((index, Failure::new(entry.path, err)));
                continue;
            }
        }
        if report {
            job.reporter.advance(1, entry.stat.size);
        }
    }

    failures.sort_by_key(|(index, _)| *index);
    for (_, failure) in failures {
        job.fail(failure.path, failure.cause);
    }

    if cancelled { Err(Cancelled) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_job;
    use std::fs as sfs;
    use tempfile::TempDir;
    use tidefile_core::LinkOption;

    fn tree() -> (TempDir, Path) {
        let dir = TempDir::new().unwrap();
        sfs::create_dir_all(dir.path().join("t/u")).unwrap();
        sfs::write(dir.path().join("t/u/f"), b"f").unwrap();
        sfs::write(dir.path().join("t/g"), b"g").unwrap();
        let root = Path::from(dir.path());
        (dir, root)
    }

    fn exists(path: &Path) -> bool {
        fs::exists(path, LinkOption::NoFollow).unwrap()
    }

    #[test]
    fn test_entry_removed_after_walk_is_not_a_failure() {
        let (_dir, root) = tree();
        let t = root.child("t");
        let (mut job, _rx) = test_job(&t);

        let visits: Vec<Visit> = Walker::new([t.clone()]).collect();
        assert_eq!(visits.len(), 4);
        sfs::remove_file(root.child("t/u/f").to_path_buf()).unwrap();

        remove_walked(&mut job, &t, visits, true).unwrap();
        assert!(job.failures.is_empty(), "{:?}", job.failures);
        assert!(!exists(&t));
    }

    #[test]
    fn test_vanished_descendant_listing_is_not_a_failure() {
        let (_dir, root) = tree();
        let t = root.child("t");
        let (mut job, _rx) = test_job(&t);

        let mut visits: Vec<Visit> = Walker::new([t.clone()]).collect();
        let u = root.child("t/u");
        visits.push(Err(FsError::from_errno(u, rustix::io::Errno::NOENT)));

        remove_walked(&mut job, &t, visits, true).unwrap();
        assert!(job.failures.is_empty(), "{:?}", job.failures);
        assert!(!exists(&t));
    }

    #[test]
    fn test_missing_root_is_a_failure() {
        let (_dir, root) = tree();
        let missing = root.child("missing");
        let (mut job, _rx) = test_job(&missing);

        delete_tree(&mut job, &missing, true).unwrap();
        assert_eq!(job.failures.len(), 1);
        assert_eq!(job.failures[0].path, missing);
        assert!(job.failures[0].cause.is_not_found());
    }
}
