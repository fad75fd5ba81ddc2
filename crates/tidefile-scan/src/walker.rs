//! Breadth-first traversal over an explicit work queue.

use std::collections::VecDeque;

use tidefile_core::{FileStat, FsError, Path, list_children, lstat};
use tracing::debug;

/// An entry produced by [`Walker`].
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: Path,
    /// Metadata of the entry itself; symlinks are not followed.
    pub stat: FileStat,
    /// Index into the roots the walker was started with.
    pub root: usize,
    /// Distance from the root, which has depth 0.
    pub depth: usize,
}

/// Visits every root and its descendants in breadth-first order.
///
/// Children of a directory are visited in byte order of their names.
/// Symlinks are reported but never followed. An entry that cannot be statted
/// is reported as an error and skipped; a directory that cannot be listed is
/// reported as an entry followed by an error, and its siblings are still
/// visited.
pub struct Walker {
    queue: VecDeque<(Path, usize, usize)>,
    pending_error: Option<FsError>,
}

impl Walker {
    pub fn new(roots: impl IntoIterator<Item = Path>) -> Self {
        Self {
            queue: roots
                .into_iter()
                .enumerate()
                .map(|(root, path)| (path, root, 0))
                .collect(),
            pending_error: None,
        }
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }

        let (path, root, depth) = self.queue.pop_front()?;
        let stat = match lstat(&path) {
            Ok(stat) => stat,
            Err(err) => {
                debug!(path = %path, error = %err, "Cannot stat entry");
                return Some(Err(err));
            }
        };

        if stat.is_dir() {
            match list_children(&path) {
                Ok(children) => {
                    self.queue
                        .extend(children.into_iter().map(|child| (child, root, depth + 1)));
                }
                Err(err) => {
                    debug!(path = %path, error = %err, "Cannot list directory");
                    self.pending_error = Some(err);
                }
            }
        }

        Some(Ok(WalkEntry {
            path,
            stat,
            root,
            depth,
        }))
    }
}
