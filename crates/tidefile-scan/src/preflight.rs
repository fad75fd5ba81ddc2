//! Paste pre-flight: map every source descendant to its destination and flag
//! type conflicts before any byte is written.

use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tidefile_core::{EngineConfig, FileKind, FsError, Path, Target, TargetError, Throttle, lstat};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::progress::ScanProgress;
use crate::walker::Walker;

/// Why a planned entry cannot be written as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// The destination exists and exactly one of the two is a directory.
    TypeConflict,
}

/// One source entry and where it would land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEntry {
    pub source: Path,
    pub destination: Path,
    pub kind: FileKind,
    pub conflict: Option<ConflictKind>,
}

/// Result of a pre-flight, in breadth-first order of the sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictMap {
    entries: IndexMap<Path, PlannedEntry>,
    errors: Vec<FsError>,
}

impl ConflictMap {
    pub fn get(&self, source: &Path) -> Option<&PlannedEntry> {
        self.entries.get(source)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PlannedEntry> {
        self.entries.values()
    }

    /// Entries whose destination has an incompatible type.
    pub fn conflicts(&self) -> impl Iterator<Item = &PlannedEntry> {
        self.entries.values().filter(|e| e.conflict.is_some())
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts().next().is_some()
    }

    /// Paths that could not be statted or listed.
    pub fn errors(&self) -> &[FsError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The directory `source` is relative to when it is placed elsewhere.
pub fn source_base(source: &Path) -> Path {
    source.parent().unwrap_or_else(|| {
        if source.is_absolute() {
            Path::root()
        } else {
            Path::default()
        }
    })
}

/// Walk all sources of `target` and compute where each entry would be
/// placed under `target.destination`.
///
/// `on_progress` is called at most once per `config.progress_interval`, and
/// once more at the end with the final counts. Returns `Ok(None)` if
/// `cancel` fires before the walk completes.
pub fn preflight(
    target: &Target,
    config: &EngineConfig,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(&ScanProgress),
) -> Result<Option<ConflictMap>, TargetError> {
    target.resolve()?;

    let start = Instant::now();
    let mut throttle = Throttle::new(config.progress_interval);
    let mut progress = ScanProgress::new();
    let mut map = ConflictMap::default();

    for visit in Walker::new(target.sources.iter().cloned()) {
        if cancel.is_cancelled() {
            debug!(destination = %target.destination, "Pre-flight cancelled");
            return Ok(None);
        }

        match visit {
            Ok(entry) => {
                let source = &target.sources[entry.root];
                progress.entries_scanned += 1;
                if entry.stat.is_dir() {
                    progress.dirs_scanned += 1;
                }

                let destination = match entry.path.rebase(&source_base(source), &target.destination) {
                    Ok(destination) => destination,
                    // Walked paths are always under their root.
                    Err(_) => continue,
                };
                let conflict = match lstat(&destination) {
                    Ok(existing) if existing.is_dir() != entry.stat.is_dir() => {
                        Some(ConflictKind::TypeConflict)
                    }
                    Ok(_) => None,
                    Err(err) if err.is_not_found() => None,
                    Err(err) => {
                        progress.errors_count += 1;
                        map.errors.push(err);
                        None
                    }
                };
                progress.current_path = entry.path.clone();
                map.entries.insert(
                    entry.path.clone(),
                    PlannedEntry {
                        source: entry.path,
                        destination,
                        kind: entry.stat.kind,
                        conflict,
                    },
                );
            }
            Err(err) => {
                progress.errors_count += 1;
                map.errors.push(err);
            }
        }

        let now = Instant::now();
        if throttle.ready(now) {
            progress.elapsed = now - start;
            on_progress(&progress);
        }
    }

    progress.elapsed = start.elapsed();
    on_progress(&progress);

    info!(
        destination = %target.destination,
        entries = map.len(),
        conflicts = map.conflicts().count(),
        errors = map.errors.len(),
        "Pre-flight finished"
    );
    Ok(Some(map))
}
