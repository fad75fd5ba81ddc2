//! Move: rename into the destination, falling back to copy and delete
//! across filesystems.

use tidefile_core::{FsError, Path, fs};
use tidefile_scan::source_base;
use tracing::debug;

use crate::copy::{copy_tree, root_destination};
use crate::delete::delete_tree;
use crate::job::{Cancelled, Job};
use crate::progress::Tally;

pub(crate) fn run(job: &mut Job, tallies: &[Tally]) -> Result<(), Cancelled> {
    let destination = job.target.destination.clone();
    let sources = job.target.sources.clone();

    for (source, tally) in sources.iter().zip(tallies) {
        job.checkpoint()?;

        if source_base(source).normalize() == destination.normalize() {
            debug!(path = %source, "Already in destination");
            job.reporter.advance(tally.items, tally.bytes);
            continue;
        }

        let dest = match root_destination(source, &destination) {
            Ok(dest) => dest,
            Err(err) => {
                job.fail(source.clone(), err);
                continue;
            }
        };

        match fs::rename(source, &dest) {
            Ok(()) => {
                debug!(source = %source, target = %dest, "Renamed");
                job.reporter.advance(tally.items, tally.bytes);
            }
            Err(FsError::CrossDevice { .. }) => {
                debug!(source = %source, target = %dest, "Crossing devices, copying instead");
                move_by_copy(job, source, &dest)?;
            }
            Err(err) => job.fail(source.clone(), err),
        }
    }
    Ok(())
}

/// Copy `source` to `dest`, then delete `source` if every entry made it
/// across. Progress is counted by the copy only.
fn move_by_copy(job: &mut Job, source: &Path, dest: &Path) -> Result<(), Cancelled> {
    if copy_tree(job, source, dest)? {
        delete_tree(job, source, false)?;
    }
    Ok(())
}
