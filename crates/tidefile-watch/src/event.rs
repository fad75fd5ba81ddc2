//! Mapping raw backend events to the directories whose listing changed.

use notify::event::{EventKind, ModifyKind};
use tidefile_core::Path;

/// Whether an event can change a directory listing. Content and metadata
/// modifications cannot.
fn changes_listing(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any
            | EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Directories affected by `event`, restricted to those `is_watched`
/// accepts.
///
/// A created, removed or renamed path affects its parent directory. When
/// the path is itself a watched directory, a removal or rename of it is
/// reported against the directory too.
pub(crate) fn affected_dirs(event: &notify::Event, is_watched: impl Fn(&Path) -> bool) -> Vec<Path> {
    if !changes_listing(&event.kind) {
        return Vec::new();
    }
    let self_event = !matches!(event.kind, EventKind::Create(_));

    let mut dirs: Vec<Path> = Vec::new();
    for raw in &event.paths {
        let path = Path::from(raw.as_path());
        if let Some(parent) = path.parent()
            && is_watched(&parent)
            && !dirs.contains(&parent)
        {
            dirs.push(parent);
        }
        if self_event && is_watched(&path) && !dirs.contains(&path) {
            dirs.push(path);
        }
    }
    dirs
}
