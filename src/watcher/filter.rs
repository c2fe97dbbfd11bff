//! Event filtering against the tracked file set.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind};

use super::recorder::{FileSet, TrackedFile};

/// Check if a change to `path` should trigger a reload.
///
/// Matches the exact (directory, base name) pair: other files sharing a
/// watched directory never match. Empty paths are rejected silently;
/// paths that cannot be resolved are logged and rejected.
#[must_use]
pub fn should_trigger(path: &Path, files: &FileSet) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }

    match TrackedFile::from_path(path) {
        Ok(file) => files.contains(&file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Dropping event for unresolvable path");
            false
        }
    }
}

/// Check if an event kind can indicate a content change.
///
/// Access events are produced by reads, including the reload itself.
#[must_use]
pub fn is_change(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

/// Return the first path of `event` that refers to a tracked file.
#[must_use]
pub fn matching_path<'a>(event: &'a Event, files: &FileSet) -> Option<&'a PathBuf> {
    if !is_change(&event.kind) {
        return None;
    }
    event.paths.iter().find(|path| should_trigger(path, files))
}
