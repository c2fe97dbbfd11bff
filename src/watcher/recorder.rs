//! Import recorder.
//!
//! Collects every file the parser opens during one generation build,
//! keyed by (directory, base name) and kept in first-seen order so the
//! root file stays at index 0.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::paths::{absolutize, canonical_dir, split};
use crate::{Error, Result};

/// A file participating in the configuration's import graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedFile {
    dir: PathBuf,
    name: OsString,
}

impl TrackedFile {
    /// Create a tracked file from an already absolute directory and name.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<OsString>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Resolve `path` into a tracked file.
    ///
    /// # Errors
    ///
    /// Returns `Error::PathResolution` if the path cannot be made absolute
    /// or has no file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let abs = absolutize(path)?;
        let (dir, name) = split(&abs).ok_or_else(|| Error::path_resolution(path, "no file name"))?;
        Ok(Self {
            dir: canonical_dir(&dir),
            name,
        })
    }

    /// Containing directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Base name.
    #[must_use]
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Full absolute path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

impl Serialize for TrackedFile {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(&self.path().display())
    }
}

/// Ordered, duplicate-free set of tracked files.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: Vec<TrackedFile>,
    index: HashSet<TrackedFile>,
}

impl FileSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, returning `false` if it was already present.
    pub fn insert(&mut self, file: TrackedFile) -> bool {
        if self.index.contains(&file) {
            return false;
        }
        self.index.insert(file.clone());
        self.files.push(file);
        true
    }

    /// Whether the exact (directory, name) pair is present.
    #[must_use]
    pub fn contains(&self, file: &TrackedFile) -> bool {
        self.index.contains(file)
    }

    /// The root file, if any file has been recorded.
    #[must_use]
    pub fn root(&self) -> Option<&TrackedFile> {
        self.files.first()
    }

    /// Iterate in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedFile> {
        self.files.iter()
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Absolute paths in first-seen order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(TrackedFile::path).collect()
    }
}

impl PartialEq for FileSet {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files
    }
}

impl Eq for FileSet {}

impl Serialize for FileSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(&self.files)
    }
}

/// Records files reported by the parser during one generation build.
///
/// Resolution failures do not interrupt parsing: the first one is kept and
/// surfaced by [`ImportRecorder::finish`], so files reported before it are
/// still available through [`ImportRecorder::files`].
#[derive(Debug, Default)]
pub struct ImportRecorder {
    files: FileSet,
    error: Option<Error>,
}

impl ImportRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file opened by the parser.
    ///
    /// Returns `true` if the file was not seen before in this build.
    pub fn record(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match TrackedFile::from_path(path) {
            Ok(file) => {
                let added = self.files.insert(file);
                if added {
                    tracing::trace!(path = %path.display(), "Recorded configuration file");
                }
                added
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot resolve configuration file");
                if self.error.is_none() {
                    self.error = Some(e);
                }
                false
            }
        }
    }

    /// Files recorded so far.
    #[must_use]
    pub fn files(&self) -> &FileSet {
        &self.files
    }

    /// Whether a resolution failure has been recorded.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Finish recording.
    ///
    /// # Errors
    ///
    /// Returns the first path resolution error recorded during the build.
    pub fn finish(self) -> Result<FileSet> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.files),
        }
    }
}
