//! Path normalization shared by the recorder and the event filter.
//!
//! Paths are made absolute lexically: relative paths are joined onto the
//! current directory and `.`/`..` components are folded away. The containing
//! directory is then resolved through the filesystem when it exists, since
//! some `notify` backends (FSEvents) report events under the real path of a
//! watched directory. The base name is never resolved, so a file that was
//! just renamed away still maps to the same (directory, name) pair.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Make `path` absolute and normalized.
///
/// # Errors
///
/// Returns `Error::PathResolution` if the path is empty or the current
/// directory cannot be determined.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::path_resolution(path, "empty path"));
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| Error::path_resolution(path, e))?;
        cwd.join(path)
    };

    Ok(normalize(&joined))
}

/// Split an absolute path into its directory and base name.
///
/// Returns `None` for paths without a file name, such as `/`.
#[must_use]
pub fn split(path: &Path) -> Option<(PathBuf, OsString)> {
    let name = path.file_name()?;
    let dir = path.parent()?;
    Some((dir.to_path_buf(), name.to_os_string()))
}

/// Resolve symlinks in `dir`, keeping the lexical form if it does not exist.
#[must_use]
pub fn canonical_dir(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
