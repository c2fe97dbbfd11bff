//! Configuration parser seam.
//!
//! The watcher does not understand configuration syntax. It only needs the
//! parser to report every file it opens, root and nested imports alike,
//! through an [`ImportRecorder`]. [`ImportParser`] is a minimal line-based
//! implementation for hosts whose format resolves includes with an
//! `import <path>` directive.

use std::path::{Path, PathBuf};

use crate::watcher::paths::absolutize;
use crate::watcher::ImportRecorder;
use crate::{Error, Result};

/// Directive that pulls another file into the configuration.
const IMPORT_DIRECTIVE: &str = "import";

/// A configuration parser that reports the files it opens.
pub trait ConfigParser: Send + Sync {
    /// Parse the configuration rooted at `path` with contents `body`.
    ///
    /// Implementations call [`ImportRecorder::record`] once for every
    /// imported file, synchronously, during this call. The root file is
    /// recorded by the caller.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` if the configuration is invalid.
    fn parse(&self, path: &Path, body: &[u8], recorder: &mut ImportRecorder) -> Result<()>;
}

/// Line-based parser following `import <path>` directives.
///
/// Relative imports resolve against the importing file's directory.
/// `#` starts a comment. Paths may be wrapped in double quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportParser;

impl ImportParser {
    /// Create a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn parse_file(
        &self,
        path: &Path,
        body: &str,
        recorder: &mut ImportRecorder,
        stack: &mut Vec<PathBuf>,
    ) -> Result<()> {
        for (index, line) in body.lines().enumerate() {
            let line_no = index + 1;
            let Some(target) = import_target(path, line_no, line)? else {
                continue;
            };

            let target = match path.parent() {
                Some(dir) if target.is_relative() => dir.join(target),
                _ => target,
            };

            recorder.record(&target);

            // Unresolvable imports are already held by the recorder.
            let Ok(key) = absolutize(&target) else {
                continue;
            };
            if stack.contains(&key) {
                return Err(Error::parse(
                    path,
                    format!("line {line_no}: import cycle through '{}'", key.display()),
                ));
            }

            let content = std::fs::read_to_string(&target).map_err(|e| {
                Error::parse(
                    path,
                    format!("line {line_no}: cannot import '{}': {e}", target.display()),
                )
            })?;

            stack.push(key);
            self.parse_file(&target, &content, recorder, stack)?;
            stack.pop();
        }

        Ok(())
    }
}

impl ConfigParser for ImportParser {
    fn parse(&self, path: &Path, body: &[u8], recorder: &mut ImportRecorder) -> Result<()> {
        let body = std::str::from_utf8(body).map_err(|e| Error::parse(path, e.to_string()))?;
        let root = absolutize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut stack = vec![root];
        self.parse_file(path, body, recorder, &mut stack)
    }
}

/// Extract the import target from one line, if it is an import directive.
fn import_target(path: &Path, line_no: usize, line: &str) -> Result<Option<PathBuf>> {
    let line = line.split('#').next().unwrap_or_default().trim();
    let mut tokens = line.splitn(2, char::is_whitespace);
    if tokens.next() != Some(IMPORT_DIRECTIVE) {
        return Ok(None);
    }

    let rest = tokens.next().unwrap_or_default().trim();
    let target = if let Some(quoted) = rest.strip_prefix('"') {
        quoted.split('"').next().unwrap_or_default()
    } else {
        rest.split_whitespace().next().unwrap_or_default()
    };

    if target.is_empty() {
        return Err(Error::parse(
            path,
            format!("line {line_no}: {IMPORT_DIRECTIVE} needs a file argument"),
        ));
    }

    Ok(Some(PathBuf::from(target)))
}
