//! Directory watches for one generation.
//!
//! Directories are watched rather than files: editors commonly save by
//! writing a temp file and renaming it over the original, which only shows
//! up reliably as create/rename events on the containing directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::recorder::FileSet;
use crate::error::WatcherError;
use crate::Result;

/// Sending halves of the notification channels.
///
/// Owned by the long-lived watcher and cloned into every generation's
/// `notify` callback, so closing a watch set never closes the channels.
#[derive(Debug, Clone)]
pub struct EventSinks {
    events: mpsc::UnboundedSender<Event>,
    errors: mpsc::UnboundedSender<notify::Error>,
}

/// Receiving halves of the notification channels.
#[derive(Debug)]
pub struct EventStreams {
    pub events: mpsc::UnboundedReceiver<Event>,
    pub errors: mpsc::UnboundedReceiver<notify::Error>,
}

/// Create a connected pair of event sinks and streams.
#[must_use]
pub fn channels() -> (EventSinks, EventStreams) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (errors_tx, errors_rx) = mpsc::unbounded_channel();
    (
        EventSinks {
            events: events_tx,
            errors: errors_tx,
        },
        EventStreams {
            events: events_rx,
            errors: errors_rx,
        },
    )
}

impl EventSinks {
    pub(crate) fn forward(&self, result: notify::Result<Event>) {
        let delivered = match result {
            Ok(event) => self.events.send(event).is_ok(),
            Err(e) => self.errors.send(e).is_ok(),
        };
        if !delivered {
            tracing::trace!("Notification dropped, event loop has stopped");
        }
    }
}

/// Distinct directories containing `files`, in first-seen order.
#[must_use]
pub fn watch_dirs(files: &FileSet) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    files
        .iter()
        .map(|file| file.dir())
        .filter(|dir| seen.insert(*dir))
        .map(Path::to_path_buf)
        .collect()
}

/// Live set of directory watches.
///
/// Dropping the set releases every underlying watch handle.
pub struct WatchSet {
    watcher: RecommendedWatcher,
    dirs: Vec<PathBuf>,
}

impl std::fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSet").field("dirs", &self.dirs).finish()
    }
}

impl WatchSet {
    /// Watch every directory containing a file in `files`.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::Init` if the notification watcher cannot be
    /// created and `WatcherError::WatchInstall` naming the first directory
    /// that cannot be watched. Directories installed before the failure are
    /// released.
    pub fn install(files: &FileSet, sinks: &EventSinks) -> Result<Self> {
        let sinks = sinks.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| sinks.forward(result),
            notify::Config::default(),
        )
        .map_err(|e| WatcherError::Init(e.to_string()))?;

        let dirs = watch_dirs(files);
        for dir in &dirs {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| WatcherError::watch_install(dir, e))?;
            tracing::debug!(dir = %dir.display(), "Watching directory");
        }

        for file in files.iter() {
            tracing::info!(path = %file.path().display(), "Watching config file");
        }

        Ok(Self { watcher, dirs })
    }

    /// Watched directories.
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Release every watch.
    pub fn close(mut self) {
        for dir in &self.dirs {
            if let Err(e) = self.watcher.unwatch(dir) {
                tracing::debug!(dir = %dir.display(), error = %e, "Failed to unwatch directory");
            }
        }
        tracing::debug!(dirs = self.dirs.len(), "Closed watch set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::recorder::TrackedFile;
    use crate::Error;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn file_set(files: &[(&Path, &str)]) -> FileSet {
        let mut set = FileSet::new();
        for (dir, name) in files {
            set.insert(TrackedFile::new(*dir, *name));
        }
        set
    }

    #[test]
    fn test_watch_dirs_are_distinct() {
        let files = file_set(&[
            (Path::new("/etc/app"), "Caddyfile"),
            (Path::new("/etc/app/sites"), "a.conf"),
            (Path::new("/etc/app"), "b.conf"),
            (Path::new("/etc/app/sites"), "c.conf"),
        ]);

        assert_eq!(
            watch_dirs(&files),
            vec![PathBuf::from("/etc/app"), PathBuf::from("/etc/app/sites")]
        );
    }

    #[test]
    fn test_watch_dirs_empty() {
        assert!(watch_dirs(&FileSet::new()).is_empty());
    }

    #[tokio::test]
    async fn test_install_watches_each_directory_once() {
        let tmp = TempDir::new().unwrap();
        let sites = tmp.path().join("sites");
        fs::create_dir(&sites).unwrap();

        let files = file_set(&[
            (tmp.path(), "app.conf"),
            (sites.as_path(), "a.conf"),
            (tmp.path(), "b.conf"),
        ]);
        let (sinks, _streams) = channels();

        let set = WatchSet::install(&files, &sinks).unwrap();
        assert_eq!(set.dirs(), &[tmp.path().to_path_buf(), sites]);
        set.close();
    }

    #[tokio::test]
    async fn test_install_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let files = file_set(&[(tmp.path(), "app.conf"), (missing.as_path(), "a.conf")]);
        let (sinks, _streams) = channels();

        let err = WatchSet::install(&files, &sinks).unwrap_err();
        match err {
            Error::Watcher(WatcherError::WatchInstall { dir, .. }) => assert_eq!(dir, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_installed_set_forwards_events() {
        let tmp = TempDir::new().unwrap();
        let files = file_set(&[(tmp.path(), "app.conf")]);
        let (sinks, mut streams) = channels();

        let set = WatchSet::install(&files, &sinks).unwrap();
        fs::write(tmp.path().join("app.conf"), "listen 80\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), streams.events.recv())
            .await
            .expect("no event within timeout")
            .expect("event channel closed");
        assert!(event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == "app.conf")));
        drop(set);
    }
}
