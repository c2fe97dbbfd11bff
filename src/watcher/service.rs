//! Generation builds and the long-lived event loop.
//!
//! A generation is one pass of parse, record, install watches. Each build
//! replaces the tracked file set and the watch set wholesale. The event
//! loop is spawned once on the first successful build and reads the current
//! file set through a shared lock, so later generations only swap state and
//! never start a second loop.
//!
//! The previous watch set is closed before the new one is installed. If
//! installation then fails, nothing is watched until the next successful
//! build; [`ConfigWatcher::is_watching`] reports this and a warning is
//! logged. The tracked file set always belongs to the last successful
//! generation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use notify::Event;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::debouncer::Debouncer;
use super::filter::matching_path;
use super::recorder::{FileSet, ImportRecorder};
use super::stats::{WatcherStats, WatcherStatsSnapshot};
use super::trigger::ReloadTrigger;
use super::watch_set::{channels, EventSinks, EventStreams, WatchSet};
use crate::config::Config;
use crate::error::WatcherError;
use crate::observability::spans;
use crate::parser::ConfigParser;
use crate::Result;

/// Raw configuration input handed back to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigInput {
    path: Option<PathBuf>,
    body: Vec<u8>,
}

impl ConfigInput {
    /// Input read from `path`.
    pub fn new(path: impl Into<PathBuf>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path: Some(path.into()),
            body: body.into(),
        }
    }

    /// Input for a host without any configuration file.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Root file the input was read from.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw contents of the root file.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether this input has no backing file.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.path.is_none()
    }
}

/// Summary of the active generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationInfo {
    /// Sequence number, starting at 1.
    pub number: u64,
    /// When the generation finished building.
    pub built_at: DateTime<Utc>,
    /// Root configuration file.
    pub root: PathBuf,
    /// Files in the import graph.
    pub files: FileSet,
    /// Directories being watched.
    pub dirs: Vec<PathBuf>,
}

/// Watches a configuration's import graph and triggers debounced reloads.
pub struct ConfigWatcher {
    config: Config,
    parser: Arc<dyn ConfigParser>,
    sinks: EventSinks,
    streams: Mutex<Option<EventStreams>>,
    files: Arc<RwLock<Arc<FileSet>>>,
    watch: Mutex<Option<WatchSet>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
    debouncer: Arc<Debouncer>,
    stats: Arc<WatcherStats>,
    generation: Mutex<Option<GenerationInfo>>,
}

impl std::fmt::Debug for ConfigWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcher")
            .field("config", &self.config)
            .field("watch", &*self.watch.lock())
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl ConfigWatcher {
    /// Create a watcher. Nothing is watched until the first build.
    pub fn new(
        config: Config,
        parser: Arc<dyn ConfigParser>,
        trigger: Arc<dyn ReloadTrigger>,
    ) -> Self {
        let (sinks, streams) = channels();
        let stats = WatcherStats::new();
        let debouncer = Arc::new(Debouncer::new(config.debounce, trigger, Arc::clone(&stats)));

        Self {
            config,
            parser,
            sinks,
            streams: Mutex::new(Some(streams)),
            files: Arc::new(RwLock::new(Arc::new(FileSet::new()))),
            watch: Mutex::new(None),
            event_loop: Mutex::new(None),
            debouncer,
            stats,
            generation: Mutex::new(None),
        }
    }

    /// Load the configuration and start watching it.
    ///
    /// Returns `None` when watching is disabled, and an empty input without
    /// installing watches when no configuration file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the root file cannot be read or the generation
    /// build fails.
    pub fn load(&self) -> Result<Option<ConfigInput>> {
        if !self.config.watch_enabled {
            tracing::debug!("Configuration watching disabled");
            return Ok(None);
        }

        let Some(root) = self.config.root_path() else {
            tracing::info!(
                default = %self.config.default_file_name,
                "No configuration file found, nothing to watch"
            );
            return Ok(Some(ConfigInput::empty()));
        };

        let body = std::fs::read(&root)?;
        self.build_generation(ConfigInput::new(root, body)).map(Some)
    }

    /// Build a new generation for `input`.
    ///
    /// On a parse or path resolution error the previous generation stays
    /// active. On a watch installation error the previous watch set has
    /// already been closed and nothing is watched.
    ///
    /// # Errors
    ///
    /// Returns the first error from parsing, path resolution, watch
    /// installation, or starting the event loop.
    pub fn build_generation(&self, input: ConfigInput) -> Result<ConfigInput> {
        let Some(root) = input.path().map(Path::to_path_buf) else {
            return Ok(input);
        };

        let number = self.stats.snapshot().generations + 1;
        let span = spans::generation_span(&root, number);
        let _guard = span.enter();

        let mut recorder = ImportRecorder::new();
        recorder.record(&root);
        self.parser.parse(&root, input.body(), &mut recorder)?;
        let files = Arc::new(recorder.finish()?);

        let dirs = {
            let mut watch = self.watch.lock();
            if let Some(previous) = watch.take() {
                previous.close();
            }

            let previous_files = std::mem::replace(&mut *self.files.write(), Arc::clone(&files));

            match WatchSet::install(&files, &self.sinks) {
                Ok(set) => {
                    let dirs = set.dirs().to_vec();
                    *watch = Some(set);
                    dirs
                }
                Err(e) => {
                    *self.files.write() = previous_files;
                    WatcherStats::bump(&self.stats.errors);
                    tracing::warn!(
                        error = %e,
                        "No configuration files are watched until the next successful reload"
                    );
                    return Err(e);
                }
            }
        };

        self.ensure_event_loop()?;

        WatcherStats::bump(&self.stats.generations);
        tracing::info!(
            files = files.len(),
            dirs = dirs.len(),
            "Configuration generation built"
        );

        *self.generation.lock() = Some(GenerationInfo {
            number,
            built_at: Utc::now(),
            root,
            files: FileSet::clone(&files),
            dirs,
        });

        Ok(input)
    }

    fn ensure_event_loop(&self) -> Result<()> {
        let mut task = self.event_loop.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }

        let runtime = Handle::try_current()
            .map_err(|e| WatcherError::Init(format!("event loop needs a tokio runtime: {e}")))?;
        let streams = self
            .streams
            .lock()
            .take()
            .ok_or_else(|| WatcherError::Init("event loop channels are closed".to_string()))?;

        *task = Some(runtime.spawn(run_event_loop(
            streams,
            Arc::clone(&self.files),
            Arc::clone(&self.debouncer),
            Arc::clone(&self.stats),
        )));
        tracing::debug!("Started configuration event loop");
        Ok(())
    }

    /// Files tracked by the current generation.
    #[must_use]
    pub fn tracked_files(&self) -> Arc<FileSet> {
        Arc::clone(&self.files.read())
    }

    /// Directories currently watched.
    #[must_use]
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watch
            .lock()
            .as_ref()
            .map(|set| set.dirs().to_vec())
            .unwrap_or_default()
    }

    /// Whether a watch set is installed.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    /// Whether a quiet window is open.
    #[must_use]
    pub fn is_debouncing(&self) -> bool {
        self.debouncer.is_blind()
    }

    /// Summary of the last successful generation.
    #[must_use]
    pub fn generation(&self) -> Option<GenerationInfo> {
        self.generation.lock().clone()
    }

    /// Snapshot of watcher statistics.
    #[must_use]
    pub fn stats(&self) -> WatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop.get_mut().take() {
            task.abort();
        }
    }
}

async fn run_event_loop(
    mut streams: EventStreams,
    files: Arc<RwLock<Arc<FileSet>>>,
    debouncer: Arc<Debouncer>,
    stats: Arc<WatcherStats>,
) {
    loop {
        tokio::select! {
            event = streams.events.recv() => {
                let Some(event) = event else { break };
                handle_event(&event, &files, &debouncer, &stats);
            }
            error = streams.errors.recv() => {
                let Some(error) = error else { break };
                WatcherStats::bump(&stats.errors);
                let error = WatcherError::notification(error);
                tracing::warn!(error = %error, "Error from file watcher");
            }
        }
    }

    tracing::debug!("Configuration event loop stopped");
}

fn handle_event(
    event: &Event,
    files: &RwLock<Arc<FileSet>>,
    debouncer: &Debouncer,
    stats: &WatcherStats,
) {
    WatcherStats::bump(&stats.events_received);
    let files = Arc::clone(&files.read());

    match matching_path(event, &files) {
        Some(path) => {
            WatcherStats::bump(&stats.events_matched);
            debouncer.notify(path);
        }
        None => WatcherStats::bump(&stats.events_ignored),
    }
}
