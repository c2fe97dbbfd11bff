//! Configuration file watching and reload triggering.
//!
//! This module provides:
//! - Import recording during a parse pass
//! - Directory watches over every file in the import graph
//! - Exact-match event filtering
//! - Fixed-window debouncing into a single reload trigger

mod debouncer;
mod filter;
pub(crate) mod paths;
mod recorder;
mod service;
mod stats;
mod trigger;
mod watch_set;

pub use debouncer::Debouncer;
pub use filter::{is_change, matching_path, should_trigger};
pub use recorder::{FileSet, ImportRecorder, TrackedFile};
pub use service::{ConfigInput, ConfigWatcher, GenerationInfo};
pub use stats::{WatcherStats, WatcherStatsSnapshot};
pub use trigger::{ChannelTrigger, ReloadTrigger};
pub use watch_set::{channels, watch_dirs, EventSinks, EventStreams, WatchSet};
