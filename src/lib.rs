//! confwatch
//!
//! Watches a configuration file and everything it imports, and triggers a
//! single debounced reload once edits settle.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observability;
pub mod parser;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result, WatcherError};
pub use parser::{ConfigParser, ImportParser};
pub use watcher::{ChannelTrigger, ConfigInput, ConfigWatcher, ReloadTrigger};
