//! Structured logging configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Plain text or JSON output
//! - Configurable log levels, overridable through `RUST_LOG`
//! - Spans around generation builds

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

use crate::config::Config;

/// Tracing configuration options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON output format
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl From<&Config> for TracingConfig {
    fn from(config: &Config) -> Self {
        Self {
            level: config.log_level.clone(),
            json: config.log_json,
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed in this process.
pub fn init_tracing(config: &TracingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer().with_target(true).with_thread_names(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!(
        "Tracing initialized: level={}, json={}",
        config.level,
        config.json
    );
}

/// Span helpers.
pub mod spans {
    use std::path::Path;

    use tracing::{info_span, Span};

    /// Create a span covering one generation build for `root`.
    #[must_use]
    pub fn generation_span(root: &Path, generation: u64) -> Span {
        info_span!(
            "generation",
            root = %root.display(),
            generation = generation,
        )
    }
}
