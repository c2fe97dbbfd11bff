//! Fixed-window debouncing of configuration changes.
//!
//! Editors often emit several events per save (write, rename, metadata
//! touch). The first matching event starts a quiet window and puts the
//! debouncer into the blind state; everything arriving while blind is
//! discarded. When the window elapses the debouncer becomes idle again and
//! the reload trigger fires once.
//!
//! The window is measured from the first event of a burst and is never
//! extended by later events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::stats::WatcherStats;
use super::trigger::ReloadTrigger;

#[derive(Debug, Default)]
struct DebounceState {
    blind: bool,
    reason: Option<PathBuf>,
}

/// Collapses bursts of matching events into single reload triggers.
pub struct Debouncer {
    state: Arc<Mutex<DebounceState>>,
    window: Duration,
    trigger: Arc<dyn ReloadTrigger>,
    stats: Arc<WatcherStats>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("blind", &self.is_blind())
            .finish_non_exhaustive()
    }
}

impl Debouncer {
    /// Create an idle debouncer.
    pub fn new(
        window: Duration,
        trigger: Arc<dyn ReloadTrigger>,
        stats: Arc<WatcherStats>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(DebounceState::default())),
            window,
            trigger,
            stats,
        }
    }

    /// Report a change to a tracked file.
    ///
    /// Returns `true` if this change started a new quiet window.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the window timer is
    /// a spawned task.
    pub fn notify(&self, path: &Path) -> bool {
        {
            let mut state = self.state.lock();
            if state.blind {
                WatcherStats::bump(&self.stats.events_absorbed);
                tracing::trace!(path = %path.display(), "Change absorbed by quiet window");
                return false;
            }
            state.blind = true;
            state.reason = Some(path.to_path_buf());
        }

        let state = Arc::clone(&self.state);
        let trigger = Arc::clone(&self.trigger);
        let stats = Arc::clone(&self.stats);
        let window = self.window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let reason = {
                let mut state = state.lock();
                state.blind = false;
                state.reason.take()
            };

            if let Some(reason) = &reason {
                tracing::info!(path = %reason.display(), "Configuration file changed");
            }

            WatcherStats::bump(&stats.reloads_triggered);
            tracing::info!("Triggering configuration reload");
            if let Err(e) = trigger.trigger() {
                WatcherStats::bump(&stats.errors);
                tracing::error!(error = %e, "Reload trigger failed");
            }
        });

        true
    }

    /// Whether a quiet window is currently open.
    #[must_use]
    pub fn is_blind(&self) -> bool {
        self.state.lock().blind
    }

    /// Length of the quiet window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    const WINDOW: Duration = Duration::from_millis(50);

    fn counting_debouncer() -> (Debouncer, Arc<AtomicUsize>, Arc<WatcherStats>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let trigger = move || -> Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let stats = WatcherStats::new();
        let debouncer = Debouncer::new(WINDOW, Arc::new(trigger), Arc::clone(&stats));
        (debouncer, count, stats)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_window_triggers_once() {
        let (debouncer, count, stats) = counting_debouncer();
        let path = Path::new("/etc/app/Caddyfile");

        assert!(debouncer.notify(path));
        for _ in 0..4 {
            sleep(Duration::from_millis(2)).await;
            assert!(!debouncer.notify(path));
        }
        assert!(debouncer.is_blind());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_blind());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_absorbed, 4);
        assert_eq!(snapshot.reloads_triggered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_after_window_trigger_again() {
        let (debouncer, count, _stats) = counting_debouncer();
        let path = Path::new("/etc/app/Caddyfile");

        assert!(debouncer.notify(path));
        sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(debouncer.notify(path));
        sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_not_extended() {
        let (debouncer, count, _stats) = counting_debouncer();
        let path = Path::new("/etc/app/Caddyfile");

        debouncer.notify(path);
        sleep(Duration::from_millis(40)).await;
        debouncer.notify(path);
        sleep(Duration::from_millis(15)).await;

        // 55ms after the first event: a sliding window would still be open.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_blind());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_failure_is_counted() {
        let trigger = || -> Result<()> { Err(crate::Error::trigger("host gone")) };
        let stats = WatcherStats::new();
        let debouncer = Debouncer::new(WINDOW, Arc::new(trigger), Arc::clone(&stats));

        debouncer.notify(Path::new("/etc/app/Caddyfile"));
        sleep(Duration::from_millis(60)).await;

        assert_eq!(stats.snapshot().errors, 1);
        assert!(!debouncer.is_blind());
    }
}
