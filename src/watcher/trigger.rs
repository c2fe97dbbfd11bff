//! Reload trigger capability.
//!
//! The watcher decides *when* to reload; applying the new configuration is
//! up to the host, which receives a single zero-argument call per burst.

use tokio::sync::broadcast;

use crate::{Error, Result};

/// Something that can ask the host process to reload its configuration.
pub trait ReloadTrigger: Send + Sync {
    /// Request a reload.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered.
    fn trigger(&self) -> Result<()>;
}

impl<F> ReloadTrigger for F
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn trigger(&self) -> Result<()> {
        self()
    }
}

/// Reload trigger backed by a broadcast channel.
///
/// Every subscriber receives one `()` per debounced burst.
#[derive(Debug, Clone)]
pub struct ChannelTrigger {
    tx: broadcast::Sender<()>,
}

impl ChannelTrigger {
    /// Create a trigger buffering up to `capacity` undelivered reloads.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to reload requests.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for ChannelTrigger {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ReloadTrigger for ChannelTrigger {
    fn trigger(&self) -> Result<()> {
        self.tx
            .send(())
            .map(|_| ())
            .map_err(|_| Error::trigger("no reload subscribers"))
    }
}
