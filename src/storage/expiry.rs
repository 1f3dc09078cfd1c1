//! Background Expiry Sweeper
//!
//! Entries saved with a TTL stay in the skip list until something removes
//! them. The sweeper is a Tokio task that wakes up on a fixed interval, scans
//! the whole ordered sequence, and deletes every entry whose expiry instant
//! has passed.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Sleeps for the configured interval (default: 1s)
//! 2. Wakes up and scans every entry of the store
//! 3. Removes expired entries and their logical names
//! 4. Logs how many entries were reclaimed
//!
//! The task holds only a weak reference to the store, and stops as soon as
//! its [`ExpirySweeper`] handle is dropped. Each pass is O(n) in the number
//! of entries.

use crate::storage::engine::StoreInner;
use crate::storage::key::CustomKey;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Interval between sweeps (default: 1s)
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the sweeper on `runtime` for the store behind `store`.
    pub(crate) fn start<K, V>(
        runtime: &Handle,
        store: Weak<StoreInner<K, V>>,
        config: SweepConfig,
    ) -> Self
    where
        K: CustomKey,
        V: Clone + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        runtime.spawn(sweeper_loop(store, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        debug!("Background expiry sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop<K, V>(
    store: Weak<StoreInner<K, V>>,
    config: SweepConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    K: CustomKey,
    V: Clone + Send + Sync + 'static,
{
    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let Some(inner) = store.upgrade() else {
            trace!("Store dropped, expiry sweeper exiting");
            return;
        };

        let expired = inner.remove_expired();
        if expired > 0 {
            debug!(
                expired = expired,
                keys_remaining = inner.len(),
                "Expired keys cleaned up"
            );
        }
    }
}
