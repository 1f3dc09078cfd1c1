//! Store and save options.
//!
//! ```
//! use skipkv::{DbOptions, SaveOptions};
//! use std::time::Duration;
//!
//! let options = DbOptions::new()
//!     .with_expired()
//!     .with_sweep_interval(Duration::from_millis(500));
//! assert!(options.expired());
//!
//! let save = SaveOptions::new().with_ttl(30);
//! assert_eq!(save.ttl(), Some(Duration::from_secs(30)));
//! ```

use crate::storage::expiry::SweepConfig;
use std::time::Duration;

/// A predicate over stored values used by `count` and `list`.
///
/// Several predicates combine with logical AND.
pub type Query<V> = dyn Fn(&V) -> bool;

/// Options fixed when a store is created.
#[derive(Debug, Clone, Default)]
pub struct DbOptions {
    expired: bool,
    sweep: SweepConfig,
}

impl DbOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables per-entry TTLs and the background sweep that reclaims expired entries.
    pub fn with_expired(mut self) -> Self {
        self.expired = true;
        self
    }

    /// Sets how often the sweep runs. Only meaningful together with [`with_expired`](Self::with_expired).
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep.interval = interval;
        self
    }

    pub fn expired(&self) -> bool {
        self.expired
    }

    pub fn sweep(&self) -> &SweepConfig {
        &self.sweep
    }
}

/// Options for a single save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    ttl: Option<Duration>,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expires the entry `seconds` after the save. Values `<= 0` leave the
    /// options unchanged, so the entry does not expire.
    pub fn with_ttl(self, seconds: i64) -> Self {
        if seconds <= 0 {
            return self;
        }
        self.with_ttl_duration(Duration::from_secs(seconds.unsigned_abs()))
    }

    /// Like [`with_ttl`](Self::with_ttl) with sub-second precision. A zero duration is ignored.
    pub fn with_ttl_duration(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            self.ttl = Some(ttl);
        }
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}
