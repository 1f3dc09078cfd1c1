//! Key identity.
//!
//! A store is either *plain*, keyed by `String` in lexicographic order, or
//! *custom*, keyed by an application type ordered by an application
//! comparator. Custom keys expose a logical name: a stable string identity
//! that stays the same when the fields the comparator looks at change.
//!
//! Whatever the caller saves, the skip list stores an [`ExpiryKey`]: the
//! caller's key plus an optional expiry instant. The wrapper orders exactly
//! like the key it wraps, and callers never see it.

use std::borrow::Cow;
use std::time::{Duration, Instant};

/// A key that can be addressed by a logical name.
///
/// Implementors are plain values: the `Clone + Send + Sync + 'static` bounds
/// rule out borrowed keys and keys shared through non-thread-safe handles, so
/// a stored key can be copied and compared on any thread.
///
/// # Example
///
/// ```
/// use skipkv::CustomKey;
/// use std::borrow::Cow;
///
/// #[derive(Clone)]
/// struct Player {
///     id: String,
///     score: u64,
/// }
///
/// impl CustomKey for Player {
///     fn logical_name(&self) -> Cow<'_, str> {
///         Cow::Borrowed(&self.id)
///     }
/// }
/// ```
pub trait CustomKey: Clone + Send + Sync + 'static {
    /// The stable name this key is addressed by. Must not be empty.
    fn logical_name(&self) -> Cow<'_, str>;
}

/// Plain keys are their own logical name.
impl CustomKey for String {
    fn logical_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

/// How a store identifies its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// `String` keys in lexicographic order
    Plain,
    /// Application keys ordered by an application comparator
    Custom,
}

/// The key actually stored in the skip list.
#[derive(Debug, Clone)]
pub(crate) struct ExpiryKey<K> {
    key: K,
    /// `None` = never expires
    expires_at: Option<Instant>,
}

impl<K> ExpiryKey<K> {
    pub(crate) fn new(key: K, expires_at: Option<Instant>) -> Self {
        Self { key, expires_at }
    }

    /// Wraps a key with no expiry. Used for lookups, where only ordering matters.
    pub(crate) fn persistent(key: K) -> Self {
        Self::new(key, None)
    }

    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn into_key(self) -> K {
        self.key
    }

    #[inline]
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Time left before expiry, or `None` if the key never expires.
    pub(crate) fn ttl(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_duration_since(now))
    }
}

impl<K: CustomKey> ExpiryKey<K> {
    pub(crate) fn logical_name(&self) -> Cow<'_, str> {
        self.key.logical_name()
    }
}
