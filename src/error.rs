//! Error types shared by the skip list engine and the store.

use thiserror::Error;

/// Errors returned by [`SkipList`](crate::skiplist::SkipList) and
/// [`Store`](crate::storage::Store) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A custom key produced an empty logical name
    #[error("key is nil")]
    NilKey,

    /// No entry exists for the key or logical name
    #[error("not found value")]
    NotFound,

    /// The update path recorded during a walk is shorter than the list height.
    ///
    /// Seeing this means the engine's bookkeeping is broken.
    #[error("index of update path out of range: {len} slots for height {height}")]
    UpdatePathOutOfRange { len: usize, height: usize },

    /// `list` was called with a zero page or page size (pages are 1-indexed)
    #[error("invalid page {page} with page size {page_size}")]
    InvalidPage { page: u32, page_size: u32 },

    /// An expiring store needs a Tokio runtime to run its sweeper
    #[error("expiring stores must be created inside a Tokio runtime")]
    RuntimeUnavailable,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
