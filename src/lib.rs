//! # SkipKV - An Ordered In-Memory Key-Value Store
//!
//! SkipKV is an embedded, in-memory key-value store written in Rust. Entries
//! are kept in key order by a concurrent skip list, which gives point lookups,
//! ordered iteration and paginated scans with predicate filtering. Entries can
//! optionally expire after a time-to-live.
//!
//! Everything lives in process memory. Nothing is persisted: dropping a store
//! or exiting the process discards its data.
//!
//! ## Features
//!
//! - **Ordered**: A skip list keeps entries sorted by key
//! - **Plain or Custom Keys**: `String` keys, or your own key type with your own ordering
//! - **Logical Names**: Custom keys can be looked up by a stable name
//! - **TTL Support**: Keys can have expiry times with automatic cleanup
//! - **Queries**: Count and paginate over values matching predicates
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              SkipKV                                     │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │                          Store                                   │   │
//! │  │   save / get / delete / count / list / iter                      │   │
//! │  │  ┌─────────────────────────────┐   ┌──────────────────────────┐  │   │
//! │  │  │ SkipList<ExpiryKey<K>, V>   │   │ logical-name index       │  │   │
//! │  │  │ arena of nodes, RwLock      │   │ RwLock<HashMap>          │  │   │
//! │  │  └─────────────────────────────┘   └──────────────────────────┘  │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                                               │                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use skipkv::{CustomKey, DbOptions, Store};
//! use std::borrow::Cow;
//!
//! #[derive(Clone)]
//! struct Player {
//!     id: String,
//!     score: u64,
//! }
//!
//! impl CustomKey for Player {
//!     fn logical_name(&self) -> Cow<'_, str> {
//!         Cow::Borrowed(&self.id)
//!     }
//! }
//!
//! let store = Store::new_custom(|l: &Player, r: &Player| l.score > r.score, DbOptions::new())
//!     .unwrap();
//!
//! store.save(Player { id: "ann".into(), score: 12 }, "Ann").unwrap();
//! store.save(Player { id: "bo".into(), score: 40 }, "Bo").unwrap();
//!
//! // Highest score first
//! let top = store.list(1, 1, &[]).unwrap();
//! assert_eq!(top.items, vec!["Bo"]);
//! assert!(top.has_next);
//!
//! // Moving a key's score keeps a single entry per name
//! store.save(Player { id: "ann".into(), score: 99 }, "Ann").unwrap();
//! assert_eq!(store.len(), 2);
//! assert_eq!(store.get_by_name("ann"), Ok("Ann"));
//! ```
//!
//! ## Module Overview
//!
//! - [`skiplist`]: The concurrent skip list engine and its iterator
//! - [`storage`]: The store, key identity, options and the expiry sweeper
//! - [`error`]: Error types
//!
//! ## Design Highlights
//!
//! ### Arena-Backed Nodes
//!
//! Skip list nodes live in an arena and link to each other through
//! generational handles. A handle to a deleted node stops resolving instead
//! of dangling, which is what lets iterators run without holding the lock.
//!
//! ### Weakly Consistent Iteration
//!
//! Iterators take the list's read lock one step at a time. They may observe
//! entries inserted or removed while they run.
//!
//! ### Active Expiry
//!
//! Stores created with expiration enabled spawn a sweeper that removes
//! expired entries on a fixed interval. The sweeper stops when the store is
//! dropped.

pub mod error;
pub mod skiplist;
pub mod storage;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use skiplist::SkipList;
pub use storage::{
    CustomKey, DbOptions, KeyKind, Page, Query, SaveOptions, Store, StoreStats, SweepConfig,
};

/// Version of SkipKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
