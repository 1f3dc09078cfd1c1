//! Storage Module
//!
//! The database layer of SkipKV: an ordered store over the skip list engine,
//! with key identity, a logical-name index, TTL support and a background
//! expiry sweeper.
//!
//! ## Features
//!
//! - **Ordered**: Iteration and pagination follow key order
//! - **Plain or Custom Keys**: `String` keys, or application keys with their own ordering
//! - **Logical Names**: Custom keys can be addressed by a stable name
//! - **TTL Support**: Entries can carry a time-to-live
//! - **Active Expiry**: A background sweeper reclaims expired entries
//!
//! ## Example
//!
//! ```
//! use skipkv::storage::{DbOptions, SaveOptions, Store};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Store::new_plain(DbOptions::new().with_expired()).unwrap();
//!
//! store.save("name".to_string(), "Ariz").unwrap();
//! store
//!     .save_with("session".to_string(), "token123", SaveOptions::new().with_ttl(3600))
//!     .unwrap();
//!
//! assert_eq!(store.get(&"name".to_string()), Ok("Ariz"));
//! assert!(store.ttl(&"session".to_string()).unwrap().is_some());
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod expiry;
pub mod key;

// Re-export commonly used types
pub use config::{DbOptions, Query, SaveOptions};
pub use engine::{Page, Store, StoreIter, StoreStats};
pub use expiry::{ExpirySweeper, SweepConfig};
pub use key::{CustomKey, KeyKind};
