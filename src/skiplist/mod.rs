//! Skip List Engine
//!
//! A probabilistically balanced ordered map. Search, insert and delete cost
//! O(log n) on average; iteration walks the bottom level in key order.
//!
//! Nodes live in an arena and link to each other by generational handles, so
//! the structure never hands out pointers that could outlive a delete.
//!
//! ## Example
//!
//! ```
//! use skipkv::skiplist::SkipList;
//!
//! let list = SkipList::new(|l: &u32, r: &u32| l < r);
//! list.set(3, "c").unwrap();
//! list.set(1, "a").unwrap();
//! list.set(2, "b").unwrap();
//!
//! let values: Vec<&str> = list.iter().map(|(_, v)| v).collect();
//! assert_eq!(values, vec!["a", "b", "c"]);
//!
//! list.delete(&2).unwrap();
//! assert_eq!(list.len(), 2);
//! ```

pub mod iter;
pub mod list;
mod node;

pub use iter::Iter;
pub use list::{Less, SkipList};
pub use node::{MAX_LEVEL, PROBABILITY};
