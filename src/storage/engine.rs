//! Ordered Store with Expiry Support
//!
//! This module implements the database layer of SkipKV on top of the
//! [`SkipList`] engine: key identity, a logical-name index, TTLs, and
//! paginated queries over the ordered sequence.
//!
//! ## Design Decisions
//!
//! 1. **Key wrapping**: Every stored key is an `ExpiryKey`, the caller's key
//!    plus an optional expiry instant. It orders exactly like the caller's key.
//! 2. **Logical-name index**: Custom stores, and every store with expiration,
//!    keep a map from logical name to the key actually stored. It lets callers
//!    address entries by name, and lets a re-save that moved a key's ordering
//!    position drop the entry left behind at the old position.
//! 3. **Two locks**: Every write that touches the index takes the index lock
//!    first and holds it across the skip list update, so the two never
//!    disagree. Reads take one lock at a time.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │  ┌──────────────────────────┐   ┌────────────────────────┐  │
//! │  │ SkipList<ExpiryKey, V>   │   │ names: RwLock<HashMap> │  │
//! │  │ RwLock over whole list   │   │ logical name -> key    │  │
//! │  └──────────────────────────┘   └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ Weak
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```

use crate::error::{Error, Result};
use crate::skiplist::{self, Less, SkipList};
use crate::storage::config::{DbOptions, Query, SaveOptions};
use crate::storage::expiry::ExpirySweeper;
use crate::storage::key::{CustomKey, ExpiryKey, KeyKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One page of `list` results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<V> {
    /// Matching values on this page, in key order
    pub items: Vec<V>,
    /// Whether at least one more match exists past this page
    pub has_next: bool,
}

/// Statistics about store operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub keys: usize,
    pub saves: u64,
    pub gets: u64,
    pub deletes: u64,
    pub expired: u64,
}

#[derive(Debug, Default)]
struct Counters {
    saves: AtomicU64,
    gets: AtomicU64,
    deletes: AtomicU64,
    expired: AtomicU64,
}

/// State shared between a [`Store`] and its sweeper.
pub(crate) struct StoreInner<K, V> {
    kind: KeyKind,
    expired: bool,
    less: Arc<Less<K>>,
    data: SkipList<ExpiryKey<K>, V>,
    names: RwLock<Names<K>>,
    /// Plain stores turn a logical name straight back into a key.
    from_name: Option<fn(&str) -> K>,
    counters: Counters,
}

type Names<K> = HashMap<String, ExpiryKey<K>>;

impl<K: CustomKey, V: Clone> StoreInner<K, V> {
    /// Whether the logical-name index is maintained.
    fn indexed(&self) -> bool {
        self.kind == KeyKind::Custom || self.expired
    }

    fn read_names(&self) -> RwLockReadGuard<'_, Names<K>> {
        self.names.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_names(&self) -> RwLockWriteGuard<'_, Names<K>> {
        self.names.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether two keys occupy the same ordering position.
    fn same_position(&self, a: &ExpiryKey<K>, b: &ExpiryKey<K>) -> bool {
        let less = &*self.less;
        !less(a.key(), b.key()) && !less(b.key(), a.key())
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    /// The stored key registered under `name`.
    fn lookup(&self, name: &str) -> Result<ExpiryKey<K>> {
        self.read_names().get(name).cloned().ok_or(Error::NotFound)
    }

    /// Turns a caller's key into the key to probe the skip list with.
    ///
    /// With expiration the stored key carries an expiry instant the caller
    /// does not know, so the lookup goes through the logical name.
    fn resolve(&self, key: &K) -> Result<ExpiryKey<K>> {
        if self.expired {
            self.lookup(&key.logical_name())
        } else {
            Ok(ExpiryKey::persistent(key.clone()))
        }
    }

    fn resolve_name(&self, name: &str) -> Result<ExpiryKey<K>> {
        if self.indexed() {
            return self.lookup(name);
        }
        self.from_name
            .map(|from_name| ExpiryKey::persistent(from_name(name)))
            .ok_or(Error::NotFound)
    }

    /// Writes `stored` and points its logical name at it.
    ///
    /// The whole update runs under the index lock, so the index always names
    /// the key actually in the list. If the name was registered to a key at a
    /// different ordering position, that older entry is deleted. If the write
    /// replaced an entry with another name, that name is dropped.
    fn put(&self, stored: ExpiryKey<K>, value: V) -> Result<()> {
        let name = stored.logical_name().into_owned();
        let mut names = self.write_names();

        if let Some(displaced) = self.data.insert(stored.clone(), value)? {
            self.forget(&mut names, &displaced);
        }

        if let Some(old) = names.get(&name) {
            if !self.same_position(old, &stored) {
                let removed = self
                    .data
                    .delete_if(old, |current, _| current.logical_name() == name.as_str());
                match removed {
                    Ok(()) => trace!(name = %name, "removed entry at previous position"),
                    Err(err) => trace!(name = %name, error = %err, "previous entry already gone"),
                }
            }
        }
        names.insert(name, stored);
        Ok(())
    }

    /// Drops the logical name of a removed key if it still points there.
    fn forget(&self, names: &mut Names<K>, removed: &ExpiryKey<K>) {
        let name = removed.logical_name();
        if names
            .get(&*name)
            .is_some_and(|current| self.same_position(current, removed))
        {
            names.remove(&*name);
        }
    }

    /// Deletes the entry at `probe` if `predicate` accepts it, and drops the
    /// name of the key that was actually removed. The caller holds the index lock.
    fn remove_indexed<P>(
        &self,
        names: &mut Names<K>,
        probe: &ExpiryKey<K>,
        predicate: P,
    ) -> Result<()>
    where
        P: FnOnce(&ExpiryKey<K>) -> bool,
    {
        let mut removed = None;
        self.data.delete_if(probe, |current, _| {
            let accepted = predicate(current);
            if accepted {
                removed = Some(current.clone());
            }
            accepted
        })?;
        if let Some(removed) = removed {
            self.forget(names, &removed);
        }
        Ok(())
    }

    fn delete_key(&self, key: &K) -> Result<()> {
        if self.indexed() {
            let mut names = self.write_names();
            // Re-resolve under the lock so a racing save cannot slip in between
            let probe = if self.expired {
                names
                    .get(&*key.logical_name())
                    .cloned()
                    .ok_or(Error::NotFound)?
            } else {
                ExpiryKey::persistent(key.clone())
            };
            self.remove_indexed(&mut names, &probe, |_| true)?;
        } else {
            self.data.delete(&ExpiryKey::persistent(key.clone()))?;
        }
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn delete_name(&self, name: &str) -> Result<()> {
        if self.indexed() {
            let mut names = self.write_names();
            let probe = names.get(name).cloned().ok_or(Error::NotFound)?;
            self.remove_indexed(&mut names, &probe, |_| true)?;
        } else {
            self.data.delete(&self.resolve_name(name)?)?;
        }
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Scans every entry and deletes the ones whose expiry has passed.
    ///
    /// Returns the number of entries removed.
    pub(crate) fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        for (stored, _) in self.data.iter() {
            if !stored.is_expired(now) {
                continue;
            }
            // Re-check under the locks: a concurrent save may have refreshed it
            let result = if self.indexed() {
                let mut names = self.write_names();
                self.remove_indexed(&mut names, &stored, |current| current.is_expired(now))
            } else {
                self.data.delete_if(&stored, |current, _| current.is_expired(now))
            };
            match result {
                Ok(()) => removed += 1,
                Err(err) => trace!(error = %err, "expired entry changed before removal"),
            }
        }

        self.counters
            .expired
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }
}

/// An ordered, in-memory key-value store.
///
/// Keys are kept in a skip list, so iteration and [`list`](Store::list) see
/// entries in key order. All operations are thread-safe; share a store
/// between threads with an `Arc`.
///
/// Stores created with [`DbOptions::with_expired`] own a background sweeper
/// task, which stops when the store is dropped.
///
/// # Example
///
/// ```
/// use skipkv::{DbOptions, Store};
///
/// let store = Store::new_plain(DbOptions::new()).unwrap();
/// store.save("b".to_string(), 2).unwrap();
/// store.save("a".to_string(), 1).unwrap();
///
/// assert_eq!(store.get(&"a".to_string()), Ok(1));
///
/// let page = store.list(1, 10, &[]).unwrap();
/// assert_eq!(page.items, vec![1, 2]);
/// assert!(!page.has_next);
/// ```
pub struct Store<K, V> {
    pub(crate) inner: Arc<StoreInner<K, V>>,
    /// Stops the sweeper when the store is dropped
    sweeper: Option<ExpirySweeper>,
}

impl<K, V> std::fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("kind", &self.inner.kind)
            .field("expired", &self.inner.expired)
            .field("data", &self.inner.data)
            .field("sweeper", &self.sweeper.is_some())
            .finish()
    }
}

fn plain_key(name: &str) -> String {
    name.to_owned()
}

impl<V: Clone + Send + Sync + 'static> Store<String, V> {
    /// Creates a store keyed by strings in lexicographic order.
    ///
    /// Fails with [`Error::RuntimeUnavailable`] if expiration is enabled and
    /// no Tokio runtime is running.
    pub fn new_plain(options: DbOptions) -> Result<Self> {
        Self::build(
            KeyKind::Plain,
            Arc::new(|l: &String, r: &String| l < r),
            Some(plain_key as fn(&str) -> String),
            options,
        )
    }
}

impl<K: CustomKey, V: Clone + Send + Sync + 'static> Store<K, V> {
    /// Creates a store keyed by `K`, ordered by `less`.
    ///
    /// Entries can also be addressed by the keys' logical names.
    pub fn new_custom<F>(less: F, options: DbOptions) -> Result<Self>
    where
        F: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        Self::build(KeyKind::Custom, Arc::new(less), None, options)
    }

    fn build(
        kind: KeyKind,
        less: Arc<Less<K>>,
        from_name: Option<fn(&str) -> K>,
        options: DbOptions,
    ) -> Result<Self> {
        let data_less = Arc::clone(&less);
        let data = SkipList::new(move |l: &ExpiryKey<K>, r: &ExpiryKey<K>| {
            data_less(l.key(), r.key())
        });

        let inner = Arc::new(StoreInner {
            kind,
            expired: options.expired(),
            less,
            data,
            names: RwLock::new(HashMap::new()),
            from_name,
            counters: Counters::default(),
        });

        let sweeper = if options.expired() {
            let runtime =
                tokio::runtime::Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;
            Some(ExpirySweeper::start(
                &runtime,
                Arc::downgrade(&inner),
                options.sweep().clone(),
            ))
        } else {
            None
        };

        debug!(kind = ?kind, expired = options.expired(), "Store created");
        Ok(Self { inner, sweeper })
    }

    pub fn kind(&self) -> KeyKind {
        self.inner.kind
    }

    /// Whether entries can carry a TTL.
    pub fn expired(&self) -> bool {
        self.inner.expired
    }

    /// Saves `value` under `key` with no TTL.
    pub fn save(&self, key: K, value: V) -> Result<()> {
        self.save_with(key, value, SaveOptions::default())
    }

    /// Saves `value` under `key`.
    ///
    /// If an entry with an equal key exists, its key and value are replaced.
    /// On custom stores, an entry registered under the same logical name at a
    /// different ordering position is removed.
    ///
    /// A TTL only takes effect on stores created with expiration enabled.
    pub fn save_with(&self, key: K, value: V, options: SaveOptions) -> Result<()> {
        let inner = &*self.inner;

        if inner.kind == KeyKind::Custom && key.logical_name().is_empty() {
            return Err(Error::NilKey);
        }

        let expires_at = match options.ttl() {
            // Too far out to represent means never
            Some(ttl) if inner.expired => Instant::now().checked_add(ttl),
            Some(_) => {
                trace!("TTL ignored on a store without expiration");
                None
            }
            None => None,
        };

        let stored = ExpiryKey::new(key, expires_at);
        if inner.indexed() {
            inner.put(stored, value)?;
        } else {
            inner.data.set(stored, value)?;
        }

        inner.counters.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &K) -> Result<V> {
        self.inner.counters.gets.fetch_add(1, Ordering::Relaxed);
        let stored = self.inner.resolve(key)?;
        self.inner.data.get(&stored)
    }

    /// Returns the value stored under the key whose logical name is `name`.
    pub fn get_by_name(&self, name: &str) -> Result<V> {
        self.inner.counters.gets.fetch_add(1, Ordering::Relaxed);
        let stored = self.inner.resolve_name(name)?;
        self.inner.data.get(&stored)
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .resolve(key)
            .and_then(|stored| self.inner.data.get(&stored))
            .is_ok()
    }

    /// Time left before the entry under `key` expires, or `None` if it never does.
    pub fn ttl(&self, key: &K) -> Result<Option<Duration>> {
        let probe = self.inner.resolve(key)?;
        let (stored, _) = self.inner.data.get_entry(&probe)?;
        Ok(stored.ttl(Instant::now()))
    }

    /// Deletes the entry under `key`.
    ///
    /// Returns [`Error::NotFound`] if there is none, so a second delete of the
    /// same key fails.
    pub fn delete(&self, key: &K) -> Result<()> {
        self.inner.delete_key(key)
    }

    /// Deletes the entry under the key whose logical name is `name`.
    pub fn delete_by_name(&self, name: &str) -> Result<()> {
        self.inner.delete_name(name)
    }

    /// Number of entries, including expired ones the sweeper has not reached yet.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts the values accepted by every query.
    ///
    /// With no queries this is [`len`](Self::len), in O(1). Otherwise it is a
    /// full scan.
    pub fn count(&self, queries: &[&Query<V>]) -> usize {
        if queries.is_empty() {
            return self.inner.data.len();
        }
        self.inner
            .data
            .iter()
            .filter(|(_, value)| matches_all(value, queries))
            .count()
    }

    /// Returns page `page` (1-indexed) of `page_size` values accepted by every
    /// query, in key order.
    ///
    /// The scan stops at the first match past the page, which sets
    /// [`Page::has_next`]. When few entries match, this walks the whole store.
    pub fn list(&self, page: u32, page_size: u32, queries: &[&Query<V>]) -> Result<Page<V>> {
        if page == 0 || page_size == 0 {
            return Err(Error::InvalidPage { page, page_size });
        }

        let offset = (page as usize - 1).saturating_mul(page_size as usize);
        let end = offset.saturating_add(page_size as usize);

        let mut items = Vec::with_capacity((page_size as usize).min(self.len()));
        let mut count = 0;
        let mut has_next = false;

        for (_, value) in self.inner.data.iter() {
            if !matches_all(&value, queries) {
                continue;
            }
            if count >= end {
                has_next = true;
                break;
            }
            if count >= offset {
                items.push(value);
            }
            count += 1;
        }

        Ok(Page { items, has_next })
    }

    /// Iterates over `(key, value)` pairs in key order.
    ///
    /// Like the underlying skip list iterator, this does not hold a lock
    /// between steps and may observe concurrent writes.
    pub fn iter(&self) -> StoreIter<'_, K, V> {
        StoreIter {
            inner: self.inner.data.iter(),
        }
    }

    /// Runs one expiry pass now and returns the number of entries removed.
    ///
    /// The background sweeper calls this on every tick.
    pub fn remove_expired(&self) -> usize {
        self.inner.remove_expired()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let counters = &self.inner.counters;
        StoreStats {
            keys: self.len(),
            saves: counters.saves.load(Ordering::Relaxed),
            gets: counters.gets.load(Ordering::Relaxed),
            deletes: counters.deletes.load(Ordering::Relaxed),
            expired: counters.expired.load(Ordering::Relaxed),
        }
    }
}

fn matches_all<V>(value: &V, queries: &[&Query<V>]) -> bool {
    queries.iter().all(|query| query(value))
}

/// Iterator returned by [`Store::iter`].
#[derive(Debug)]
pub struct StoreIter<'a, K, V> {
    inner: skiplist::Iter<'a, ExpiryKey<K>, V>,
}

impl<K, V> StoreIter<'_, K, V> {
    /// Ends iteration early. This only consumes the iterator: it holds no
    /// lock between steps, so dropping it is just as good.
    pub fn close(self) {}
}

impl<K: Clone, V: Clone> Iterator for StoreIter<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(stored, value)| (stored.into_key(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, PartialEq)]
    struct Player {
        id: String,
        score: u64,
    }

    impl Player {
        fn new(id: &str, score: u64) -> Self {
            Self {
                id: id.to_string(),
                score,
            }
        }
    }

    impl CustomKey for Player {
        fn logical_name(&self) -> Cow<'_, str> {
            Cow::Borrowed(&self.id)
        }
    }

    fn players(options: DbOptions) -> Store<Player, String> {
        Store::new_custom(|l: &Player, r: &Player| l.score < r.score, options).unwrap()
    }

    /// Checks that the name index and the skip list describe the same entries.
    fn assert_index_matches<K, V>(store: &Store<K, V>)
    where
        K: CustomKey + PartialEq + std::fmt::Debug,
        V: Clone + Send + Sync + 'static,
    {
        let keys: Vec<K> = store.iter().map(|(k, _)| k).collect();
        let names = store.inner.read_names();
        assert_eq!(names.len(), keys.len(), "index and list disagree on size");
        for key in keys {
            let registered = names.get(&*key.logical_name());
            assert_eq!(registered.map(|stored| stored.key()), Some(&key));
        }
    }

    fn numbers(range: std::ops::RangeInclusive<i32>) -> Store<String, i32> {
        let store = Store::new_plain(DbOptions::new()).unwrap();
        for i in range {
            // Zero-padded so lexicographic order matches numeric order
            store.save(format!("{:04}", i), i).unwrap();
        }
        store
    }

    #[test]
    fn test_save_and_get() {
        let store = Store::new_plain(DbOptions::new()).unwrap();

        assert_ok!(store.save("name".to_string(), "Ariz"));
        assert_eq!(store.get(&"name".to_string()), Ok("Ariz"));
        assert_eq!(store.get_by_name("name"), Ok("Ariz"));
        assert_eq!(store.get(&"missing".to_string()), Err(Error::NotFound));
        assert!(store.contains(&"name".to_string()));
        assert!(!store.contains(&"missing".to_string()));
        assert_eq!(store.kind(), KeyKind::Plain);
        assert!(!store.expired());
    }

    #[test]
    fn test_save_replaces_value() {
        let store = Store::new_plain(DbOptions::new()).unwrap();

        store.save("k".to_string(), 1).unwrap();
        store.save("k".to_string(), 2).unwrap();

        assert_eq!(store.get(&"k".to_string()), Ok(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let store = numbers(1..=3);

        assert_ok!(store.delete(&"0002".to_string()));
        assert_eq!(store.delete(&"0002".to_string()), Err(Error::NotFound));
        assert_eq!(store.get(&"0002".to_string()), Err(Error::NotFound));
        assert_eq!(store.len(), 2);

        assert_ok!(store.delete_by_name("0003"));
        assert_err!(store.delete_by_name("0003"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_iter_in_key_order() {
        let store = Store::new_plain(DbOptions::new()).unwrap();
        for key in ["pear", "apple", "fig", "banana"] {
            store.save(key.to_string(), key.len()).unwrap();
        }

        let mut iter = store.iter();
        let keys: Vec<String> = iter.by_ref().map(|(k, _)| k).collect();
        iter.close();

        assert_eq!(keys, vec!["apple", "banana", "fig", "pear"]);
        assert_eq!(store.len(), keys.len());
    }

    #[test]
    fn test_count() {
        let store = numbers(1..=10);
        let even = |v: &i32| v % 2 == 0;
        let big = |v: &i32| *v > 5;

        assert_eq!(store.count(&[]), 10);
        assert_eq!(store.count(&[&even]), 5);
        assert_eq!(store.count(&[&even, &big]), 3);
    }

    #[test]
    fn test_list_single_page() {
        let store = numbers(1..=10);

        let page = store.list(1, 10, &[]).unwrap();
        assert_eq!(page.items, (1..=10).collect::<Vec<_>>());
        assert!(!page.has_next);
    }

    #[test]
    fn test_list_with_query() {
        let store = numbers(1..=4);
        let small = |v: &i32| *v <= 2;

        let page = store.list(1, 1, &[&small]).unwrap();
        assert_eq!(page.items, vec![1]);
        assert!(page.has_next);

        let page = store.list(2, 1, &[&small]).unwrap();
        assert_eq!(page.items, vec![2]);
        assert!(!page.has_next);
    }

    #[test]
    fn test_list_pages() {
        let store = numbers(1..=25);

        let second = store.list(2, 10, &[]).unwrap();
        assert_eq!(second.items, (11..=20).collect::<Vec<_>>());
        assert!(second.has_next);

        let third = store.list(3, 10, &[]).unwrap();
        assert_eq!(third.items, (21..=25).collect::<Vec<_>>());
        assert!(!third.has_next);

        let past_end = store.list(4, 10, &[]).unwrap();
        assert!(past_end.items.is_empty());
        assert!(!past_end.has_next);
    }

    #[test]
    fn test_list_rejects_zero_page() {
        let store = numbers(1..=3);
        assert_eq!(
            store.list(0, 10, &[]),
            Err(Error::InvalidPage {
                page: 0,
                page_size: 10
            })
        );
        assert_err!(store.list(1, 0, &[]));
    }

    #[test]
    fn test_custom_key_by_name() {
        let store = players(DbOptions::new());

        store
            .save(Player::new("alice", 30), "Alice".to_string())
            .unwrap();
        store.save(Player::new("bob", 10), "Bob".to_string()).unwrap();

        assert_eq!(store.get(&Player::new("alice", 30)), Ok("Alice".to_string()));
        assert_eq!(store.get_by_name("bob"), Ok("Bob".to_string()));
        assert_eq!(store.get_by_name("carol"), Err(Error::NotFound));

        // Ordered by score, not by name
        let names: Vec<String> = store.iter().map(|(k, _)| k.id).collect();
        assert_eq!(names, vec!["bob", "alice"]);
    }

    #[test]
    fn test_custom_key_resave_moves_entry() {
        let store = players(DbOptions::new());

        store
            .save(Player::new("alice", 30), "v1".to_string())
            .unwrap();
        store.save(Player::new("bob", 20), "bob".to_string()).unwrap();
        store
            .save(Player::new("alice", 10), "v2".to_string())
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&Player::new("alice", 10)), Ok("v2".to_string()));
        assert_eq!(store.get_by_name("alice"), Ok("v2".to_string()));
        assert_eq!(store.get(&Player::new("alice", 30)), Err(Error::NotFound));

        let keys: Vec<Player> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Player::new("alice", 10), Player::new("bob", 20)]);
    }

    #[test]
    fn test_custom_key_delete_by_name() {
        let store = players(DbOptions::new());
        store.save(Player::new("alice", 30), "a".to_string()).unwrap();

        assert_ok!(store.delete_by_name("alice"));
        assert!(store.is_empty());
        assert_eq!(store.get_by_name("alice"), Err(Error::NotFound));
        assert_eq!(store.delete(&Player::new("alice", 30)), Err(Error::NotFound));
    }

    #[test]
    fn test_custom_key_rejects_empty_name() {
        let store = players(DbOptions::new());
        assert_eq!(
            store.save(Player::new("", 1), "nobody".to_string()),
            Err(Error::NilKey)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_ttl_ignored_without_expiration() {
        let store = Store::new_plain(DbOptions::new()).unwrap();
        store
            .save_with("k".to_string(), 1, SaveOptions::new().with_ttl(1))
            .unwrap();

        assert_eq!(store.ttl(&"k".to_string()), Ok(None));
        assert_eq!(store.remove_expired(), 0);
        assert_eq!(store.get(&"k".to_string()), Ok(1));
    }

    #[tokio::test]
    async fn test_custom_key_with_expiration() {
        let store = players(DbOptions::new().with_expired());
        let alice = Player::new("alice", 30);

        store
            .save_with(alice.clone(), "a".to_string(), SaveOptions::new().with_ttl(60))
            .unwrap();

        // Found through the logical name, whatever the score in the probe
        assert_eq!(store.get(&Player::new("alice", 0)), Ok("a".to_string()));
        let ttl = store.ttl(&alice).unwrap().unwrap();
        assert!(ttl > Duration::from_secs(55) && ttl <= Duration::from_secs(60));

        store.save(Player::new("alice", 5), "b".to_string()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.ttl(&alice), Ok(None));

        assert_ok!(store.delete(&alice));
        assert!(store.is_empty());
        assert_eq!(store.get_by_name("alice"), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let store = Store::new_plain(
            DbOptions::new()
                .with_expired()
                .with_sweep_interval(Duration::from_secs(3600)),
        )
        .unwrap();

        let short = SaveOptions::new().with_ttl_duration(Duration::from_millis(20));
        store.save_with("a".to_string(), 1, short).unwrap();
        store.save_with("b".to_string(), 2, short).unwrap();
        store.save("c".to_string(), 3).unwrap();

        assert_eq!(store.remove_expired(), 0);
        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(store.remove_expired(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_name("a"), Err(Error::NotFound));
        assert_eq!(store.get(&"c".to_string()), Ok(3));
        assert_eq!(store.stats().expired, 2);
    }

    #[test]
    fn test_stats() {
        let store = numbers(1..=3);
        let _ = store.get(&"0001".to_string());
        let _ = store.get_by_name("0009");
        store.delete(&"0002".to_string()).unwrap();

        let stats = store.stats();
        assert_eq!(stats.keys, 2);
        assert_eq!(stats.saves, 3);
        assert_eq!(stats.gets, 2);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_custom_key_displaced_by_other_name() {
        let store = players(DbOptions::new());

        store.save(Player::new("alice", 10), "a".to_string()).unwrap();
        // Same score, so bob takes alice's position
        store.save(Player::new("bob", 10), "b".to_string()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_name("alice"), Err(Error::NotFound));
        assert_index_matches(&store);

        store.save(Player::new("alice", 30), "a2".to_string()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_name("bob"), Ok("b".to_string()));
        assert_index_matches(&store);
    }

    #[test]
    fn test_save_holds_index_lock_across_write() {
        let store = players(DbOptions::new());
        store.save(Player::new("alice", 30), "v1".to_string()).unwrap();

        std::thread::scope(|s| {
            let names = store.inner.write_names();
            let writer = s.spawn(|| store.save(Player::new("alice", 10), "v2".to_string()));

            std::thread::sleep(Duration::from_millis(50));
            // The list is untouched while the index is locked
            let moved = ExpiryKey::persistent(Player::new("alice", 10));
            assert_eq!(store.inner.data.get(&moved), Err(Error::NotFound));
            assert_eq!(store.len(), 1);

            drop(names);
            assert_ok!(writer.join().unwrap());
        });

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_name("alice"), Ok("v2".to_string()));
        assert_index_matches(&store);
    }

    #[tokio::test]
    async fn test_delete_holds_index_lock_across_write() {
        let store = Store::new_plain(
            DbOptions::new()
                .with_expired()
                .with_sweep_interval(Duration::from_secs(3600)),
        )
        .unwrap();
        store.save("k".to_string(), 1).unwrap();

        std::thread::scope(|s| {
            let names = store.inner.write_names();
            let deleter = s.spawn(|| store.delete(&"k".to_string()));

            std::thread::sleep(Duration::from_millis(50));
            assert_eq!(store.len(), 1);

            drop(names);
            assert_ok!(deleter.join().unwrap());
        });

        // A save right after the delete stays reachable through the index
        store.save("k".to_string(), 2).unwrap();
        assert_eq!(store.get(&"k".to_string()), Ok(2));
        assert_eq!(store.ttl(&"k".to_string()), Ok(None));
        assert_index_matches(&store);
    }

    #[test]
    fn test_concurrent_saves_same_key() {
        let store = Arc::new(players(DbOptions::new()));

        std::thread::scope(|s| {
            for t in 0..8u64 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for i in 0..100 {
                        // Same logical name, scores that collide across threads
                        store
                            .save(Player::new("shared", (t * 7 + i) % 10), format!("{t}-{i}"))
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(store.len(), 1);
        assert_eq!(store.iter().count(), 1);
        assert!(store.get_by_name("shared").is_ok());
        assert_index_matches(&store);
    }

    #[test]
    fn test_concurrent_saves_and_deletes_same_name() {
        let store = Arc::new(players(DbOptions::new()));

        std::thread::scope(|s| {
            for t in 0..8u64 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for i in 0..200u64 {
                        if i % 5 == 4 {
                            let _ = store.delete_by_name("shared");
                        } else {
                            store
                                .save(Player::new("shared", (t + i) % 3), format!("{t}-{i}"))
                                .unwrap();
                        }
                    }
                });
            }
        });

        assert!(store.len() <= 1);
        assert_index_matches(&store);

        store.save(Player::new("shared", 7), "last".to_string()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_name("shared"), Ok("last".to_string()));
        assert_index_matches(&store);
    }

    #[tokio::test]
    async fn test_concurrent_resave_and_delete_with_expiration() {
        let store = Arc::new(
            Store::new_plain(
                DbOptions::new()
                    .with_expired()
                    .with_sweep_interval(Duration::from_secs(3600)),
            )
            .unwrap(),
        );
        let short = SaveOptions::new().with_ttl_duration(Duration::from_millis(2));

        std::thread::scope(|s| {
            for t in 0..4 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for i in 0..300 {
                        let key = format!("k{}", i % 4);
                        match (t + i) % 4 {
                            0 => {
                                let _ = store.delete(&key);
                            }
                            1 => {
                                store.save_with(key, i, short).unwrap();
                            }
                            _ => {
                                store.save(key, i).unwrap();
                            }
                        }
                        store.remove_expired();
                    }
                });
            }
        });

        assert_index_matches(&store);
        for (key, value) in store.iter() {
            assert_eq!(store.get(&key), Ok(value));
        }
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(Store::new_plain(DbOptions::new()).unwrap());

        std::thread::scope(|s| {
            for t in 0..4 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for i in 0..100 {
                        let key = format!("{t}:{i:03}");
                        store.save(key.clone(), i).unwrap();
                        assert_eq!(store.get(&key), Ok(i));
                    }
                });
            }
        });

        assert_eq!(store.len(), 400);
        assert_eq!(store.count(&[&|v: &i32| *v < 50]), 200);
    }
}
