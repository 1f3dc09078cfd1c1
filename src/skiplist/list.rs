//! The skip list engine.
//!
//! ## Layout
//!
//! ```text
//! Level 2:  HEAD ────────────────────► 30 ─────────────────► NIL
//! Level 1:  HEAD ──────────► 20 ─────► 30 ──────────► 50 ──► NIL
//! Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 30 ──► 40 ──► 50 ──► NIL
//!                    ◄──────◄──────◄──────◄──────◄──────◄        (backward)
//! ```
//!
//! Every level is a strictly increasing chain under the injected `less`
//! comparator, and every level is a subsequence of the one below it.
//!
//! ## Concurrency
//!
//! One `RwLock` guards the whole structure. `get`, `len` and iterator advances
//! take the shared mode; `set` and `delete` take the exclusive mode, so they
//! are linearizable with respect to each other.

use crate::error::{Error, Result};
use crate::skiplist::iter::Iter;
use crate::skiplist::node::{Arena, Node, NodeId, MAX_LEVEL, PROBABILITY};
use rand::Rng;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{trace, warn};

/// Strict ordering predicate: returns `true` when the left key sorts before the right one.
pub type Less<K> = dyn Fn(&K, &K) -> bool + Send + Sync;

/// A place in the structure a walk can stand on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Position {
    Head,
    Node(NodeId),
}

/// Everything guarded by the list lock.
#[derive(Debug)]
pub(super) struct Inner<K, V> {
    /// Forward links of the sentinel head. Always `level() + 1` entries.
    pub(super) head: Vec<Option<NodeId>>,
    pub(super) arena: Arena<K, V>,
    pub(super) len: usize,
}

impl<K, V> Inner<K, V> {
    fn new() -> Self {
        Self {
            head: vec![None],
            arena: Arena::default(),
            len: 0,
        }
    }

    /// Highest level currently in use.
    pub(super) fn level(&self) -> usize {
        self.head.len() - 1
    }

    fn max_effective_level(&self) -> usize {
        MAX_LEVEL.max(self.level())
    }

    /// Draws a level by repeated coin flips.
    fn random_level(&self) -> usize {
        let mut rng = rand::rng();
        let cap = self.max_effective_level();
        let mut level = 0;
        while level < cap && rng.random_bool(PROBABILITY) {
            level += 1;
        }
        level
    }

    pub(super) fn next(&self, at: Position, level: usize) -> Option<NodeId> {
        match at {
            Position::Head => self.head.get(level).copied().flatten(),
            Position::Node(id) => self.arena[id].forward.get(level).copied().flatten(),
        }
    }

    fn link(&mut self, at: Position, level: usize, to: Option<NodeId>) {
        match at {
            Position::Head => self.head[level] = to,
            Position::Node(id) => self.arena[id].forward[level] = to,
        }
    }

    /// Descends from the head, moving forward while the next key sorts before
    /// `key`. `record` sees the last position visited on each level.
    fn descend(
        &self,
        key: &K,
        less: &Less<K>,
        mut record: impl FnMut(usize, Position),
    ) -> Position {
        let mut current = Position::Head;
        for level in (0..=self.level()).rev() {
            while let Some(next) = self.next(current, level) {
                if !less(&self.arena[next].key, key) {
                    break;
                }
                current = Position::Node(next);
            }
            record(level, current);
        }
        current
    }

    /// First node whose key does not sort before `key`.
    pub(super) fn seek(&self, key: &K, less: &Less<K>) -> Option<NodeId> {
        let predecessor = self.descend(key, less, |_, _| {});
        self.next(predecessor, 0)
    }

    /// Like [`seek`](Self::seek), recording the per-level predecessors into `update`.
    fn walk(&self, key: &K, less: &Less<K>, update: &mut [Position]) -> Result<Option<NodeId>> {
        let height = self.level();
        if update.len() <= height {
            return Err(Error::UpdatePathOutOfRange {
                len: update.len(),
                height,
            });
        }
        let predecessor = self.descend(key, less, |level, at| update[level] = at);
        Ok(self.next(predecessor, 0))
    }

    /// Keeps `candidate` only if its key is equal to `key` under the comparator.
    ///
    /// Callers pass the result of a walk, so the candidate never sorts before `key`.
    pub(super) fn matching(
        &self,
        candidate: Option<NodeId>,
        key: &K,
        less: &Less<K>,
    ) -> Option<NodeId> {
        candidate.filter(|&id| !less(key, &self.arena[id].key))
    }

    /// First node whose key sorts strictly after `key`.
    pub(super) fn seek_after(&self, key: &K, less: &Less<K>) -> Option<NodeId> {
        let found = self.seek(key, less);
        match self.matching(found, key, less) {
            Some(id) => self.arena[id].next(),
            None => found,
        }
    }
}

/// A concurrent skip list ordered by an injected comparator.
///
/// # Example
///
/// ```
/// use skipkv::skiplist::SkipList;
///
/// let list = SkipList::new(|l: &String, r: &String| l < r);
/// list.set("b".to_string(), 2).unwrap();
/// list.set("a".to_string(), 1).unwrap();
///
/// assert_eq!(list.get(&"a".to_string()), Ok(1));
/// let keys: Vec<String> = list.iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, vec!["a", "b"]);
/// ```
pub struct SkipList<K, V> {
    inner: RwLock<Inner<K, V>>,
    less: Box<Less<K>>,
}

impl<K, V> std::fmt::Debug for SkipList<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("SkipList")
            .field("len", &inner.len)
            .field("level", &inner.level())
            .field("nodes", &inner.arena.len())
            .finish()
    }
}

impl<K, V> SkipList<K, V> {
    /// Creates an empty list ordered by `less`.
    pub fn new<F>(less: F) -> Self
    where
        F: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: RwLock::new(Inner::new()),
            less: Box::new(less),
        }
    }

    pub(super) fn read(&self) -> RwLockReadGuard<'_, Inner<K, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<K, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn less(&self) -> &Less<K> {
        &*self.less
    }

    /// Number of entries. O(1).
    pub fn len(&self) -> usize {
        self.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest level currently in use.
    pub fn level(&self) -> usize {
        self.read().level()
    }

    /// Inserts `key` with `value`.
    ///
    /// If an equal key is already present, its key and value are replaced in
    /// place and the structure is left untouched.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        self.insert(key, value).map(|_| ())
    }

    /// Like [`set`](Self::set), but hands back the key an in-place
    /// replacement displaced.
    pub fn insert(&self, key: K, value: V) -> Result<Option<K>> {
        let less = self.less();
        let mut guard = self.write();
        let inner = &mut *guard;

        let mut update = vec![Position::Head; inner.level() + 1];
        let found = inner.walk(&key, less, &mut update)?;

        if let Some(id) = inner.matching(found, &key, less) {
            let node = &mut inner.arena[id];
            let displaced = std::mem::replace(&mut node.key, key);
            node.value = value;
            trace!("replaced existing entry in place");
            return Ok(Some(displaced));
        }

        let level = inner.random_level();
        while inner.level() < level {
            inner.head.push(None);
            update.push(Position::Head);
        }

        let forward: Vec<Option<NodeId>> = (0..=level).map(|l| inner.next(update[l], l)).collect();
        let backward = match update[0] {
            Position::Node(id) => Some(id),
            Position::Head => None,
        };
        let successor = forward[0];

        let id = inner.arena.insert(Node {
            key,
            value,
            forward,
            backward,
        });
        for (l, &at) in update.iter().enumerate().take(level + 1) {
            inner.link(at, l, Some(id));
        }
        if let Some(next) = successor {
            inner.arena[next].backward = Some(id);
        }

        inner.len += 1;
        trace!(level, len = inner.len, "inserted node");
        Ok(None)
    }

    /// Removes the entry equal to `key`.
    ///
    /// Returns [`Error::NotFound`] if there is no such entry.
    pub fn delete(&self, key: &K) -> Result<()> {
        self.delete_if(key, |_, _| true)
    }

    /// Removes the entry equal to `key` if `predicate` accepts it.
    ///
    /// The predicate runs under the exclusive lock, so it sees the entry
    /// exactly as it is removed. A rejected entry reports [`Error::NotFound`].
    ///
    /// Existence is checked first under the shared lock and checked again
    /// under the exclusive lock. The first check keeps deletes of absent keys
    /// off the writer path; the second covers writers that ran in between.
    pub fn delete_if<P>(&self, key: &K, predicate: P) -> Result<()>
    where
        P: FnOnce(&K, &V) -> bool,
    {
        let less = self.less();

        {
            let inner = self.read();
            if inner.matching(inner.seek(key, less), key, less).is_none() {
                return Err(Error::NotFound);
            }
        }

        let mut guard = self.write();
        let inner = &mut *guard;

        let mut update = vec![Position::Head; inner.level() + 1];
        let found = match inner.walk(key, less, &mut update) {
            Ok(found) => found,
            Err(err) => {
                // The optimistic check saw the entry; losing it here counts as deleted.
                warn!(error = %err, "delete re-validation failed, treating entry as gone");
                return Ok(());
            }
        };
        let Some(id) = inner.matching(found, key, less) else {
            return Err(Error::NotFound);
        };

        let node = &inner.arena[id];
        if !predicate(&node.key, &node.value) {
            return Err(Error::NotFound);
        }

        for level in 0..=inner.level() {
            if inner.next(update[level], level) != Some(id) {
                break;
            }
            let next = inner.arena[id].forward[level];
            inner.link(update[level], level, next);
        }

        if let Some(node) = inner.arena.remove(id) {
            if let Some(next) = node.next() {
                inner.arena[next].backward = node.backward;
            }
        }
        inner.len -= 1;

        while inner.level() > 0 && inner.head[inner.level()].is_none() {
            inner.head.pop();
        }

        trace!(len = inner.len, level = inner.level(), "removed node");
        Ok(())
    }

    /// Returns a forward cursor over the entries in ascending order.
    ///
    /// The cursor does not hold the lock between steps: entries inserted or
    /// removed while it is live may or may not be observed.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }
}

impl<K, V: Clone> SkipList<K, V> {
    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &K) -> Result<V> {
        let less = self.less();
        let inner = self.read();
        inner
            .matching(inner.seek(key, less), key, less)
            .map(|id| inner.arena[id].value.clone())
            .ok_or(Error::NotFound)
    }
}

impl<K: Clone, V: Clone> SkipList<K, V> {
    /// Returns copies of the stored key and value equal to `key`.
    ///
    /// The stored key can differ from the probe in fields the comparator ignores.
    pub fn get_entry(&self, key: &K) -> Result<(K, V)> {
        let less = self.less();
        let inner = self.read();
        inner
            .matching(inner.seek(key, less), key, less)
            .map(|id| {
                let node = &inner.arena[id];
                (node.key.clone(), node.value.clone())
            })
            .ok_or(Error::NotFound)
    }
}
