//! Forward cursor over the level-0 chain.

use crate::skiplist::list::{Position, SkipList};
use crate::skiplist::node::NodeId;
use std::iter::FusedIterator;

#[derive(Debug)]
enum Cursor<K> {
    /// Not started; the next step reads the head.
    Head,
    /// Positioned on a node. The key is kept so the cursor can find its place
    /// again if that node is removed before the next step.
    At { id: NodeId, key: K },
    Done,
}

/// A lazy, forward-only iterator over a [`SkipList`].
///
/// Each step takes the list's shared lock just long enough to read one node,
/// so the iterator sees the structure as it is at advance time rather than as
/// a snapshot. If the node under the cursor is deleted, iteration resumes at
/// the first key that sorts after the last one returned.
///
/// Items are copies; the list's nodes never leave the lock.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    list: &'a SkipList<K, V>,
    cursor: Cursor<K>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(list: &'a SkipList<K, V>) -> Self {
        Self {
            list,
            cursor: Cursor::Head,
        }
    }

    /// Ends iteration early. This only consumes the iterator: it holds no
    /// lock between steps, so dropping it is just as good.
    pub fn close(self) {}
}

impl<K: Clone, V: Clone> Iterator for Iter<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let inner = list.read();

        let next = match &self.cursor {
            Cursor::Head => inner.next(Position::Head, 0),
            Cursor::At { id, key } => match inner.arena.get(*id) {
                Some(node) => node.next(),
                None => inner.seek_after(key, list.less()),
            },
            Cursor::Done => return None,
        };

        let Some(id) = next else {
            self.cursor = Cursor::Done;
            return None;
        };

        let node = &inner.arena[id];
        self.cursor = Cursor::At {
            id,
            key: node.key.clone(),
        };
        Some((node.key.clone(), node.value.clone()))
    }
}

impl<K: Clone, V: Clone> FusedIterator for Iter<'_, K, V> {}
