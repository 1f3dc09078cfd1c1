//! Skip list nodes and the arena that owns them.
//!
//! Links between nodes are generational handles into the arena rather than
//! pointers. Removing a node bumps its slot's generation, so a handle held by
//! an iterator across a delete simply stops resolving instead of pointing at a
//! recycled node.

use std::ops::{Index, IndexMut};

/// Upper bound on node levels.
pub const MAX_LEVEL: usize = 32;

/// Probability that a node is promoted to the next level.
pub const PROBABILITY: f64 = 0.5;

/// Handle to a node stored in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u64,
}

/// A node in the skip list.
#[derive(Debug)]
pub struct Node<K, V> {
    pub key: K,
    pub value: V,
    /// `forward[i]` is the next node at level `i`. The node participates in
    /// levels `0..forward.len()`.
    pub forward: Vec<Option<NodeId>>,
    /// Level-0 predecessor. `None` when the predecessor is the head.
    pub backward: Option<NodeId>,
}

impl<K, V> Node<K, V> {
    /// Returns the level-0 successor.
    #[inline]
    pub fn next(&self) -> Option<NodeId> {
        self.forward.first().copied().flatten()
    }
}

#[derive(Debug)]
struct Slot<K, V> {
    generation: u64,
    node: Option<Node<K, V>>,
}

/// Slab of nodes with a free list for slot reuse.
#[derive(Debug)]
pub struct Arena<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
}

impl<K, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<K, V> Arena<K, V> {
    pub fn insert(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Removes a node, invalidating every outstanding handle to it.
    pub fn remove(&mut self, id: NodeId) -> Option<Node<K, V>> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation += 1;
        self.free.push(id.index);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<K, V>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<K, V>> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

// Handles reachable from the head are always live while the list lock is held,
// so indexing with one is an invariant, not a fallible lookup.
impl<K, V> Index<NodeId> for Arena<K, V> {
    type Output = Node<K, V>;

    fn index(&self, id: NodeId) -> &Self::Output {
        self.get(id).expect("stale node handle in live chain")
    }
}

impl<K, V> IndexMut<NodeId> for Arena<K, V> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        self.get_mut(id).expect("stale node handle in live chain")
    }
}
