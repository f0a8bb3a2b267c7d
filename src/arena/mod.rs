//! Contiguous node arena
//!
//! Every node is a slot in one `Vec`, addressed by `u32` index.
//! Parent and child links are indices, so relocating nodes is a pure
//! index rewrite and reference cycles cannot be built.
//!
//! Freed slots go on a freelist and are handed out again before the
//! vector grows.

mod slot;

pub use slot::{NodeId, Slot};

use crate::{Result, TreeError};
use std::mem;

/// What `free` does with a slot that still has children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FreePolicy {
    /// Free the whole subtree
    #[default]
    Cascade,

    /// Refuse with [`TreeError::NonLeafFree`]
    RejectNonLeaf,
}

/// Largest number of slots a `u32` index can address
const MAX_SLOTS: usize = u32::MAX as usize;

/// Slot arena with freelist
///
/// Invariant: active slots form a single tree rooted at `root`, or the
/// arena holds no active slot at all.
#[derive(Debug, Clone)]
pub struct NodeArena<T> {
    /// Slot storage (None = free)
    slots: Vec<Option<Slot<T>>>,

    /// Reclaimed slots, popped before the vector grows
    free: Vec<u32>,

    /// Root slot
    root: Option<u32>,

    /// Number of active slots
    live: usize,

    /// Source of placement stamps
    next_stamp: u64,

    /// Structural mutations since creation (monotonic)
    mutations: u64,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeArena<T> {
    /// Create empty arena
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create empty arena with room for `capacity` slots
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            root: None,
            live: 0,
            next_stamp: 0,
            mutations: 0,
        }
    }

    /// Number of active nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when no node is active
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total slots, active and free
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slots waiting on the freelist
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    /// Root slot index
    #[inline]
    pub fn root(&self) -> Option<usize> {
        self.root.map(|r| r as usize)
    }

    /// Structural mutations recorded since the arena was created
    #[inline]
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Check whether `slot` holds a node
    pub fn is_active(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    /// Allocate a node under `parent` (None allocates the root)
    ///
    /// Reuses a freed slot when one is available, else appends.
    /// The new node becomes the parent's last child.
    pub fn allocate(&mut self, payload: T, parent: Option<usize>) -> Result<usize> {
        let parent = match parent {
            Some(p) => {
                if !self.is_active(p) {
                    return Err(TreeError::InactiveSlot { slot: p });
                }
                Some(p as u32)
            }
            None if self.root.is_some() => return Err(TreeError::RootAlreadyPresent),
            None => None,
        };

        let reused = self.free.pop();
        if reused.is_none() && self.slots.len() >= MAX_SLOTS {
            return Err(TreeError::CapacityExhausted(MAX_SLOTS));
        }

        let stamp = self.fresh_stamp();
        let node = Slot::new(payload, parent, stamp);
        let index = match reused {
            Some(index) => {
                self.slots[index as usize] = Some(node);
                index
            }
            None => {
                self.slots.push(Some(node));
                (self.slots.len() - 1) as u32
            }
        };

        match parent {
            Some(p) => self.live_mut(p).children.push(index),
            None => self.root = Some(index),
        }

        self.live += 1;
        self.mutations += 1;
        Ok(index as usize)
    }

    /// Free `slot` according to `policy`
    ///
    /// Returns the freed payloads in preorder (the slot's own payload first).
    /// The slot is detached from its parent's child sequence.
    pub fn free(&mut self, slot: usize, policy: FreePolicy) -> Result<Vec<T>> {
        let target = self.get(slot)?;
        if policy == FreePolicy::RejectNonLeaf && !target.is_leaf() {
            return Err(TreeError::NonLeafFree {
                slot,
                children: target.child_count(),
            });
        }

        let parent = target.parent;
        let doomed = self.subtree_preorder(slot as u32);

        match parent {
            Some(p) => {
                let siblings = &mut self.live_mut(p).children;
                if let Some(pos) = siblings.iter().position(|&c| c as usize == slot) {
                    siblings.remove(pos);
                }
            }
            None => self.root = None,
        }

        let mut payloads = Vec::with_capacity(doomed.len());
        for index in doomed {
            if let Some(node) = self.slots[index as usize].take() {
                payloads.push(node.payload);
                self.free.push(index);
            }
        }

        self.live -= payloads.len();
        self.mutations += 1;
        Ok(payloads)
    }

    /// Node record at `slot`
    pub fn get(&self, slot: usize) -> Result<&Slot<T>> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or(TreeError::InactiveSlot { slot })
    }

    /// Mutable node record at `slot`
    ///
    /// Only the payload is reachable mutably; links stay crate-private.
    pub fn get_mut(&mut self, slot: usize) -> Result<&mut Slot<T>> {
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or(TreeError::InactiveSlot { slot })
    }

    /// Children of `slot` in sibling order
    pub fn children_of(&self, slot: usize) -> Result<impl ExactSizeIterator<Item = usize> + '_> {
        Ok(self.get(slot)?.children())
    }

    /// Handle for the node currently in `slot`
    pub fn node_id(&self, slot: usize) -> Result<NodeId> {
        let node = self.get(slot)?;
        Ok(NodeId {
            slot: slot as u32,
            stamp: node.stamp,
        })
    }

    /// Resolve a handle back to its slot
    pub fn resolve(&self, id: NodeId) -> Result<usize> {
        match self.slots.get(id.slot as usize) {
            Some(Some(node)) if node.stamp == id.stamp => Ok(id.slot as usize),
            _ => Err(TreeError::StaleNode {
                slot: id.slot as usize,
            }),
        }
    }

    /// Active slots in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Slot<T>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|node| (i, node)))
    }

    /// Move every active node so that `order[k]` lands in slot `k`
    ///
    /// `order` must name each active slot exactly once. With `compact` the
    /// trailing free slots are dropped and child lists shrunk to fit;
    /// otherwise they stay on the freelist. Nodes that change slot get a
    /// fresh stamp; nodes that stay put keep theirs. Returns the old-to-new slot map (`u32::MAX` for slots
    /// that held nothing).
    pub fn relocate(&mut self, order: &[u32], compact: bool) -> Result<Vec<u32>> {
        let old_len = self.slots.len();
        let mut remap = vec![u32::MAX; old_len];
        let mut covered = 0;
        for (new, &old) in order.iter().enumerate() {
            if self.is_active(old as usize) && remap[old as usize] == u32::MAX {
                remap[old as usize] = new as u32;
                covered += 1;
            }
        }
        if covered != self.live || order.len() != self.live {
            return Err(TreeError::InvalidRelocation {
                expected: self.live,
                got: covered,
            });
        }

        let mut old = mem::take(&mut self.slots);
        let mut slots = Vec::with_capacity(if compact { self.live } else { old_len });
        for &index in order {
            if let Some(mut node) = old[index as usize].take() {
                node.parent = node.parent.map(|p| remap[p as usize]);
                for child in node.children.iter_mut() {
                    *child = remap[*child as usize];
                }
                if compact {
                    node.children.shrink_to_fit();
                }
                if slots.len() != index as usize {
                    node.stamp = self.fresh_stamp();
                }
                slots.push(Some(node));
            }
        }

        if compact {
            self.free = Vec::new();
        } else {
            slots.resize_with(old_len, || None);
            self.free = (self.live as u32..old_len as u32).rev().collect();
        }
        self.slots = slots;
        self.root = self.root.map(|r| remap[r as usize]);
        Ok(remap)
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.root = None;
        self.live = 0;
        self.mutations += 1;
    }

    /// Take every payload out in the given slot order and leave the arena
    /// empty (one mutation)
    pub(crate) fn drain_order(&mut self, order: &[u32]) -> Vec<T> {
        let mut slots = mem::take(&mut self.slots);
        let payloads = order
            .iter()
            .filter_map(|&index| slots.get_mut(index as usize)?.take())
            .map(|node| node.payload)
            .collect();
        self.free.clear();
        self.root = None;
        self.live = 0;
        self.mutations += 1;
        payloads
    }

    /// Bytes held by slot storage, child lists and the freelist
    pub fn memory_bytes(&self) -> usize {
        let slot_bytes = self.slots.capacity() * Self::slot_size();
        let child_bytes: usize = self
            .iter()
            .map(|(_, node)| node.children.capacity() * mem::size_of::<u32>())
            .sum();
        slot_bytes + child_bytes + self.free.capacity() * mem::size_of::<u32>()
    }

    /// Size of one slot record
    #[inline]
    pub fn slot_size() -> usize {
        mem::size_of::<Option<Slot<T>>>()
    }

    /// Slots of the subtree at `slot` in preorder
    pub(crate) fn subtree_preorder(&self, slot: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = vec![slot];
        while let Some(index) = stack.pop() {
            out.push(index);
            stack.extend(self.live(index).children.iter().rev());
        }
        out
    }

    /// Active slot lookup for indices taken from the arena's own links
    ///
    /// Panics if `slot` is free: links and views only ever name active slots.
    #[inline]
    pub(crate) fn live(&self, slot: u32) -> &Slot<T> {
        match &self.slots[slot as usize] {
            Some(node) => node,
            None => unreachable!("link to free slot {slot}"),
        }
    }

    #[inline]
    pub(crate) fn live_mut(&mut self, slot: u32) -> &mut Slot<T> {
        match &mut self.slots[slot as usize] {
            Some(node) => node,
            None => unreachable!("link to free slot {slot}"),
        }
    }

    fn fresh_stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (NodeArena<&'static str>, [usize; 4]) {
        let mut arena = NodeArena::new();
        let root = arena.allocate("root", None).unwrap();
        let a = arena.allocate("a", Some(root)).unwrap();
        let b = arena.allocate("b", Some(root)).unwrap();
        let a1 = arena.allocate("a1", Some(a)).unwrap();
        (arena, [root, a, b, a1])
    }

    #[test]
    fn test_allocate_appends_in_order() {
        let (arena, [root, a, b, a1]) = sample();
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.root(), Some(root));
        assert_eq!(arena.children_of(root).unwrap().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(arena.get(a1).unwrap().parent(), Some(a));
        assert_eq!(arena.mutation_count(), 4);
    }

    #[test]
    fn test_second_root_rejected() {
        let (mut arena, _) = sample();
        assert_eq!(arena.allocate("x", None), Err(TreeError::RootAlreadyPresent));
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn test_cascade_free_returns_preorder_payloads() {
        let (mut arena, [root, a, _, _]) = sample();
        let freed = arena.free(a, FreePolicy::Cascade).unwrap();
        assert_eq!(freed, vec!["a", "a1"]);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.free_slots(), 2);
        assert_eq!(arena.get(root).unwrap().child_count(), 1);
    }

    #[test]
    fn test_reject_policy_leaves_arena_untouched() {
        let (mut arena, [_, a, _, a1]) = sample();
        let before = arena.mutation_count();
        let err = arena.free(a, FreePolicy::RejectNonLeaf).unwrap_err();
        assert_eq!(err, TreeError::NonLeafFree { slot: a, children: 1 });
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.mutation_count(), before);

        // Leaves are fine under either policy
        assert_eq!(arena.free(a1, FreePolicy::RejectNonLeaf).unwrap(), vec!["a1"]);
    }

    #[test]
    fn test_freelist_reuse() {
        let (mut arena, [root, _, b, _]) = sample();
        arena.free(b, FreePolicy::Cascade).unwrap();
        let c = arena.allocate("c", Some(root)).unwrap();
        assert_eq!(c, b);
        assert_eq!(arena.slot_count(), 4);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let (mut arena, [root, _, b, _]) = sample();
        let id = arena.node_id(b).unwrap();
        arena.free(b, FreePolicy::Cascade).unwrap();
        arena.allocate("c", Some(root)).unwrap();
        assert_eq!(arena.resolve(id), Err(TreeError::StaleNode { slot: b }));
    }

    #[test]
    fn test_free_root_empties_arena() {
        let (mut arena, [root, ..]) = sample();
        let freed = arena.free(root, FreePolicy::Cascade).unwrap();
        assert_eq!(freed, vec!["root", "a", "a1", "b"]);
        assert!(arena.is_empty());
        assert_eq!(arena.root(), None);
    }

    #[test]
    fn test_relocate_rewrites_links() {
        let (mut arena, [root, a, b, a1]) = sample();
        // Reverse the layout
        let order = [a1 as u32, b as u32, a as u32, root as u32];
        let remap = arena.relocate(&order, false).unwrap();
        assert_eq!(remap, vec![3, 2, 1, 0]);
        assert_eq!(arena.root(), Some(3));
        assert_eq!(arena.children_of(3).unwrap().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(arena.get(0).unwrap().parent(), Some(2));
        assert_eq!(arena.get(0).unwrap().payload(), &"a1");
    }

    #[test]
    fn test_relocate_restamps_only_moved_nodes() {
        let (mut arena, [root, a, b, a1]) = sample();
        let ids = [root, a, b, a1].map(|slot| arena.node_id(slot).unwrap());
        // Preorder: root and a stay, a1 and b swap
        arena
            .relocate(&[root as u32, a as u32, a1 as u32, b as u32], false)
            .unwrap();

        assert_eq!(arena.resolve(ids[0]), Ok(root));
        assert_eq!(arena.resolve(ids[1]), Ok(a));
        assert_eq!(arena.resolve(ids[2]), Err(TreeError::StaleNode { slot: b }));
        assert_eq!(arena.resolve(ids[3]), Err(TreeError::StaleNode { slot: a1 }));
        assert_eq!(arena.get(b).unwrap().payload(), &"a1");
    }

    #[test]
    fn test_relocate_compacts_free_slots() {
        let (mut arena, [root, a, b, _]) = sample();
        arena.free(a, FreePolicy::Cascade).unwrap();
        arena.relocate(&[root as u32, b as u32], true).unwrap();
        assert_eq!(arena.slot_count(), 2);
        assert_eq!(arena.free_slots(), 0);

        let (mut arena, [root, a, b, _]) = sample();
        arena.free(a, FreePolicy::Cascade).unwrap();
        arena.relocate(&[root as u32, b as u32], false).unwrap();
        assert_eq!(arena.slot_count(), 4);
        assert_eq!(arena.free_slots(), 2);
        assert_eq!(arena.allocate("c", Some(0)).unwrap(), 2);
    }

    #[test]
    fn test_relocate_rejects_partial_order() {
        let (mut arena, [root, a, _, _]) = sample();
        let err = arena.relocate(&[root as u32, a as u32, a as u32], false).unwrap_err();
        assert_eq!(err, TreeError::InvalidRelocation { expected: 4, got: 2 });
        assert_eq!(arena.get(root).unwrap().payload(), &"root");
    }
}
