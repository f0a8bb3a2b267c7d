//! Slot record and node handle
//!
//! Slot = payload + parent index + ordered child indices
//! Child order is insertion order and is the tree's sibling order.

use std::fmt;

/// One occupied arena slot
#[derive(Debug, Clone)]
pub struct Slot<T> {
    /// Caller payload, owned by the arena for the slot's lifetime
    pub(crate) payload: T,

    /// Parent slot (None for the root)
    pub(crate) parent: Option<u32>,

    /// Child slots in sibling order
    pub(crate) children: Vec<u32>,

    /// Placement stamp, fresh on every allocation or relocation
    pub(crate) stamp: u64,
}

impl<T> Slot<T> {
    pub(crate) fn new(payload: T, parent: Option<u32>, stamp: u64) -> Self {
        Self {
            payload,
            parent,
            children: Vec::new(),
            stamp,
        }
    }

    /// Payload stored in this slot
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Mutable payload
    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    /// Parent slot index
    pub fn parent(&self) -> Option<usize> {
        self.parent.map(|p| p as usize)
    }

    /// Child slot indices in sibling order
    pub fn children(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.children.iter().map(|&c| c as usize)
    }

    /// Number of children
    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Check if leaf
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Handle to a node that survives unrelated mutations
///
/// A handle stops resolving once its node is freed or moved to another
/// slot by a rebalance; resolving it then fails with [`crate::TreeError::StaleNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) slot: u32,
    pub(crate) stamp: u64,
}

impl NodeId {
    /// Slot index the handle points at
    pub fn slot(&self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.slot, self.stamp)
    }
}
