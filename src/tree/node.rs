//! Node views
//!
//! A view is a borrow of the tree plus a slot index. Shared views are
//! `Copy` and can be held side by side; a mutable view holds the tree
//! exclusively, so no relocation can happen behind it.

use super::traversal::Preorder;
use super::Tree;
use crate::arena::{NodeId, Slot};
use crate::{Result, TreeError};
use std::fmt;
use std::mem;

/// Read-only view of one node
pub struct NodeView<'a, T> {
    tree: &'a Tree<T>,
    slot: u32,
}

impl<T> Clone for NodeView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeView<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for NodeView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeView")
            .field("slot", &self.slot)
            .field("data", self.data())
            .field("children", &self.child_count())
            .finish()
    }
}

impl<'a, T> NodeView<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, slot: u32) -> Self {
        Self { tree, slot }
    }

    #[inline]
    fn node(&self) -> &'a Slot<T> {
        self.tree.arena.live(self.slot)
    }

    /// Handle for this node
    pub fn id(&self) -> NodeId {
        NodeId {
            slot: self.slot,
            stamp: self.node().stamp,
        }
    }

    /// Arena slot this node occupies
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    /// Payload
    pub fn data(&self) -> &'a T {
        &self.node().payload
    }

    /// Check if leaf
    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.node().child_count()
    }

    /// Child at `index` in sibling order
    pub fn child(&self, index: usize) -> Result<NodeView<'a, T>> {
        let children = &self.node().children;
        match children.get(index) {
            Some(&slot) => Ok(NodeView::new(self.tree, slot)),
            None => Err(TreeError::ChildIndex {
                index,
                len: children.len(),
            }),
        }
    }

    /// Children in sibling order
    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeView<'a, T>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&slot| NodeView::new(tree, slot))
    }

    /// Parent (None at the root)
    pub fn parent(&self) -> Option<NodeView<'a, T>> {
        self.node().parent.map(|p| NodeView::new(self.tree, p))
    }

    /// Check if root
    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    /// Edges between this node and the root
    pub fn depth_from_root(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.node().parent;
        while let Some(p) = cursor {
            depth += 1;
            cursor = self.tree.arena.live(p).parent;
        }
        depth
    }

    /// Nodes in the subtree rooted here, this node included
    pub fn subtree_size(&self) -> usize {
        self.descendants().count()
    }

    /// This node and its descendants in preorder
    pub fn descendants(&self) -> Preorder<'a, T> {
        Preorder::new(self.tree, Some(self.slot))
    }
}

/// Mutable view of one node
pub struct NodeViewMut<'a, T> {
    tree: &'a mut Tree<T>,
    slot: u32,
}

impl<T: fmt::Debug> fmt::Debug for NodeViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_view().fmt(f)
    }
}

impl<'a, T> NodeViewMut<'a, T> {
    pub(crate) fn new(tree: &'a mut Tree<T>, slot: u32) -> Self {
        Self { tree, slot }
    }

    /// Reborrow as a read-only view
    pub fn as_view(&self) -> NodeView<'_, T> {
        NodeView::new(&*self.tree, self.slot)
    }

    /// Handle for this node
    pub fn id(&self) -> NodeId {
        self.as_view().id()
    }

    /// Payload
    pub fn data(&self) -> &T {
        &self.tree.arena.live(self.slot).payload
    }

    /// Mutable payload
    pub fn data_mut(&mut self) -> &mut T {
        &mut self.tree.arena.live_mut(self.slot).payload
    }

    /// Replace the payload, returning the old one
    pub fn set_data(&mut self, payload: T) -> T {
        mem::replace(self.data_mut(), payload)
    }

    /// Check if leaf
    pub fn is_leaf(&self) -> bool {
        self.as_view().is_leaf()
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.as_view().child_count()
    }

    /// Child at `index`
    pub fn child(&self, index: usize) -> Result<NodeView<'_, T>> {
        self.as_view().child(index)
    }

    /// Mutable view of the child at `index`
    pub fn child_mut(&mut self, index: usize) -> Result<NodeViewMut<'_, T>> {
        let slot = self.child_slot(index)?;
        Ok(NodeViewMut::new(self.tree, slot))
    }

    /// Turn into a view of the child at `index`
    pub fn into_child(self, index: usize) -> Result<NodeViewMut<'a, T>> {
        let slot = self.child_slot(index)?;
        Ok(NodeViewMut::new(self.tree, slot))
    }

    /// Turn into a view of the parent (None at the root)
    pub fn into_parent(self) -> Option<NodeViewMut<'a, T>> {
        let parent = self.tree.arena.live(self.slot).parent?;
        Some(NodeViewMut::new(self.tree, parent))
    }

    /// Append a child and return a view of it
    pub fn add_child(&mut self, payload: T) -> Result<NodeViewMut<'_, T>> {
        let child = self.tree.insert_child(self.slot, payload)?;
        Ok(NodeViewMut::new(self.tree, child))
    }

    /// Remove the child at `index` with its subtree
    ///
    /// Returns the removed payloads in preorder. Under
    /// [`crate::FreePolicy::RejectNonLeaf`] a child with children of its
    /// own is refused.
    pub fn remove_child(&mut self, index: usize) -> Result<Vec<T>> {
        self.tree.remove_child_of(self.slot, index)
    }

    fn child_slot(&self, index: usize) -> Result<u32> {
        let children = &self.tree.arena.live(self.slot).children;
        children
            .get(index)
            .copied()
            .ok_or(TreeError::ChildIndex {
                index,
                len: children.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::{FreePolicy, Tree, TreeConfig, TreeError};

    fn family() -> Tree<&'static str> {
        let mut tree = Tree::with_root("root");
        let mut root = tree.root_mut().unwrap();
        let mut a = root.add_child("a").unwrap();
        a.add_child("a1").unwrap();
        a.add_child("a2").unwrap();
        root.add_child("b").unwrap();
        tree
    }

    #[test]
    fn test_child_out_of_range() {
        let tree = family();
        let leaf = tree.root().unwrap().child(1).unwrap();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.child(0).unwrap_err(), TreeError::ChildIndex { index: 0, len: 0 });
        let root = tree.root().unwrap();
        assert_eq!(root.child(2).unwrap_err(), TreeError::ChildIndex { index: 2, len: 2 });
    }

    #[test]
    fn test_navigation() {
        let tree = family();
        let root = tree.root().unwrap();
        assert!(root.is_root());
        assert!(root.parent().is_none());

        let a2 = root.child(0).unwrap().child(1).unwrap();
        assert_eq!(a2.data(), &"a2");
        assert_eq!(a2.depth_from_root(), 2);
        assert_eq!(a2.parent().unwrap().data(), &"a");
        assert_eq!(root.subtree_size(), 5);
        assert_eq!(root.child(0).unwrap().subtree_size(), 3);

        let names: Vec<_> = root.children().map(|c| *c.data()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_set_data_keeps_shape() {
        let mut tree = family();
        let before = tree.mutations_since_rebalance();
        let mut b = tree.root_mut().unwrap().into_child(1).unwrap();
        assert_eq!(b.set_data("bee"), "b");
        assert_eq!(b.data(), &"bee");
        assert_eq!(tree.mutations_since_rebalance(), before);
        assert_eq!(tree.size(), 5);
    }

    #[test]
    fn test_remove_child() {
        let mut tree = family();
        let mut root = tree.root_mut().unwrap();
        assert_eq!(root.remove_child(0).unwrap(), vec!["a", "a1", "a2"]);
        assert_eq!(root.child_count(), 1);
        assert_eq!(
            root.remove_child(3).unwrap_err(),
            TreeError::ChildIndex { index: 3, len: 1 }
        );
        assert_eq!(tree.size(), 2);
    }

    #[test]
    fn test_remove_child_rejected_under_leaf_policy() {
        let config = TreeConfig::default().with_free_policy(FreePolicy::RejectNonLeaf);
        let mut tree = Tree::create(Some("root"), config);
        let mut root = tree.root_mut().unwrap();
        root.add_child("a").unwrap().add_child("a1").unwrap();

        assert!(matches!(
            root.remove_child(0),
            Err(TreeError::NonLeafFree { children: 1, .. })
        ));
        assert_eq!(tree.size(), 3);
    }

    #[test]
    fn test_into_parent_walks_up() {
        let mut tree = family();
        let a1 = tree.root_mut().unwrap().into_child(0).unwrap().into_child(0).unwrap();
        let mut a = a1.into_parent().unwrap();
        a.add_child("a3").unwrap();
        assert_eq!(tree.root().unwrap().child(0).unwrap().child_count(), 3);
    }
}
