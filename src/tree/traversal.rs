//! Traversal iterators
//!
//! All three are iterative, so deep chains never touch the call stack.

use super::node::NodeView;
use super::Tree;
use std::collections::VecDeque;
use std::fmt;

/// Depth-first, node before its children
pub struct Preorder<'a, T> {
    tree: &'a Tree<T>,
    stack: Vec<u32>,
}

impl<'a, T> Preorder<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, start: Option<u32>) -> Self {
        Self {
            tree,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a, T> Iterator for Preorder<'a, T> {
    type Item = NodeView<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.stack.pop()?;
        self.stack
            .extend(self.tree.arena.live(slot).children.iter().rev());
        Some(NodeView::new(self.tree, slot))
    }
}

/// Depth-first, children before their node
pub struct Postorder<'a, T> {
    tree: &'a Tree<T>,
    /// (slot, children already pushed)
    stack: Vec<(u32, bool)>,
}

impl<'a, T> Postorder<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, start: Option<u32>) -> Self {
        Self {
            tree,
            stack: start.map(|s| (s, false)).into_iter().collect(),
        }
    }
}

impl<'a, T> Iterator for Postorder<'a, T> {
    type Item = NodeView<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((slot, expanded)) = self.stack.pop() {
            if expanded {
                return Some(NodeView::new(self.tree, slot));
            }
            self.stack.push((slot, true));
            self.stack.extend(
                self.tree
                    .arena
                    .live(slot)
                    .children
                    .iter()
                    .rev()
                    .map(|&c| (c, false)),
            );
        }
        None
    }
}

/// Breadth-first, root level first
pub struct LevelOrder<'a, T> {
    tree: &'a Tree<T>,
    queue: VecDeque<u32>,
}

impl<'a, T> LevelOrder<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, start: Option<u32>) -> Self {
        Self {
            tree,
            queue: start.into_iter().collect(),
        }
    }
}

impl<'a, T> Iterator for LevelOrder<'a, T> {
    type Item = NodeView<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.queue.pop_front()?;
        self.queue.extend(self.tree.arena.live(slot).children.iter());
        Some(NodeView::new(self.tree, slot))
    }
}

macro_rules! impl_traversal_debug {
    ($($name:ident),*) => {$(
        impl<T> fmt::Debug for $name<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    )*};
}

impl_traversal_debug!(Preorder, Postorder, LevelOrder);

#[cfg(test)]
mod tests {
    use crate::Tree;

    //       r
    //     / | \
    //    a  b  c
    //   / \     \
    //  a1 a2     c1
    fn sample() -> Tree<&'static str> {
        let mut tree = Tree::with_root("r");
        let mut root = tree.root_mut().unwrap();
        let mut a = root.add_child("a").unwrap();
        a.add_child("a1").unwrap();
        a.add_child("a2").unwrap();
        root.add_child("b").unwrap();
        root.add_child("c").unwrap().add_child("c1").unwrap();
        tree
    }

    #[test]
    fn test_preorder() {
        let order: Vec<_> = sample().preorder().map(|n| *n.data()).collect();
        assert_eq!(order, vec!["r", "a", "a1", "a2", "b", "c", "c1"]);
    }

    #[test]
    fn test_postorder() {
        let order: Vec<_> = sample().postorder().map(|n| *n.data()).collect();
        assert_eq!(order, vec!["a1", "a2", "a", "b", "c1", "c", "r"]);
    }

    #[test]
    fn test_level_order() {
        let order: Vec<_> = sample().level_order().map(|n| *n.data()).collect();
        assert_eq!(order, vec!["r", "a", "b", "c", "a1", "a2", "c1"]);
    }

    #[test]
    fn test_empty_tree_yields_nothing() {
        let tree: Tree<u8> = Tree::new();
        assert_eq!(tree.preorder().count(), 0);
        assert_eq!(tree.postorder().count(), 0);
        assert_eq!(tree.level_order().count(), 0);
    }

    #[test]
    fn test_find() {
        let tree = sample();
        let hit = tree.find(|d| d.starts_with('c')).unwrap();
        assert_eq!(hit.data(), &"c");
        assert!(tree.find(|d| *d == "zzz").is_none());
    }
}
