//! Canonical visitation orders
//!
//! The layout order is both the yardstick for the locality score and the
//! slot order a rebalance produces.

use crate::arena::NodeArena;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Traversal order slots are laid out in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutOrder {
    /// Preorder: a node is followed by its first child's subtree
    #[default]
    DepthFirst,

    /// Level order: siblings are contiguous
    BreadthFirst,
}

impl LayoutOrder {
    /// Active slots of `arena` in this order, starting at the root
    pub fn visit<T>(self, arena: &NodeArena<T>) -> Vec<u32> {
        let Some(root) = arena.root() else {
            return Vec::new();
        };
        let root = root as u32;
        let mut order = Vec::with_capacity(arena.len());

        match self {
            LayoutOrder::DepthFirst => {
                let mut stack = vec![root];
                while let Some(slot) = stack.pop() {
                    order.push(slot);
                    stack.extend(arena.live(slot).children.iter().rev());
                }
            }
            LayoutOrder::BreadthFirst => {
                let mut queue = VecDeque::from([root]);
                while let Some(slot) = queue.pop_front() {
                    order.push(slot);
                    queue.extend(arena.live(slot).children.iter());
                }
            }
        }

        order
    }
}

impl fmt::Display for LayoutOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutOrder::DepthFirst => write!(f, "dfs"),
            LayoutOrder::BreadthFirst => write!(f, "bfs"),
        }
    }
}

impl FromStr for LayoutOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dfs" | "depth-first" | "preorder" => Ok(LayoutOrder::DepthFirst),
            "bfs" | "breadth-first" | "level-order" => Ok(LayoutOrder::BreadthFirst),
            other => Err(format!("unknown layout order '{other}' (expected dfs or bfs)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_on_small_tree() {
        let mut arena = NodeArena::new();
        let root = arena.allocate('r', None).unwrap();
        let a = arena.allocate('a', Some(root)).unwrap();
        let b = arena.allocate('b', Some(root)).unwrap();
        let a1 = arena.allocate('x', Some(a)).unwrap();

        let slots = |v: Vec<u32>| v.into_iter().map(|s| s as usize).collect::<Vec<_>>();
        assert_eq!(slots(LayoutOrder::DepthFirst.visit(&arena)), vec![root, a, a1, b]);
        assert_eq!(slots(LayoutOrder::BreadthFirst.visit(&arena)), vec![root, a, b, a1]);
        assert!(LayoutOrder::DepthFirst.visit(&NodeArena::<u8>::new()).is_empty());
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!("BFS".parse::<LayoutOrder>(), Ok(LayoutOrder::BreadthFirst));
        assert_eq!("preorder".parse::<LayoutOrder>(), Ok(LayoutOrder::DepthFirst));
        assert!("zigzag".parse::<LayoutOrder>().is_err());
    }
}
