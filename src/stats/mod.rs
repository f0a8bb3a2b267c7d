//! Derived metrics
//!
//! Everything here reads the arena and never mutates it.

use crate::arena::NodeArena;
use crate::codec;
use crate::locality::LocalityOptimizer;
use std::fmt;
use std::mem;

/// Shape summary
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeStatistics {
    /// Active nodes
    pub size: usize,

    /// Longest root-to-leaf path in edges (None when empty)
    pub depth: Option<usize>,

    /// Nodes per level, root level first
    pub level_counts: Vec<usize>,

    /// Nodes without children
    pub leaf_nodes: usize,
    /// Nodes with at least one child
    pub internal_nodes: usize,
    /// Largest child count
    pub max_children: usize,
    /// Smallest child count among internal nodes (0 if there are none)
    pub min_children: usize,
    /// Mean child count among internal nodes
    pub avg_children: f64,

    /// Relocation passes run so far
    pub rebalance_count: u64,
}

impl TreeStatistics {
    /// Generate report
    pub fn report(&self) -> String {
        let depth = match self.depth {
            Some(d) => d.to_string(),
            None => "-".to_string(),
        };
        format!(
            "Nodes: {} (leaves {}, internal {})\nDepth: {}\nLevels: {:?}\nChildren per internal node: min {} / avg {:.2} / max {}\nRebalances: {}",
            self.size,
            self.leaf_nodes,
            self.internal_nodes,
            depth,
            self.level_counts,
            self.min_children,
            self.avg_children,
            self.max_children,
            self.rebalance_count
        )
    }
}

/// Arena bytes versus logical payload bytes
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStats {
    /// Bytes held by the arena (slots, child lists, freelist)
    pub arena_bytes: usize,
    /// n x size_of::<T>()
    pub payload_bytes: usize,
    /// arena_bytes - payload_bytes
    pub overhead_bytes: usize,
    /// arena_bytes / n (0 when empty)
    pub bytes_per_node: f64,
    /// Size of one slot record
    pub slot_bytes: usize,
    /// Slots allocated, active or free
    pub slot_count: usize,
    /// Slots on the freelist
    pub free_slots: usize,
}

/// Combined locality diagnostics
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalityStatistics {
    /// Active nodes
    pub total_nodes: usize,
    /// Depth in edges (0 when empty)
    pub max_depth: usize,
    /// Locality score in [0, 1]
    pub locality_score: f64,
    /// Succinct size / pointer-tree size
    pub compression_ratio: f64,
    /// Arena bytes
    pub memory_usage_bytes: usize,
    /// Slots per cache line (at least 1)
    pub cache_line_efficiency: usize,
}

impl fmt::Display for LocalityStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total nodes: {}", self.total_nodes)?;
        writeln!(f, "Max depth: {}", self.max_depth)?;
        writeln!(f, "Locality score: {:.4}", self.locality_score)?;
        writeln!(f, "Compression ratio: {:.4}", self.compression_ratio)?;
        writeln!(f, "Memory usage: {} bytes", self.memory_usage_bytes)?;
        write!(f, "Cache efficiency: {} nodes/line", self.cache_line_efficiency)
    }
}

/// Nodes per level, root first (empty for an empty arena)
pub fn level_counts<T>(arena: &NodeArena<T>) -> Vec<usize> {
    let mut counts = Vec::new();
    let mut frontier: Vec<u32> = arena.root().map(|r| r as u32).into_iter().collect();
    while !frontier.is_empty() {
        counts.push(frontier.len());
        frontier = frontier
            .iter()
            .flat_map(|&slot| arena.live(slot).children.iter().copied())
            .collect();
    }
    counts
}

/// Longest root-to-leaf path in edges
pub fn depth<T>(arena: &NodeArena<T>) -> Option<usize> {
    level_counts(arena).len().checked_sub(1)
}

/// Shape summary of `arena`
pub fn tree_statistics<T>(arena: &NodeArena<T>, rebalance_count: u64) -> TreeStatistics {
    let level_counts = level_counts(arena);
    let mut leaf_nodes = 0;
    let mut internal_nodes = 0;
    let mut total_children = 0;
    let mut max_children = 0;
    let mut min_children = usize::MAX;

    for (_, node) in arena.iter() {
        let count = node.child_count();
        if count == 0 {
            leaf_nodes += 1;
        } else {
            internal_nodes += 1;
            total_children += count;
            min_children = min_children.min(count);
        }
        max_children = max_children.max(count);
    }

    TreeStatistics {
        size: arena.len(),
        depth: level_counts.len().checked_sub(1),
        level_counts,
        leaf_nodes,
        internal_nodes,
        max_children,
        min_children: if internal_nodes == 0 { 0 } else { min_children },
        avg_children: if internal_nodes == 0 {
            0.0
        } else {
            total_children as f64 / internal_nodes as f64
        },
        rebalance_count,
    }
}

/// Memory accounting for `arena`
pub fn memory_stats<T>(arena: &NodeArena<T>) -> MemoryStats {
    let arena_bytes = arena.memory_bytes();
    let payload_bytes = arena.len() * mem::size_of::<T>();
    MemoryStats {
        arena_bytes,
        payload_bytes,
        overhead_bytes: arena_bytes.saturating_sub(payload_bytes),
        bytes_per_node: if arena.is_empty() {
            0.0
        } else {
            arena_bytes as f64 / arena.len() as f64
        },
        slot_bytes: NodeArena::<T>::slot_size(),
        slot_count: arena.slot_count(),
        free_slots: arena.free_slots(),
    }
}

/// Locality diagnostics for `arena` as laid out for `optimizer`
pub fn locality_statistics<T>(
    arena: &NodeArena<T>,
    optimizer: &LocalityOptimizer,
    cache_line_bytes: usize,
) -> LocalityStatistics {
    LocalityStatistics {
        total_nodes: arena.len(),
        max_depth: depth(arena).unwrap_or(0),
        locality_score: optimizer.score(arena),
        compression_ratio: codec::compression_ratio::<T>(arena.len()),
        memory_usage_bytes: arena.memory_bytes(),
        cache_line_efficiency: (cache_line_bytes / NodeArena::<T>::slot_size()).max(1),
    }
}
