//! Locality scoring and slot relocation
//!
//! Score: walk nodes in canonical order v_0..v_{n-1} and measure how far
//! each node sits from the slot right after its predecessor:
//!   gap_k = |slot(v_k) - slot(v_{k-1}) - 1|
//!   score = mean(1 / (1 + gap_k / 10))
//! A layout identical to canonical order scores exactly 1.0, larger gaps
//! push the score toward 0.
//!
//! Pairs are consecutive nodes, not parent and child: under breadth-first
//! layout a first child sits a whole level away from its parent, so a
//! parent-child distance could never reach 1.0 in that order.
//!
//! Relocation permutes slots into canonical order, so the score right
//! after a rebalance is 1.0 and never below the score before it.

mod order;

pub use order::LayoutOrder;

use crate::arena::NodeArena;
use crate::Result;

/// Gap (in slots) at which a transition contributes half a point
const GAP_SCALE: f64 = 10.0;

/// How rebalances treat free slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageMode {
    /// Permute in place; free slots stay on the freelist behind the nodes
    #[default]
    Indexed,

    /// Pure packed array: every relocation drops free slots and shrinks
    /// child lists to fit
    Array,
}

/// Result of one relocation pass
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceOutcome {
    /// Score before the pass
    pub score_before: f64,
    /// Score after the pass
    pub score_after: f64,
    /// Nodes whose slot changed
    pub moved: usize,
    /// Free slots released by compaction
    pub compacted_slots: usize,
    remap: Option<Vec<u32>>,
}

impl RebalanceOutcome {
    fn unchanged(score: f64) -> Self {
        Self {
            score_before: score,
            score_after: score,
            moved: 0,
            compacted_slots: 0,
            remap: None,
        }
    }

    /// True if slots were rewritten (handles of moved nodes are stale)
    pub fn relocated(&self) -> bool {
        self.remap.is_some()
    }

    /// Where the node formerly in `old` lives now
    pub fn new_slot(&self, old: usize) -> Option<usize> {
        match &self.remap {
            Some(remap) => remap
                .get(old)
                .filter(|&&slot| slot != u32::MAX)
                .map(|&slot| slot as usize),
            None => Some(old),
        }
    }
}

/// Locality scorer and slot relocator
#[derive(Debug, Clone, Default)]
pub struct LocalityOptimizer {
    layout: LayoutOrder,
    mode: StorageMode,
}

impl LocalityOptimizer {
    /// Create optimizer targeting `layout`
    pub fn new(layout: LayoutOrder) -> Self {
        Self {
            layout,
            mode: StorageMode::Indexed,
        }
    }

    /// Target traversal order
    pub fn layout(&self) -> LayoutOrder {
        self.layout
    }

    /// Current storage mode
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Locality score of the arena's current layout, in [0, 1]
    pub fn score<T>(&self, arena: &NodeArena<T>) -> f64 {
        score_order(&self.layout.visit(arena))
    }

    /// Relocate slots into canonical order
    ///
    /// A layout that already matches (and has nothing to compact) is left
    /// alone, so handles survive a redundant pass.
    pub fn rebalance<T>(&self, arena: &mut NodeArena<T>) -> Result<RebalanceOutcome> {
        self.relocate(arena, self.mode == StorageMode::Array)
    }

    /// Switch to [`StorageMode::Array`] and compact immediately
    ///
    /// Returns `None` when array storage was already on.
    pub fn enable_array_storage<T>(
        &mut self,
        arena: &mut NodeArena<T>,
    ) -> Result<Option<RebalanceOutcome>> {
        if self.mode == StorageMode::Array {
            return Ok(None);
        }
        let outcome = self.relocate(arena, true)?;
        self.mode = StorageMode::Array;
        tracing::debug!(
            nodes = arena.len(),
            compacted = outcome.compacted_slots,
            "switched to array storage"
        );
        Ok(Some(outcome))
    }

    fn relocate<T>(&self, arena: &mut NodeArena<T>, compact: bool) -> Result<RebalanceOutcome> {
        #[cfg(feature = "profiling")]
        let started = std::time::Instant::now();

        let order = self.layout.visit(arena);
        let before = score_order(&order);
        let holes = arena.slot_count() - arena.len();
        let moved = order
            .iter()
            .enumerate()
            .filter(|&(new, &old)| new as u32 != old)
            .count();

        if moved == 0 && (holes == 0 || !compact) {
            return Ok(RebalanceOutcome::unchanged(before));
        }

        let remap = arena.relocate(&order, compact)?;
        let after = self.score(arena);

        tracing::debug!(
            layout = %self.layout,
            nodes = arena.len(),
            moved,
            before,
            after,
            "relocated slots for locality"
        );
        #[cfg(feature = "profiling")]
        tracing::debug!(elapsed_us = started.elapsed().as_micros() as u64, "relocation timing");

        Ok(RebalanceOutcome {
            score_before: before,
            score_after: after,
            moved,
            compacted_slots: if compact { holes } else { 0 },
            remap: Some(remap),
        })
    }
}

/// Score a visitation order given as slot indices
pub fn score_order(order: &[u32]) -> f64 {
    if order.len() <= 1 {
        return 1.0;
    }
    let total: f64 = order
        .windows(2)
        .map(|pair| {
            let gap = (i64::from(pair[1]) - i64::from(pair[0]) - 1).unsigned_abs() as f64;
            1.0 / (1.0 + gap / GAP_SCALE)
        })
        .sum();
    total / (order.len() - 1) as f64
}
