//! Lazy rebalancing policy
//!
//! Relocation costs O(n). Running it once per k mutations amortizes that to
//! O(n/k) per mutation and bounds locality drift to k edits' worth.
//!
//! The mutation counter is derived from the arena's monotonic mutation
//! count minus a baseline taken at the last rebalance, so every structural
//! change the arena records is visible here without extra bookkeeping.

use crate::arena::NodeArena;
use crate::config::{self, TreeConfig};
use crate::locality::LocalityOptimizer;
use crate::stats;
use std::fmt;

/// Why a rebalance is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceTrigger {
    /// Mutation counter reached the threshold
    Threshold,
    /// Locality score fell below the floor
    Locality,
    /// Depth exceeds the skew bound
    Skew,
    /// Caller forced the pass
    Forced,
}

impl fmt::Display for RebalanceTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RebalanceTrigger::Threshold => "threshold",
            RebalanceTrigger::Locality => "locality",
            RebalanceTrigger::Skew => "skew",
            RebalanceTrigger::Forced => "forced",
        };
        f.write_str(name)
    }
}

/// Heuristic checks need at least this many nodes
const MIN_NODES_FOR_HEURISTICS: usize = 4;

/// Mutation counter and trigger thresholds, scoped to one tree
#[derive(Debug, Clone)]
pub struct RebalancePolicy {
    threshold: usize,
    locality_floor: f64,
    skew_factor: f64,
    max_children: usize,

    /// Arena mutation count at the last rebalance
    baseline: u64,

    /// Completed rebalances
    rebalances: u64,
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        Self::from_config(&TreeConfig::default())
    }
}

impl RebalancePolicy {
    /// Policy with the given threshold and default heuristics
    pub fn new(threshold: usize) -> Self {
        Self::from_config(&TreeConfig::default().with_threshold(threshold))
    }

    /// Policy from a tree configuration
    pub fn from_config(config: &TreeConfig) -> Self {
        Self {
            threshold: config.rebalance_threshold.max(1),
            locality_floor: config.locality_floor,
            skew_factor: config.skew_factor,
            max_children: config.max_children,
            baseline: 0,
            rebalances: 0,
        }
    }

    /// Current threshold
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Change the threshold for later lazy checks (clamped to >= 1)
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold.max(1);
    }

    /// Structural mutations since the last rebalance
    pub fn mutations_since_rebalance<T>(&self, arena: &NodeArena<T>) -> usize {
        arena.mutation_count().saturating_sub(self.baseline) as usize
    }

    /// Completed rebalances
    pub fn rebalance_count(&self) -> u64 {
        self.rebalances
    }

    /// Cheap O(1) check: has the counter reached the threshold?
    pub fn needs_rebalancing<T>(&self, arena: &NodeArena<T>) -> bool {
        let pending = self.mutations_since_rebalance(arena);
        tracing::trace!(pending, threshold = self.threshold, "lazy rebalance check");
        pending >= self.threshold
    }

    /// Full O(n) check: threshold, then locality floor, then depth skew
    pub fn due<T>(
        &self,
        arena: &NodeArena<T>,
        optimizer: &LocalityOptimizer,
    ) -> Option<RebalanceTrigger> {
        if self.needs_rebalancing(arena) {
            return Some(RebalanceTrigger::Threshold);
        }
        if arena.len() < MIN_NODES_FOR_HEURISTICS {
            return None;
        }
        if optimizer.score(arena) < self.locality_floor {
            return Some(RebalanceTrigger::Locality);
        }
        if self.is_skewed(arena) {
            return Some(RebalanceTrigger::Skew);
        }
        None
    }

    /// Depth exceeds `skew_factor` times the optimal level count
    pub fn is_skewed<T>(&self, arena: &NodeArena<T>) -> bool {
        let n = arena.len();
        if n < MIN_NODES_FOR_HEURISTICS {
            return false;
        }
        let levels = stats::level_counts(arena).len();
        let optimal = config::optimal_levels(n, self.max_children);
        levels as f64 > self.skew_factor * optimal as f64
    }

    /// Record a completed rebalance: counter back to zero
    pub fn mark_rebalanced<T>(&mut self, arena: &NodeArena<T>) {
        self.baseline = arena.mutation_count();
        self.rebalances += 1;
    }

    /// Zero the counter without counting a rebalance
    pub fn reset<T>(&mut self, arena: &NodeArena<T>) {
        self.baseline = arena.mutation_count();
    }
}
