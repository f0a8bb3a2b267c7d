//! Tree configuration

use crate::arena::FreePolicy;
use crate::locality::LayoutOrder;

/// Default mutations between lazy rebalances
pub const DEFAULT_REBALANCE_THRESHOLD: usize = 100;

/// Default locality score below which a thorough check asks for a rebalance
pub const DEFAULT_LOCALITY_FLOOR: f64 = 0.7;

/// Default cache line size in bytes
pub const DEFAULT_CACHE_LINE_BYTES: usize = 64;

/// Configuration parameters for a [`crate::Tree`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeConfig {
    /// Structural mutations that make a rebalance due (clamped to >= 1)
    pub rebalance_threshold: usize,

    /// Thorough check: locality score below this is due
    pub locality_floor: f64,

    /// Thorough check: levels above `skew_factor` x optimal levels is due
    pub skew_factor: f64,

    /// Branching factor for optimal depth and [`crate::Tree::rebuild_balanced`]
    pub max_children: usize,

    /// Slot order rebalancing produces
    pub layout: LayoutOrder,

    /// What freeing a non-leaf does
    pub free_policy: FreePolicy,

    /// Cache line size used for cache-line efficiency
    pub cache_line_bytes: usize,

    /// Run the lazy check after every mutation
    pub auto_rebalance: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            rebalance_threshold: DEFAULT_REBALANCE_THRESHOLD,
            locality_floor: DEFAULT_LOCALITY_FLOOR,
            skew_factor: 2.0,
            max_children: 3,
            layout: LayoutOrder::DepthFirst,
            free_policy: FreePolicy::Cascade,
            cache_line_bytes: DEFAULT_CACHE_LINE_BYTES,
            auto_rebalance: false,
        }
    }
}

impl TreeConfig {
    /// Set the lazy rebalance threshold
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.rebalance_threshold = threshold.max(1);
        self
    }

    /// Set the locality floor
    pub fn with_locality_floor(mut self, floor: f64) -> Self {
        self.locality_floor = floor.clamp(0.0, 1.0);
        self
    }

    /// Set the depth skew factor
    pub fn with_skew_factor(mut self, factor: f64) -> Self {
        self.skew_factor = factor;
        self
    }

    /// Set the branching factor
    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children.max(1);
        self
    }

    /// Set the layout order
    pub fn with_layout(mut self, layout: LayoutOrder) -> Self {
        self.layout = layout;
        self
    }

    /// Set the free policy
    pub fn with_free_policy(mut self, policy: FreePolicy) -> Self {
        self.free_policy = policy;
        self
    }

    /// Set the cache line size
    pub fn with_cache_line_bytes(mut self, bytes: usize) -> Self {
        self.cache_line_bytes = bytes.max(1);
        self
    }

    /// Rebalance lazily after every mutation
    pub fn with_auto_rebalance(mut self, enabled: bool) -> Self {
        self.auto_rebalance = enabled;
        self
    }

    /// Optimal number of levels for `n` nodes at this branching factor
    pub fn optimal_levels(&self, n: usize) -> usize {
        optimal_levels(n, self.max_children)
    }
}

/// floor(log_b(n)) + 1, computed as the digit count of `n` in base `b`
pub fn optimal_levels(n: usize, branching: usize) -> usize {
    let branching = branching.max(2);
    let mut levels = 0;
    let mut rest = n;
    while rest > 0 {
        rest /= branching;
        levels += 1;
    }
    levels
}
