//! Tree handle
//!
//! `Tree<T>` owns one arena and the policy/optimizer pair that keeps it
//! laid out well. Mutations go through the arena (which counts them), the
//! policy decides when a relocation is due, and codec/statistics run only
//! on demand.

mod node;
mod traversal;

pub use node::{NodeView, NodeViewMut};
pub use traversal::{LevelOrder, Postorder, Preorder};

use crate::arena::{NodeArena, NodeId};
use crate::codec::{SuccinctCodec, SuccinctEncoding};
use crate::config::TreeConfig;
use crate::locality::{LayoutOrder, LocalityOptimizer, RebalanceOutcome, StorageMode};
use crate::policy::{RebalancePolicy, RebalanceTrigger};
use crate::stats::{self, LocalityStatistics, MemoryStats, TreeStatistics};
use crate::{Result, TreeError};
use std::mem;

/// Arena-backed N-ary tree
#[derive(Debug, Clone)]
pub struct Tree<T> {
    pub(crate) arena: NodeArena<T>,
    policy: RebalancePolicy,
    optimizer: LocalityOptimizer,
    config: TreeConfig,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    /// Create empty tree with default configuration
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Create empty tree
    pub fn with_config(config: TreeConfig) -> Self {
        Self::from_arena(NodeArena::new(), config)
    }

    /// Create tree holding only `root`
    pub fn with_root(root: T) -> Self {
        Self::create(Some(root), TreeConfig::default())
    }

    /// Create tree, optionally with a root payload
    ///
    /// The mutation counter starts at zero either way.
    pub fn create(root: Option<T>, config: TreeConfig) -> Self {
        let mut arena = NodeArena::new();
        if let Some(payload) = root {
            let placed = arena.allocate(payload, None);
            debug_assert!(placed.is_ok(), "empty arena refused a root");
        }
        Self::from_arena(arena, config)
    }

    fn from_arena(arena: NodeArena<T>, config: TreeConfig) -> Self {
        let mut policy = RebalancePolicy::from_config(&config);
        policy.reset(&arena);
        Self {
            arena,
            policy,
            optimizer: LocalityOptimizer::new(config.layout),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Underlying arena (read-only)
    pub fn arena(&self) -> &NodeArena<T> {
        &self.arena
    }

    /// Number of nodes
    pub fn size(&self) -> usize {
        self.arena.len()
    }

    /// True when the tree has no root
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Longest root-to-leaf path in edges: `Some(0)` for a lone root,
    /// `None` for an empty tree
    pub fn depth(&self) -> Option<usize> {
        stats::depth(&self.arena)
    }

    /// View of the root
    pub fn root(&self) -> Result<NodeView<'_, T>> {
        let root = self.arena.root().ok_or(TreeError::EmptyTree)?;
        Ok(NodeView::new(self, root as u32))
    }

    /// Mutable view of the root
    pub fn root_mut(&mut self) -> Result<NodeViewMut<'_, T>> {
        let root = self.arena.root().ok_or(TreeError::EmptyTree)?;
        Ok(NodeViewMut::new(self, root as u32))
    }

    /// View of the node behind `id`
    pub fn node(&self, id: NodeId) -> Result<NodeView<'_, T>> {
        let slot = self.arena.resolve(id)?;
        Ok(NodeView::new(self, slot as u32))
    }

    /// Mutable view of the node behind `id`
    pub fn node_mut(&mut self, id: NodeId) -> Result<NodeViewMut<'_, T>> {
        let slot = self.arena.resolve(id)?;
        Ok(NodeViewMut::new(self, slot as u32))
    }

    /// Replace the root payload, or create the root on an empty tree
    ///
    /// Returns the previous root payload.
    pub fn set_root(&mut self, payload: T) -> Result<Option<T>> {
        match self.arena.root() {
            Some(root) => {
                let node = self.arena.get_mut(root)?;
                Ok(Some(mem::replace(&mut node.payload, payload)))
            }
            None => {
                self.arena.allocate(payload, None)?;
                self.after_mutation()?;
                Ok(None)
            }
        }
    }

    /// Append a child under `parent`
    ///
    /// If the insert triggers an automatic rebalance, `parent` goes stale
    /// when the pass moves it; the returned handle is always current.
    pub fn add_child(&mut self, parent: NodeId, payload: T) -> Result<NodeId> {
        let slot = self.arena.resolve(parent)?;
        let child = self.insert_child(slot as u32, payload)?;
        let child = match self.after_mutation()? {
            Some(outcome) => outcome.new_slot(child as usize).unwrap_or(child as usize),
            None => child as usize,
        };
        self.arena.node_id(child)
    }

    /// Remove the node behind `id` and, under [`crate::FreePolicy::Cascade`],
    /// its whole subtree
    ///
    /// Returns the removed payloads in preorder. Removing the root empties
    /// the tree.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<T>> {
        let slot = self.arena.resolve(id)?;
        let payloads = self.arena.free(slot, self.config.free_policy)?;
        self.after_mutation()?;
        Ok(payloads)
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.arena.clear();
        self.policy.reset(&self.arena);
    }

    /// Nodes in preorder
    pub fn preorder(&self) -> Preorder<'_, T> {
        Preorder::new(self, self.arena.root().map(|r| r as u32))
    }

    /// Nodes in postorder
    pub fn postorder(&self) -> Postorder<'_, T> {
        Postorder::new(self, self.arena.root().map(|r| r as u32))
    }

    /// Nodes level by level
    pub fn level_order(&self) -> LevelOrder<'_, T> {
        LevelOrder::new(self, self.arena.root().map(|r| r as u32))
    }

    /// First node in preorder whose payload satisfies `pred`
    pub fn find<P>(&self, mut pred: P) -> Option<NodeView<'_, T>>
    where
        P: FnMut(&T) -> bool,
    {
        self.preorder().find(|node| pred(node.data()))
    }

    // ---- Lazy rebalancing ----

    /// Cheap check: counter has reached the threshold
    pub fn needs_rebalancing(&self) -> bool {
        self.policy.needs_rebalancing(&self.arena)
    }

    /// O(n) check including the locality floor and depth skew
    pub fn rebalance_due(&self) -> Option<RebalanceTrigger> {
        self.policy.due(&self.arena, &self.optimizer)
    }

    /// Structural mutations since the last rebalance
    pub fn mutations_since_rebalance(&self) -> usize {
        self.policy.mutations_since_rebalance(&self.arena)
    }

    /// Rebalances run so far
    pub fn rebalance_count(&self) -> u64 {
        self.policy.rebalance_count()
    }

    /// Current lazy threshold
    pub fn rebalance_threshold(&self) -> usize {
        self.policy.threshold()
    }

    /// Rebalance if the counter is due; returns whether it ran
    ///
    /// Relocation invalidates outstanding [`NodeId`]s of nodes that moved.
    pub fn auto_balance_if_needed(&mut self) -> Result<bool> {
        if !self.policy.needs_rebalancing(&self.arena) {
            return Ok(false);
        }
        self.run_rebalance(RebalanceTrigger::Threshold)?;
        Ok(true)
    }

    /// Rebalance now and use `threshold` for later lazy checks
    pub fn balance_tree(&mut self, threshold: usize) -> Result<RebalanceOutcome> {
        self.policy.set_threshold(threshold);
        self.config.rebalance_threshold = self.policy.threshold();
        self.run_rebalance(RebalanceTrigger::Forced)
    }

    // ---- Locality ----

    /// Switch to packed array storage (one way)
    ///
    /// The switch compacts immediately and counts as a rebalance. Returns
    /// `false` if it was already on.
    pub fn enable_array_storage(&mut self) -> Result<bool> {
        match self.optimizer.enable_array_storage(&mut self.arena)? {
            Some(_) => {
                self.policy.mark_rebalanced(&self.arena);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Current storage mode
    pub fn storage_mode(&self) -> StorageMode {
        self.optimizer.mode()
    }

    /// Locality score of the current layout, in [0, 1]
    pub fn calculate_locality_score(&self) -> f64 {
        self.optimizer.score(&self.arena)
    }

    /// Relocate slots into layout order now
    pub fn rebalance_for_locality(&mut self) -> Result<RebalanceOutcome> {
        self.run_rebalance(RebalanceTrigger::Forced)
    }

    /// Rebuild into an evenly split shape with at most `max_children`
    /// children per node
    ///
    /// Unlike a locality rebalance this changes the shape: payloads are
    /// taken in level order, the first becomes the root and the rest are
    /// divided into `max_children` near-equal runs, one per child subtree.
    pub fn rebuild_balanced(&mut self, max_children: usize) -> Result<()> {
        if self.arena.len() <= 1 {
            return Ok(());
        }
        let max_children = max_children.max(2);
        let order = LayoutOrder::BreadthFirst.visit(&self.arena);
        let mut payloads: Vec<Option<T>> = self
            .arena
            .drain_order(&order)
            .into_iter()
            .map(Some)
            .collect();
        build_balanced(&mut self.arena, &mut payloads, None, max_children)?;
        self.run_rebalance(RebalanceTrigger::Skew)?;
        Ok(())
    }

    // ---- Statistics ----

    /// Size, depth and per-level counts
    pub fn statistics(&self) -> TreeStatistics {
        stats::tree_statistics(&self.arena, self.policy.rebalance_count())
    }

    /// Arena bytes versus payload bytes
    pub fn memory_stats(&self) -> MemoryStats {
        stats::memory_stats(&self.arena)
    }

    /// Locality score, compression ratio and cache-line efficiency
    pub fn locality_statistics(&self) -> LocalityStatistics {
        stats::locality_statistics(&self.arena, &self.optimizer, self.config.cache_line_bytes)
    }

    // ---- Codec ----

    /// Encode shape and payloads
    pub fn encode_succinct(&self) -> SuccinctEncoding<T>
    where
        T: Clone,
    {
        SuccinctCodec::encode(&self.arena)
    }

    /// Encode shape, converting payloads with `f`
    pub fn encode_succinct_with<U, F>(&self, f: F) -> SuccinctEncoding<U>
    where
        F: FnMut(&T) -> U,
    {
        SuccinctCodec::encode_with(&self.arena, f)
    }

    /// Build a new tree from an encoding
    pub fn decode_succinct(encoding: SuccinctEncoding<T>) -> Result<Self> {
        Self::decode_succinct_with_config(encoding, TreeConfig::default())
    }

    /// Build a new tree from an encoding with `config`
    pub fn decode_succinct_with_config(
        encoding: SuccinctEncoding<T>,
        config: TreeConfig,
    ) -> Result<Self> {
        let arena = SuccinctCodec::decode(encoding)?;
        Ok(Self::from_arena(arena, config))
    }

    // ---- Internals shared with views ----
    //
    // Views hold raw slots, so nothing reachable from a view may relocate.
    // Mutations made through views are counted; with `auto_rebalance` the
    // pending pass runs on the next tree-level mutation.

    pub(crate) fn insert_child(&mut self, parent: u32, payload: T) -> Result<u32> {
        Ok(self.arena.allocate(payload, Some(parent as usize))? as u32)
    }

    pub(crate) fn remove_child_of(&mut self, parent: u32, index: usize) -> Result<Vec<T>> {
        let siblings = &self.arena.live(parent).children;
        let child = *siblings.get(index).ok_or(TreeError::ChildIndex {
            index,
            len: siblings.len(),
        })?;
        self.arena.free(child as usize, self.config.free_policy)
    }

    fn after_mutation(&mut self) -> Result<Option<RebalanceOutcome>> {
        if self.config.auto_rebalance && self.policy.needs_rebalancing(&self.arena) {
            return self.run_rebalance(RebalanceTrigger::Threshold).map(Some);
        }
        Ok(None)
    }

    fn run_rebalance(&mut self, trigger: RebalanceTrigger) -> Result<RebalanceOutcome> {
        let pending = self.policy.mutations_since_rebalance(&self.arena);
        let outcome = self.optimizer.rebalance(&mut self.arena)?;
        self.policy.mark_rebalanced(&self.arena);
        tracing::debug!(
            %trigger,
            pending,
            nodes = self.arena.len(),
            moved = outcome.moved,
            score_before = outcome.score_before,
            score_after = outcome.score_after,
            "rebalance complete"
        );
        Ok(outcome)
    }
}

/// Lay `data[0]` down as a node and split the rest evenly among at most
/// `max_children` child subtrees
fn build_balanced<T>(
    arena: &mut NodeArena<T>,
    data: &mut [Option<T>],
    parent: Option<usize>,
    max_children: usize,
) -> Result<()> {
    let Some((first, rest)) = data.split_first_mut() else {
        return Ok(());
    };
    let Some(payload) = first.take() else {
        return Ok(());
    };
    let node = arena.allocate(payload, parent)?;
    if rest.is_empty() {
        return Ok(());
    }

    let groups = rest.len().min(max_children);
    let base = rest.len() / groups;
    let extra = rest.len() % groups;
    let mut remaining = rest;
    for i in 0..groups {
        let size = base + usize::from(i < extra);
        let (head, tail) = mem::take(&mut remaining).split_at_mut(size);
        build_balanced(arena, head, Some(node), max_children)?;
        remaining = tail;
    }
    Ok(())
}
