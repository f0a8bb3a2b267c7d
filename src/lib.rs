//! # Succinct N-ary Tree Engine
//!
//! An arbitrary-branching tree stored in a contiguous slot arena, with a
//! balanced-parentheses codec and lazy, locality-driven rebalancing.
//!
//! ## Core Design
//!
//! 1. **Arena storage**: nodes live in one `Vec` of slots addressed by `u32`
//!    indices; a freelist recycles slots released by deletions
//! 2. **Succinct codec**: shape is 2n+1 bits (open on entry, close on exit,
//!    one trailing sentinel) plus payloads in depth-first order
//! 3. **Locality optimizer**: scores how far slot order drifts from traversal
//!    order and relocates slots back into traversal order
//! 4. **Lazy policy**: relocation is O(n), so it only runs once a batch of
//!    mutations has accumulated (default 100)
//!
//! Deferring the O(n) pass over k mutations amortizes it to O(n/k) per edit.
//!
//! ## Usage Example
//!
//! ```
//! use narytree::Tree;
//!
//! let mut tree = Tree::with_root("root");
//! let mut root = tree.root_mut()?;
//! let mut docs = root.add_child("docs")?;
//! docs.add_child("readme")?;
//! root.add_child("src")?;
//!
//! assert_eq!(tree.size(), 4);
//! assert_eq!(tree.depth(), Some(2));
//!
//! let encoding = tree.encode_succinct();
//! let copy = Tree::decode_succinct(encoding)?;
//! assert_eq!(copy.root()?.data(), &"root");
//! # Ok::<(), narytree::TreeError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod arena;     // Slot arena and freelist
pub mod codec;     // Balanced-parentheses encoding
pub mod config;    // Tree configuration
pub mod locality;  // Locality scoring and slot relocation
pub mod policy;    // Lazy rebalancing trigger
pub mod stats;     // Derived metric records
pub mod tree;      // Tree handle and node views

// Re-exports for convenience
pub use arena::{FreePolicy, NodeArena, NodeId, Slot};
pub use codec::{SuccinctCodec, SuccinctEncoding};
pub use config::TreeConfig;
pub use locality::{LayoutOrder, LocalityOptimizer, RebalanceOutcome, StorageMode};
pub use policy::{RebalancePolicy, RebalanceTrigger};
pub use stats::{LocalityStatistics, MemoryStats, TreeStatistics};
pub use tree::{LevelOrder, NodeView, NodeViewMut, Postorder, Preorder, Tree};

use thiserror::Error;

/// Coarse classification of a [`TreeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid structural mutation
    Structural,
    /// Out-of-range child index or a handle to a slot that moved or was freed
    Index,
    /// Malformed succinct encoding
    Format,
    /// Operation not valid in the tree's current state
    State,
}

/// Errors reported by tree operations
///
/// A failed operation never leaves a partial mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Slot is not active (never allocated, or already freed)
    #[error("slot {slot} is not an active node")]
    InactiveSlot {
        /// Offending slot index
        slot: usize,
    },

    /// Non-leaf free rejected by [`FreePolicy::RejectNonLeaf`]
    #[error("slot {slot} still has {children} children and the free policy rejects non-leaf frees")]
    NonLeafFree {
        /// Slot that was to be freed
        slot: usize,
        /// Number of children still attached
        children: usize,
    },

    /// A second parentless node was requested
    #[error("tree already has a root")]
    RootAlreadyPresent,

    /// Arena cannot address any more slots
    #[error("arena exhausted: {0} slots is the maximum")]
    CapacityExhausted(usize),

    /// Relocation order is not a permutation of the active slots
    #[error("relocation order covers {got} slots but {expected} are active")]
    InvalidRelocation {
        /// Active slot count
        expected: usize,
        /// Distinct active slots named by the order
        got: usize,
    },

    /// Child index out of range
    #[error("child index {index} out of range for node with {len} children")]
    ChildIndex {
        /// Requested index
        index: usize,
        /// Number of children
        len: usize,
    },

    /// Node handle refers to a slot that was freed or relocated
    #[error("stale node handle for slot {slot}")]
    StaleNode {
        /// Slot named by the handle
        slot: usize,
    },

    /// Close bit with no matching open, or an unclosed node at the end
    #[error("unbalanced structure bits at position {position}")]
    Unbalanced {
        /// Bit position where the imbalance was detected
        position: usize,
    },

    /// Bit count does not equal 2 * payloads + 1
    #[error("structure has {bits} bits but {payloads} payloads need {} bits", .payloads * 2 + 1)]
    LengthMismatch {
        /// Bit length found
        bits: usize,
        /// Payload count found
        payloads: usize,
    },

    /// Trailing sentinel bit is absent or set
    #[error("structure bits do not end with the sentinel close bit")]
    MissingSentinel,

    /// A second top-level node opens after the root closed
    #[error("second root opens at bit {position}")]
    MultipleRoots {
        /// Bit position of the second root
        position: usize,
    },

    /// Wire buffer shorter than its header claims
    #[error("wire buffer truncated: need {needed} bytes, got {got}")]
    TruncatedWire {
        /// Bytes required
        needed: usize,
        /// Bytes available
        got: usize,
    },

    /// Wire buffer does not start with the structure magic
    #[error("wire buffer is not a succinct structure (bad magic)")]
    BadMagic,

    /// Operation requires a root but the tree is empty
    #[error("tree is empty")]
    EmptyTree,

    /// Wire buffer written by an incompatible format version
    #[error("unsupported structure format version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version byte found
        found: u8,
        /// Version this build reads
        supported: u8,
    },
}

impl TreeError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeError::InactiveSlot { .. }
            | TreeError::NonLeafFree { .. }
            | TreeError::RootAlreadyPresent
            | TreeError::CapacityExhausted(_)
            | TreeError::InvalidRelocation { .. } => ErrorKind::Structural,
            TreeError::ChildIndex { .. } | TreeError::StaleNode { .. } => ErrorKind::Index,
            TreeError::Unbalanced { .. }
            | TreeError::LengthMismatch { .. }
            | TreeError::MissingSentinel
            | TreeError::MultipleRoots { .. }
            | TreeError::TruncatedWire { .. }
            | TreeError::BadMagic => ErrorKind::Format,
            TreeError::EmptyTree | TreeError::UnsupportedVersion { .. } => ErrorKind::State,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(TreeError::EmptyTree.kind(), ErrorKind::State);
        assert_eq!(TreeError::ChildIndex { index: 3, len: 0 }.kind(), ErrorKind::Index);
        assert_eq!(TreeError::MissingSentinel.kind(), ErrorKind::Format);
        assert_eq!(TreeError::RootAlreadyPresent.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_length_mismatch_message() {
        let err = TreeError::LengthMismatch { bits: 4, payloads: 2 };
        assert_eq!(
            err.to_string(),
            "structure has 4 bits but 2 payloads need 5 bits"
        );
    }
}
