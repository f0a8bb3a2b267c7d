//! Succinct structural codec
//!
//! Shape is a balanced-parentheses bit string built by one depth-first walk:
//! `1` on entering a node, `0` on leaving it, then one sentinel `0`.
//! n nodes take exactly 2n+1 bits. Payloads are copied into a parallel
//! array at entry time, so the array is in preorder.
//!
//! ```text
//!         root            1 1 1 0 1 0 0 1 0 0 | 0
//!        /    \           ^ ^ ^   ^     ^       sentinel
//!       a      b          r a a1  a2    b
//!      / \
//!    a1   a2
//! ```
//!
//! The bit string alone determines shape; payloads never influence it.

pub mod wire;

use crate::arena::NodeArena;
use crate::{Result, TreeError};
use bitvec::prelude::*;
use std::fmt;
use std::mem;

/// Bit storage used for structure strings
pub type StructureBits = BitVec<u8, Lsb0>;

/// Pointer-tree estimate: parent, first-child and next-sibling pointers
const POINTERS_PER_NODE: usize = 3;

/// Pointer-tree estimate: allocator header and padding per node
const NODE_HEADER_BYTES: usize = 16;

/// Encoded tree: structure bits plus preorder payloads
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuccinctEncoding<T> {
    structure_bits: StructureBits,
    payloads: Vec<T>,
}

impl<T> SuccinctEncoding<T> {
    /// Assemble an encoding from parts
    ///
    /// Nothing is checked until [`SuccinctEncoding::validate`] or decode.
    pub fn new(structure_bits: StructureBits, payloads: Vec<T>) -> Self {
        Self {
            structure_bits,
            payloads,
        }
    }

    /// Rebuild an encoding from [`wire`] bytes and a payload array
    pub fn from_structure_bytes(bytes: &[u8], payloads: Vec<T>) -> Result<Self> {
        let structure_bits = wire::read_structure(bytes)?;
        let encoding = Self::new(structure_bits, payloads);
        encoding.validate()?;
        Ok(encoding)
    }

    /// Structure bits, sentinel included
    pub fn structure_bits(&self) -> &BitSlice<u8, Lsb0> {
        &self.structure_bits
    }

    /// Payloads in preorder
    pub fn payloads(&self) -> &[T] {
        &self.payloads
    }

    /// Split into bits and payloads
    pub fn into_parts(self) -> (StructureBits, Vec<T>) {
        (self.structure_bits, self.payloads)
    }

    /// Number of encoded nodes
    pub fn node_count(&self) -> usize {
        self.payloads.len()
    }

    /// Check bracket balance, sentinel and payload count
    pub fn validate(&self) -> Result<()> {
        SuccinctCodec::validate(&self.structure_bits, self.payloads.len())
    }

    /// Convert payloads while keeping the shape
    pub fn map_payloads<U, F>(self, f: F) -> SuccinctEncoding<U>
    where
        F: FnMut(T) -> U,
    {
        SuccinctEncoding {
            structure_bits: self.structure_bits,
            payloads: self.payloads.into_iter().map(f).collect(),
        }
    }

    /// Structure bits in the versioned byte layout
    pub fn structure_to_bytes(&self) -> Vec<u8> {
        wire::write_structure(&self.structure_bits)
    }

    /// blake3 digest of the structure bytes
    ///
    /// Equal shapes give equal fingerprints regardless of payloads.
    pub fn fingerprint(&self) -> blake3::Hash {
        blake3::hash(&self.structure_to_bytes())
    }

    /// Bytes used by packed bits plus payload storage
    pub fn memory_usage(&self) -> usize {
        self.structure_bits.len().div_ceil(8) + self.payloads.len() * mem::size_of::<T>()
    }

    /// Encoded size relative to a pointer-based node layout
    ///
    /// Below 1.0 means the encoding is smaller. An empty tree reports 1.0.
    pub fn compression_ratio(&self) -> f64 {
        compression_ratio::<T>(self.payloads.len())
    }
}

impl<T> fmt::Display for SuccinctEncoding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.structure_bits.iter().by_vals() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Succinct size over pointer-tree size for `n` nodes of `T`
pub(crate) fn compression_ratio<T>(n: usize) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let payload = mem::size_of::<T>();
    let succinct = (2 * n + 1).div_ceil(8) + n * payload;
    let pointer_tree =
        n * (POINTERS_PER_NODE * mem::size_of::<usize>() + payload + NODE_HEADER_BYTES);
    succinct as f64 / pointer_tree as f64
}

/// Encoder/decoder between [`NodeArena`] and [`SuccinctEncoding`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccinctCodec;

impl SuccinctCodec {
    /// Encode the arena's tree, cloning payloads
    pub fn encode<T: Clone>(arena: &NodeArena<T>) -> SuccinctEncoding<T> {
        Self::encode_with(arena, T::clone)
    }

    /// Encode the arena's tree, converting each payload with `f`
    ///
    /// `f` is called once per node in preorder. Children are visited in
    /// sibling order, so the output is deterministic.
    pub fn encode_with<T, U, F>(arena: &NodeArena<T>, mut f: F) -> SuccinctEncoding<U>
    where
        F: FnMut(&T) -> U,
    {
        let n = arena.len();
        let mut bits = StructureBits::with_capacity(2 * n + 1);
        let mut payloads = Vec::with_capacity(n);

        if let Some(root) = arena.root() {
            let root = root as u32;
            bits.push(true);
            payloads.push(f(&arena.live(root).payload));

            // (slot, next child to visit)
            let mut stack: Vec<(u32, usize)> = vec![(root, 0)];
            while let Some(top) = stack.last_mut() {
                let (slot, cursor) = *top;
                match arena.live(slot).children.get(cursor) {
                    Some(&child) => {
                        top.1 += 1;
                        bits.push(true);
                        payloads.push(f(&arena.live(child).payload));
                        stack.push((child, 0));
                    }
                    None => {
                        bits.push(false);
                        stack.pop();
                    }
                }
            }
        }

        bits.push(false);
        SuccinctEncoding::new(bits, payloads)
    }

    /// Rebuild an arena from an encoding
    ///
    /// Slots come out in preorder. The encoding is fully validated before
    /// anything is allocated.
    pub fn decode<T>(encoding: SuccinctEncoding<T>) -> Result<NodeArena<T>> {
        if let Err(err) = encoding.validate() {
            tracing::debug!(error = %err, "rejecting succinct encoding");
            return Err(err);
        }

        let (bits, payloads) = encoding.into_parts();
        let body = &bits[..bits.len() - 1];
        let mut arena = NodeArena::with_capacity(payloads.len());
        let mut payloads = payloads.into_iter();
        let mut parents: Vec<usize> = Vec::new();

        for bit in body.iter().by_vals() {
            if bit {
                let payload = payloads.next().ok_or(TreeError::LengthMismatch {
                    bits: bits.len(),
                    payloads: arena.len(),
                })?;
                let slot = arena.allocate(payload, parents.last().copied())?;
                parents.push(slot);
            } else {
                parents.pop();
            }
        }

        Ok(arena)
    }

    /// Check that `bits` is a single balanced tree of `payloads` nodes
    /// followed by the sentinel
    pub fn validate(bits: &BitSlice<u8, Lsb0>, payloads: usize) -> Result<()> {
        if bits.len() != 2 * payloads + 1 {
            return Err(TreeError::LengthMismatch {
                bits: bits.len(),
                payloads,
            });
        }
        let (sentinel, body) = match bits.split_last() {
            Some((sentinel, body)) => (*sentinel, body),
            None => return Err(TreeError::MissingSentinel),
        };
        if sentinel {
            return Err(TreeError::MissingSentinel);
        }

        let mut depth = 0usize;
        for (position, bit) in body.iter().by_vals().enumerate() {
            if bit {
                if depth == 0 && position > 0 {
                    return Err(TreeError::MultipleRoots { position });
                }
                depth += 1;
            } else {
                depth = depth
                    .checked_sub(1)
                    .ok_or(TreeError::Unbalanced { position })?;
            }
        }

        if depth != 0 {
            return Err(TreeError::Unbalanced {
                position: body.len(),
            });
        }
        Ok(())
    }
}
