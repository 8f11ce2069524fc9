//! Unicity tree hashing primitives and inclusion proofs.
//!
//! The tree itself is built on the root side (`unicity-root`), but proof
//! verification has to run on partitions, which only depend on this crate.
//! Keeping the path/leaf/node hashing rules here means both sides share a
//! single definition and cannot drift apart.

use crate::{Hash, PartitionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Depth of the sparse unicity tree: one level per bit of the key path.
pub const TREE_DEPTH: usize = Hash::LENGTH * 8;

/// Tree path for a partition identifier.
///
/// The raw identifier bytes are the leaf key; hashing them spreads keys of
/// any length uniformly over the 256-bit key space.
pub fn key_path(id: &PartitionId) -> Hash {
    Hash::digest(&[id.as_bytes()])
}

/// Leaf node hash. Domain-separated from internal nodes so a leaf can never
/// be reinterpreted as an internal node.
pub fn leaf_hash(path: &Hash, value: &Hash) -> Hash {
    Hash::digest(&[&[0x00], path.as_bytes(), value.as_bytes()])
}

/// Internal node hash over the two child subtree hashes.
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    Hash::digest(&[&[0x01], left.as_bytes(), right.as_bytes()])
}

/// Bit of `path` at `depth`, counting from the most significant bit of the
/// first byte. `false` selects the left child.
pub fn path_bit(path: &Hash, depth: usize) -> bool {
    let byte = path.as_bytes()[depth / 8];
    (byte >> (7 - (depth % 8))) & 1 == 1
}

/// Errors from inclusion proof verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    #[error("proof has {got} siblings, expected {expected}")]
    WrongLength { expected: usize, got: usize },
    #[error("recomputed root {computed} does not match {expected}")]
    RootMismatch { computed: Hash, expected: Hash },
}

/// Merkle inclusion proof for one partition's leaf.
///
/// `siblings[d]` is the hash of the subtree passed at depth `d` while
/// descending from the root towards the leaf.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct InclusionProof {
    siblings: Vec<Hash>,
}

impl InclusionProof {
    /// Build a proof from root-to-leaf sibling hashes.
    pub fn new(siblings: Vec<Hash>) -> Self {
        InclusionProof { siblings }
    }

    /// Recompute the root from the leaf value and check it against
    /// `expected_root`.
    pub fn verify(
        &self,
        id: &PartitionId,
        leaf_value: Hash,
        expected_root: Hash,
    ) -> Result<(), ProofError> {
        if self.siblings.len() != TREE_DEPTH {
            return Err(ProofError::WrongLength {
                expected: TREE_DEPTH,
                got: self.siblings.len(),
            });
        }
        let path = key_path(id);
        let mut acc = leaf_hash(&path, &leaf_value);
        for depth in (0..TREE_DEPTH).rev() {
            let sibling = &self.siblings[depth];
            acc = if path_bit(&path, depth) {
                node_hash(sibling, &acc)
            } else {
                node_hash(&acc, sibling)
            };
        }
        if acc != expected_root {
            return Err(ProofError::RootMismatch {
                computed: acc,
                expected: expected_root,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_bit_walks_msb_first() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0b1010_0000;
        bytes[1] = 0b0000_0001;
        let path = Hash::from_bytes(bytes);

        assert!(path_bit(&path, 0));
        assert!(!path_bit(&path, 1));
        assert!(path_bit(&path, 2));
        assert!(path_bit(&path, 15));
        assert!(!path_bit(&path, 16));
    }

    #[test]
    fn leaf_and_node_domains_differ() {
        let a = Hash::digest(&[b"a"]);
        let b = Hash::digest(&[b"b"]);
        assert_ne!(leaf_hash(&a, &b), node_hash(&a, &b));
    }

    #[test]
    fn verify_rejects_short_proof() {
        let proof = InclusionProof::new(vec![Hash::ZERO; 3]);
        let id = PartitionId::new(vec![1]);
        assert_eq!(
            proof.verify(&id, Hash::ZERO, Hash::ZERO),
            Err(ProofError::WrongLength {
                expected: TREE_DEPTH,
                got: 3
            })
        );
    }
}
