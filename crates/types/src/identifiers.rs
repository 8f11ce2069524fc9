//! Partition identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque byte string uniquely naming a partition.
///
/// Used as a map key on the root side and as the leaf key of the unicity
/// tree. The root's registration order of identifiers is significant: it is
/// the canonical iteration order for tree construction and must match on
/// every node computing the same round's root hash.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId(Vec<u8>);

impl PartitionId {
    /// Wrap raw identifier bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        PartitionId(bytes.into())
    }

    /// Borrow the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check whether the identifier is empty (invalid for registration).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl From<&[u8]> for PartitionId {
    fn from(bytes: &[u8]) -> Self {
        PartitionId(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_hex() {
        let id = PartitionId::new(vec![0x01, 0xab]);
        assert_eq!(id.to_string(), "0x01ab");
    }

    #[test]
    fn empty_is_detected() {
        assert!(PartitionId::new(Vec::new()).is_empty());
        assert!(!PartitionId::new(vec![1]).is_empty());
    }
}
