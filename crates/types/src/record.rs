//! Commitment record types.
//!
//! These are the per-partition value objects the root aggregates each round:
//! the static description of a partition (registered once at genesis) and
//! the per-round input record claiming a state transition.

use crate::Hash;
use serde::{Deserialize, Serialize};

/// Opaque serialized descriptor of a partition's configuration.
///
/// Created at partition-genesis time and never mutated afterwards. The core
/// only looks the record up and feeds its serialization into the unicity
/// tree leaf digest; the contents are owned by the transaction system.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SystemDescriptionRecord {
    data: Vec<u8>,
}

impl SystemDescriptionRecord {
    /// Wrap a serialized descriptor.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        SystemDescriptionRecord { data: data.into() }
    }

    /// The descriptor bytes, hashed as-is.
    pub fn serialize(&self) -> &[u8] {
        &self.data
    }

    /// An empty descriptor is invalid for certification.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A partition's per-round certification claim.
///
/// Created fresh each round by the partition, consumed exactly once by the
/// unicity tree builder for that round, then superseded by the next round's
/// record.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SystemInputRecord {
    /// Root hash certified in the previous round ([`Hash::ZERO`] before the
    /// first certification).
    pub prev_root_hash: Hash,
    /// Root hash to be certified this round.
    pub root_hash: Hash,
    /// Summary value to be certified alongside the root hash.
    pub summary_value: Vec<u8>,
}

impl SystemInputRecord {
    pub fn new(prev_root_hash: Hash, root_hash: Hash, summary_value: impl Into<Vec<u8>>) -> Self {
        SystemInputRecord {
            prev_root_hash,
            root_hash,
            summary_value: summary_value.into(),
        }
    }

    /// Deterministic serialization: prev-root-hash ‖ new-root-hash ‖
    /// summary-value, in that fixed order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(Hash::LENGTH * 2 + self.summary_value.len());
        out.extend_from_slice(self.prev_root_hash.as_bytes());
        out.extend_from_slice(self.root_hash.as_bytes());
        out.extend_from_slice(&self.summary_value);
        out
    }
}
