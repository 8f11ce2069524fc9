//! Opaque transaction envelope.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transaction as seen by the block lifecycle core.
///
/// The payload is opaque: validation and execution semantics belong to the
/// pluggable transaction system. The core only appends transactions to
/// blocks and routes them between channels, keyed by their content hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    payload: Vec<u8>,
    hash: Hash,
}

impl Transaction {
    /// Create a transaction from its serialized payload.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let hash = Hash::digest(&[&payload]);
        Transaction { payload, hash }
    }

    /// The opaque payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Content hash of the payload.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// An empty payload is rejected at the submission boundary.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("hash", &self.hash)
            .field("len", &self.payload.len())
            .finish()
    }
}
