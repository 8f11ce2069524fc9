//! Root state and per-round certification.

use crate::tree::{UnicityTree, UnicityTreeError};
use std::collections::HashMap;
use thiserror::Error;
use unicity_types::{
    Hash, PartitionId, SystemDescriptionRecord, SystemInputRecord, UnicityCertificate,
};

/// Errors from mutating the root state outside a certification round.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RootStateError {
    #[error("partition {0} is already registered")]
    AlreadyRegistered(PartitionId),
    #[error("empty partition identifier")]
    EmptyIdentifier,
    #[error("empty system description record for partition {0}")]
    EmptyDescription(PartitionId),
}

/// Errors failing a certification round.
///
/// A failed round leaves the state untouched: the round number does not
/// advance and no per-partition hash is updated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertificationError {
    #[error("no input record submitted for partition {0}")]
    MissingInput(PartitionId),
    #[error(
        "partition {id} extends {claimed} but the last certified root hash is {certified}"
    )]
    PreviousHashMismatch {
        id: PartitionId,
        claimed: Hash,
        certified: Hash,
    },
    #[error(transparent)]
    Tree(#[from] UnicityTreeError),
}

/// Outcome of one successful certification round.
#[derive(Debug, Clone)]
pub struct RoundCertification {
    /// The round that was certified.
    pub round_number: u64,
    /// The round's unicity tree root.
    pub unicity_root: Hash,
    /// One certificate per registered partition.
    pub certificates: HashMap<PartitionId, UnicityCertificate>,
}

/// The root component's authoritative view.
///
/// Holds the monotonic round number, the opaque trust base, the ordered set
/// of registered partition identifiers and the last certified root hash per
/// partition. Registration order is the canonical tree iteration order and
/// must be identical on every node computing the same round.
#[derive(Debug)]
pub struct RootState {
    round_number: u64,
    trust_base: Vec<u8>,
    /// Registered identifiers in registration order. All hashing iterates
    /// this sequence, never the unordered maps below.
    partition_ids: Vec<PartitionId>,
    descriptions: HashMap<PartitionId, SystemDescriptionRecord>,
    /// Last certified root hash per partition; absent until first certified.
    root_hashes: HashMap<PartitionId, Hash>,
}

impl RootState {
    /// Create an empty root state around the given trust base.
    pub fn new(trust_base: impl Into<Vec<u8>>) -> Self {
        RootState {
            round_number: 0,
            trust_base: trust_base.into(),
            partition_ids: Vec::new(),
            descriptions: HashMap::new(),
            root_hashes: HashMap::new(),
        }
    }

    /// The last certified round number (0 before any round).
    pub fn round_number(&self) -> u64 {
        self.round_number
    }

    /// The opaque trust base; read-only to the core.
    pub fn trust_base(&self) -> &[u8] {
        &self.trust_base
    }

    /// Registered identifiers in registration order.
    pub fn partition_ids(&self) -> &[PartitionId] {
        &self.partition_ids
    }

    /// Last certified root hash of a partition, if any round certified it.
    pub fn certified_root_hash(&self, id: &PartitionId) -> Option<Hash> {
        self.root_hashes.get(id).copied()
    }

    /// Register a partition at genesis time.
    ///
    /// The description record is immutable once registered; registration
    /// order defines the tree iteration order.
    pub fn register(
        &mut self,
        id: PartitionId,
        description: SystemDescriptionRecord,
    ) -> Result<(), RootStateError> {
        if id.is_empty() {
            return Err(RootStateError::EmptyIdentifier);
        }
        if description.is_empty() {
            return Err(RootStateError::EmptyDescription(id));
        }
        if self.descriptions.contains_key(&id) {
            return Err(RootStateError::AlreadyRegistered(id));
        }
        self.partition_ids.push(id.clone());
        self.descriptions.insert(id, description);
        Ok(())
    }

    /// Run one certification round over the submitted input records.
    ///
    /// Every registered partition must have submitted an input whose
    /// previous-root-hash matches the last certified hash ([`Hash::ZERO`]
    /// before the first round). On success the round number advances exactly
    /// once, the per-partition hashes are stored, and a certificate is
    /// issued to every partition.
    pub fn certify_round(
        &mut self,
        inputs: &HashMap<PartitionId, SystemInputRecord>,
    ) -> Result<RoundCertification, CertificationError> {
        // Validate continuity before touching any state.
        for id in &self.partition_ids {
            let input = inputs
                .get(id)
                .ok_or_else(|| CertificationError::MissingInput(id.clone()))?;
            let certified = self.root_hashes.get(id).copied().unwrap_or(Hash::ZERO);
            if input.prev_root_hash != certified {
                tracing::warn!(
                    partition = %id,
                    claimed = %input.prev_root_hash,
                    certified = %certified,
                    "rejecting input record with stale previous root hash"
                );
                return Err(CertificationError::PreviousHashMismatch {
                    id: id.clone(),
                    claimed: input.prev_root_hash,
                    certified,
                });
            }
        }

        let tree = UnicityTree::build(&self.partition_ids, &self.descriptions, inputs)?;
        let unicity_root = tree.root_hash();
        let round_number = self.round_number + 1;

        let mut certificates = HashMap::with_capacity(self.partition_ids.len());
        for id in &self.partition_ids {
            let input = &inputs[id];
            let proof = tree.prove(id)?;
            certificates.insert(
                id.clone(),
                UnicityCertificate {
                    partition_id: id.clone(),
                    input_record: input.clone(),
                    unicity_proof: proof,
                    unicity_root,
                    round_number,
                },
            );
        }

        // Commit the round only after every certificate was produced.
        self.round_number = round_number;
        for id in &self.partition_ids {
            self.root_hashes.insert(id.clone(), inputs[id].root_hash);
        }
        tracing::info!(
            round = round_number,
            unicity_root = %unicity_root,
            partitions = self.partition_ids.len(),
            "certified round"
        );

        Ok(RoundCertification {
            round_number,
            unicity_root,
            certificates,
        })
    }
}
