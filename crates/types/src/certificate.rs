//! Unicity certificates.

use crate::proof::ProofError;
use crate::{
    Hash, InclusionProof, PartitionId, SystemDescriptionRecord, SystemInputRecord,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from certificate verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertificateError {
    #[error("certificate is for partition {got}, expected {expected}")]
    PartitionMismatch {
        expected: PartitionId,
        got: PartitionId,
    },
    #[error("certified root hash {certified} does not match state root {state_root}")]
    StateRootMismatch { certified: Hash, state_root: Hash },
    #[error("inclusion proof rejected: {0}")]
    Proof(#[from] ProofError),
}

/// Proof that a partition's declared state was included in a given round's
/// global agreement.
///
/// Carries the input record the partition submitted, the inclusion proof of
/// its unicity tree leaf, and the certified round's unicity root. Quorum
/// signatures over the root are out of scope here; the certificate contains
/// what the deterministic aggregation step produces.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct UnicityCertificate {
    /// The partition this certificate was issued to.
    pub partition_id: PartitionId,
    /// The input record certified this round.
    pub input_record: SystemInputRecord,
    /// Inclusion proof of the partition's leaf under `unicity_root`.
    pub unicity_proof: InclusionProof,
    /// The round's certified unicity tree root.
    pub unicity_root: Hash,
    /// The root round that produced this certificate.
    pub round_number: u64,
}

impl UnicityCertificate {
    /// Verify the certificate against a proposed block's captured state root.
    ///
    /// Checks that the certificate names this partition, that the certified
    /// root hash is the block's state root, and that the leaf digest
    /// (description ‖ input record) is included under the unicity root.
    pub fn verify(
        &self,
        partition_id: &PartitionId,
        description: &SystemDescriptionRecord,
        state_root: Hash,
    ) -> Result<(), CertificateError> {
        if &self.partition_id != partition_id {
            return Err(CertificateError::PartitionMismatch {
                expected: partition_id.clone(),
                got: self.partition_id.clone(),
            });
        }
        if self.input_record.root_hash != state_root {
            return Err(CertificateError::StateRootMismatch {
                certified: self.input_record.root_hash,
                state_root,
            });
        }
        let leaf_value = Hash::digest(&[
            description.serialize(),
            &self.input_record.serialize(),
        ]);
        self.unicity_proof
            .verify(&self.partition_id, leaf_value, self.unicity_root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TREE_DEPTH;

    fn dummy_certificate(id: PartitionId, root_hash: Hash) -> UnicityCertificate {
        UnicityCertificate {
            partition_id: id,
            input_record: SystemInputRecord::new(Hash::ZERO, root_hash, vec![1]),
            unicity_proof: InclusionProof::new(vec![Hash::ZERO; TREE_DEPTH]),
            unicity_root: Hash::ZERO,
            round_number: 1,
        }
    }

    #[test]
    fn rejects_foreign_partition() {
        let cert = dummy_certificate(PartitionId::new(vec![1]), Hash::ZERO);
        let other = PartitionId::new(vec![2]);
        let description = SystemDescriptionRecord::new(vec![9]);
        assert!(matches!(
            cert.verify(&other, &description, Hash::ZERO),
            Err(CertificateError::PartitionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_state_root_mismatch() {
        let id = PartitionId::new(vec![1]);
        let cert = dummy_certificate(id.clone(), Hash::digest(&[b"certified"]));
        let description = SystemDescriptionRecord::new(vec![9]);
        assert!(matches!(
            cert.verify(&id, &description, Hash::digest(&[b"other"])),
            Err(CertificateError::StateRootMismatch { .. })
        ));
    }
}
