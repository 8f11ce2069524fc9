//! Foundation types for the unicity ledger.
//!
//! This crate provides the value objects shared by the partition and root
//! components:
//!
//! - **Primitives**: [`Hash`], [`PartitionId`]
//! - **Commitment records**: [`SystemDescriptionRecord`], [`SystemInputRecord`]
//! - **Ledger types**: [`Block`], [`Transaction`], [`UnicityCertificate`]
//! - **Proofs**: [`InclusionProof`] and the tree hashing primitives
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer. Everything
//! here is passive data; the partition state machine and the root certifier
//! live in their own crates.

mod block;
mod certificate;
mod hash;
mod identifiers;
mod proof;
mod record;
mod transaction;

pub use block::Block;
pub use certificate::{CertificateError, UnicityCertificate};
pub use hash::{Hash, HexError};
pub use identifiers::PartitionId;
pub use proof::{
    key_path, leaf_hash, node_hash, path_bit, InclusionProof, ProofError, TREE_DEPTH,
};
pub use record::{SystemDescriptionRecord, SystemInputRecord};
pub use transaction::Transaction;
