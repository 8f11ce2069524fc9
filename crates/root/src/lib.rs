//! Root-side certification for the unicity ledger.
//!
//! The root component aggregates every partition's latest state commitment
//! into a single verifiable root hash once per round:
//!
//! - [`UnicityTree`]: the deterministic sparse-Merkle aggregation of
//!   (description ‖ input record) leaf digests, keyed by partition
//!   identifier. Pure with respect to its inputs; no shared state between
//!   builds.
//! - [`RootState`]: the root's authoritative view: round number, trust
//!   base, the ordered set of registered partitions and their last
//!   certified root hashes. Mutated exactly once per successful round by
//!   [`RootState::certify_round`].
//!
//! The Byzantine root-chain protocol around this (leader election, quorum
//! signatures over the root) is out of scope; this crate is the
//! deterministic aggregation function and the bookkeeping it needs.

mod state;
mod tree;

pub use state::{CertificationError, RootState, RootStateError, RoundCertification};
pub use tree::{UnicityTree, UnicityTreeError};
