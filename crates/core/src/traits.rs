//! The pluggable transaction-system seam.

use thiserror::Error;
use unicity_types::{Hash, Transaction};

/// Error from applying a single transaction to the state.
///
/// Local to that transaction: the state machine logs it and drops the
/// transaction from the block; the proposal itself continues.
#[derive(Debug, Error)]
#[error("transaction rejected: {reason}")]
pub struct StateError {
    pub reason: String,
}

impl StateError {
    pub fn new(reason: impl Into<String>) -> Self {
        StateError {
            reason: reason.into(),
        }
    }
}

/// The transaction-system state the block lifecycle machine drives.
///
/// The state machine never inspects the state's internals; it only applies
/// transactions during the proposing window, captures the root hash at
/// proposal close, and rolls back on detected divergence. While a proposal
/// is open the state is exclusively owned by the state machine's loop;
/// nothing else may mutate it concurrently.
pub trait TransactionSystem: Send + 'static {
    /// Apply a transaction to the uncommitted state.
    fn apply(&mut self, tx: &Transaction) -> Result<(), StateError>;

    /// Root hash over the current (uncommitted) state.
    fn root_hash(&self) -> Hash;

    /// Discard uncommitted changes. Must always succeed.
    fn rollback(&mut self);
}
