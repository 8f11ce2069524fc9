//! Blocks.

use crate::{Hash, Transaction, UnicityCertificate};
use serde::{Deserialize, Serialize};

/// One block of a partition's ledger.
///
/// A block is mutable only while it is the current block of an in-progress
/// proposal: the state machine appends transactions and captures the state
/// root at proposal close. Once proposing ends the block is either finalized
/// (a certificate is attached and it joins committed history) or discarded.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Block number; monotonically increasing, gap-free for committed blocks.
    pub block_number: u64,
    /// Transactions accepted during the proposing window, in apply order.
    pub transactions: Vec<Transaction>,
    /// State root captured at proposal-close time.
    pub state_root: Hash,
    /// Set when the block is finalized.
    pub unicity_certificate: Option<UnicityCertificate>,
}

impl Block {
    /// Open an empty block for a new proposal.
    pub fn new(block_number: u64) -> Self {
        Block {
            block_number,
            transactions: Vec::new(),
            state_root: Hash::ZERO,
            unicity_certificate: None,
        }
    }

    /// The genesis placeholder: block 0 carrying the initial state root.
    pub fn genesis(state_root: Hash) -> Self {
        Block {
            block_number: 0,
            transactions: Vec::new(),
            state_root,
            unicity_certificate: None,
        }
    }

    /// Append an accepted transaction.
    pub fn append_tx(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Whether this block carries a unicity certificate.
    pub fn is_certified(&self) -> bool {
        self.unicity_certificate.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_is_empty() {
        let block = Block::new(7);
        assert_eq!(block.block_number, 7);
        assert!(block.transactions.is_empty());
        assert_eq!(block.state_root, Hash::ZERO);
        assert!(!block.is_certified());
    }

    #[test]
    fn genesis_carries_initial_root() {
        let root = Hash::digest(&[b"initial"]);
        let block = Block::genesis(root);
        assert_eq!(block.block_number, 0);
        assert_eq!(block.state_root, root);
    }

    #[test]
    fn append_preserves_order() {
        let mut block = Block::new(1);
        block.append_tx(Transaction::new(vec![1]));
        block.append_tx(Transaction::new(vec![2]));
        assert_eq!(block.transactions[0].payload(), &[1]);
        assert_eq!(block.transactions[1].payload(), &[2]);
    }
}
