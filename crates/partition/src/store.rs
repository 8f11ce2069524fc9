//! Committed block history.

use thiserror::Error;
use unicity_types::Block;

/// Error from appending out of order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("non-contiguous block: expected {expected}, got {got}")]
    NonContiguous { expected: u64, got: u64 },
}

/// In-memory committed block history, gap-free from block 1 upwards.
///
/// Persistent storage engines are out of scope; this is the in-process view
/// the query surface serves from.
#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: Vec<Block>,
}

impl BlockStore {
    pub fn new() -> Self {
        BlockStore { blocks: Vec::new() }
    }

    /// Number the next committed block must carry.
    pub fn next_block_number(&self) -> u64 {
        self.latest_block_number() + 1
    }

    /// Highest committed block number (0 if nothing is committed).
    pub fn latest_block_number(&self) -> u64 {
        self.blocks.last().map(|b| b.block_number).unwrap_or(0)
    }

    /// Round number of the latest committed block's certificate (0 if
    /// nothing is committed).
    pub fn latest_round_number(&self) -> u64 {
        self.blocks
            .last()
            .and_then(|b| b.unicity_certificate.as_ref())
            .map(|c| c.round_number)
            .unwrap_or(0)
    }

    /// Append a finalized block; rejects gaps and duplicates.
    pub fn append(&mut self, block: Block) -> Result<(), StoreError> {
        let expected = self.next_block_number();
        if block.block_number != expected {
            return Err(StoreError::NonContiguous {
                expected,
                got: block.block_number,
            });
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Committed block by number, if present.
    pub fn get(&self, block_number: u64) -> Option<&Block> {
        if block_number == 0 || block_number > self.latest_block_number() {
            return None;
        }
        // Gap-free from 1, so the index is direct.
        self.blocks.get((block_number - 1) as usize)
    }

    /// Latest committed block, if any.
    pub fn latest(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
