//! Node-facing query surface.
//!
//! What an RPC layer would serve from: submit-transaction plus committed
//! history queries. Errors are coarse invalid-argument / invalid-state
//! categories; internal phase names never leak to callers.

use crate::blockchain::{Blockchain, SharedHandle};
use crate::buffer::TxBufferHandle;
use crate::config::PartitionConfig;
use thiserror::Error;
use tokio::sync::mpsc;
use unicity_core::BufferCommand;
use unicity_types::{Block, Transaction};

/// Query-surface errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

/// Response of a blocks-in-range query.
///
/// Carries the batch's actual maximum block number and the node's latest
/// round number so a client can tell it is behind even when the batch was
/// clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBatch {
    pub blocks: Vec<Block>,
    /// Highest block number actually contained in this batch (0 when the
    /// batch is empty).
    pub batch_max_block_number: u64,
    /// The node's latest certified round number.
    pub max_round_number: u64,
}

/// The partition node's query surface over a running [`Blockchain`].
pub struct PartitionNode {
    shared: SharedHandle,
    buffer_commands: mpsc::Sender<BufferCommand>,
    max_get_blocks_batch_size: u64,
}

impl PartitionNode {
    pub fn new(
        blockchain: &Blockchain,
        buffer: &TxBufferHandle,
        config: &PartitionConfig,
    ) -> Self {
        PartitionNode {
            shared: blockchain.shared(),
            buffer_commands: buffer.commands(),
            max_get_blocks_batch_size: config.max_get_blocks_batch_size,
        }
    }

    /// Hand a transaction to the buffer for a future proposal window.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), QueryError> {
        if tx.is_empty() {
            return Err(QueryError::InvalidArgument("empty transaction payload"));
        }
        if self.shared.lock().phase.is_closing() {
            return Err(QueryError::InvalidState("node is shutting down"));
        }
        self.buffer_commands
            .try_send(BufferCommand::Submit(tx))
            .map_err(|_| QueryError::InvalidState("transaction buffer unavailable"))
    }

    /// Committed block by number.
    pub fn get_block(&self, block_number: u64) -> Result<Option<Block>, QueryError> {
        if block_number == 0 {
            return Err(QueryError::InvalidArgument(
                "block number cannot be less than one",
            ));
        }
        Ok(self.shared.lock().store.get(block_number).cloned())
    }

    /// Latest committed block, if any.
    pub fn latest_block(&self) -> Option<Block> {
        self.shared.lock().store.latest().cloned()
    }

    /// Latest certified round number (0 before the first finalized block).
    pub fn latest_round_number(&self) -> u64 {
        self.shared.lock().store.latest_round_number()
    }

    /// Committed blocks starting at `first_block_number`, clamped to the
    /// configured maximum batch size.
    pub fn get_blocks(
        &self,
        first_block_number: u64,
        block_count: u64,
    ) -> Result<BlockBatch, QueryError> {
        if first_block_number == 0 {
            return Err(QueryError::InvalidArgument(
                "block number cannot be less than one",
            ));
        }
        if block_count == 0 {
            return Err(QueryError::InvalidArgument(
                "block count cannot be less than one",
            ));
        }

        let shared = self.shared.lock();
        let latest = shared.store.latest_block_number();
        let max_count = block_count.min(self.max_get_blocks_batch_size);
        // Saturate: a start near u64::MAX must clamp, not wrap around.
        let batch_max_block_number = first_block_number
            .saturating_add(max_count - 1)
            .min(latest);

        let mut blocks = Vec::new();
        for number in first_block_number..=batch_max_block_number {
            if let Some(block) = shared.store.get(number) {
                blocks.push(block.clone());
            }
        }
        let batch_max_block_number = if blocks.is_empty() {
            0
        } else {
            batch_max_block_number
        };
        Ok(BlockBatch {
            blocks,
            batch_max_block_number,
            max_round_number: shared.store.latest_round_number(),
        })
    }
}
