//! Message types for the block lifecycle state machine.

use unicity_types::{Block, Transaction, UnicityCertificate};

/// Signals delivered on the lifecycle-input channel.
///
/// These originate from the root side (via whatever transport a deployment
/// uses) and drive the partition's phase transitions. Delivery is
/// at-least-once: duplicates and stale signals are expected and absorbed by
/// the state machine's phase guards.
#[derive(Debug, Clone)]
pub enum LifecycleSignal {
    /// Open a proposal for the given block number.
    StartBlockPropose {
        /// The block number the root expects the partition to propose.
        block_number: u64,
    },
    /// Finalize the pending proposal with its unicity certificate.
    FinalizeBlock {
        /// Certificate obtained for the proposed block's state root.
        certificate: UnicityCertificate,
    },
}

impl LifecycleSignal {
    /// Get the signal type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            LifecycleSignal::StartBlockPropose { .. } => "StartBlockPropose",
            LifecycleSignal::FinalizeBlock { .. } => "FinalizeBlock",
        }
    }
}

/// Events emitted on the lifecycle-output channel.
#[derive(Debug, Clone)]
pub enum ProposalEvent {
    /// A proposal window closed; the block carries its accepted transactions
    /// and the state root captured at close time.
    NewBlockProposal { block: Block },
}

/// Control messages towards the transaction buffer (tx-input channel).
#[derive(Debug, Clone)]
pub enum BufferCommand {
    /// Begin forwarding buffered transactions to the state machine.
    StartSendingTransactions,
    /// Stop forwarding; newly arriving transactions are held.
    StopSendingTransactions,
    /// A transaction submitted by a client.
    Submit(Transaction),
    /// A transaction the state machine received outside its acceptance
    /// window, returned for redelivery in a future window.
    Requeue(Transaction),
}

impl BufferCommand {
    /// Get the command type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            BufferCommand::StartSendingTransactions => "StartSendingTransactions",
            BufferCommand::StopSendingTransactions => "StopSendingTransactions",
            BufferCommand::Submit(_) => "Submit",
            BufferCommand::Requeue(_) => "Requeue",
        }
    }
}
