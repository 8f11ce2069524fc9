//! The block lifecycle state machine.

use crate::config::PartitionConfig;
use crate::phase::Phase;
use crate::store::BlockStore;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Sleep};
use unicity_core::{
    BufferCommand, LifecycleSignal, ProposalEvent, TransactionSystem,
};
use unicity_types::{Block, PartitionId, SystemDescriptionRecord, Transaction, UnicityCertificate};

/// Errors constructing the state machine.
///
/// All of these are fatal at setup time; nothing ever reaches the
/// processing loop with a missing dependency or invalid configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockchainError {
    #[error("missing dependency: {0}")]
    MissingDependency(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// One consistent external view of the loop-owned state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub current_block_number: u64,
    pub previous_block_number: u64,
    /// Highest committed block number (0 if none).
    pub committed_block_number: u64,
    /// Round number of the latest committed certificate (0 if none).
    pub latest_round_number: u64,
}

/// State shared between the processing loop and external readers.
///
/// The loop is the only writer; queries take the lock for one snapshot so
/// phase and block pointers are never observed torn.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) phase: Phase,
    pub(crate) current_block: Block,
    pub(crate) previous_block: Block,
    pub(crate) store: BlockStore,
}

pub(crate) type SharedHandle = Arc<Mutex<Shared>>;

/// Handle to a running block lifecycle state machine.
///
/// The processing loop is spawned by [`BlockchainBuilder::build`]. Dropping
/// the handle closes the actor, same as [`Blockchain::close`].
#[derive(Debug)]
pub struct Blockchain {
    shared: SharedHandle,
    shutdown_tx: watch::Sender<bool>,
}

impl Blockchain {
    /// Start building a state machine instance.
    pub fn builder<S: TransactionSystem>() -> BlockchainBuilder<S> {
        BlockchainBuilder::new()
    }

    /// Transition to `Closing` and signal the loop to stop.
    ///
    /// Idempotent; returns once the transition is recorded, without waiting
    /// for the loop to exit. An in-flight proposal is abandoned.
    pub fn close(&self) {
        {
            let mut shared = self.shared.lock();
            shared.phase = Phase::Closing;
        }
        let _ = self.shutdown_tx.send(true);
        tracing::info!("blockchain close requested");
    }

    /// Take one consistent snapshot of phase and block state.
    pub fn snapshot(&self) -> StatusSnapshot {
        let shared = self.shared.lock();
        StatusSnapshot {
            phase: shared.phase,
            current_block_number: shared.current_block.block_number,
            previous_block_number: shared.previous_block.block_number,
            committed_block_number: shared.store.latest_block_number(),
            latest_round_number: shared.store.latest_round_number(),
        }
    }

    pub(crate) fn shared(&self) -> SharedHandle {
        Arc::clone(&self.shared)
    }
}

impl Drop for Blockchain {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Builder collecting the state machine's dependencies.
///
/// Every dependency is explicit; there is no ambient bus to discover
/// channels on. `build()` fails fast on anything missing and spawns the
/// processing loop on success.
pub struct BlockchainBuilder<S> {
    state: Option<S>,
    config: Option<PartitionConfig>,
    partition_id: Option<PartitionId>,
    description: Option<SystemDescriptionRecord>,
    lifecycle_rx: Option<mpsc::Receiver<LifecycleSignal>>,
    transactions_rx: Option<mpsc::Receiver<Transaction>>,
    buffer_tx: Option<mpsc::Sender<BufferCommand>>,
    proposals_tx: Option<mpsc::Sender<ProposalEvent>>,
}

impl<S: TransactionSystem> BlockchainBuilder<S> {
    fn new() -> Self {
        BlockchainBuilder {
            state: None,
            config: None,
            partition_id: None,
            description: None,
            lifecycle_rx: None,
            transactions_rx: None,
            buffer_tx: None,
            proposals_tx: None,
        }
    }

    /// The pluggable transaction-system state this machine drives.
    pub fn state(mut self, state: S) -> Self {
        self.state = Some(state);
        self
    }

    pub fn config(mut self, config: PartitionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// This partition's identifier.
    pub fn partition_id(mut self, id: PartitionId) -> Self {
        self.partition_id = Some(id);
        self
    }

    /// This partition's registered description record, needed to verify
    /// incoming unicity certificates.
    pub fn description(mut self, description: SystemDescriptionRecord) -> Self {
        self.description = Some(description);
        self
    }

    /// Receiver of lifecycle signals (lifecycle-input).
    pub fn lifecycle_input(mut self, rx: mpsc::Receiver<LifecycleSignal>) -> Self {
        self.lifecycle_rx = Some(rx);
        self
    }

    /// Receiver of transactions from the buffer (tx-output).
    pub fn transaction_input(mut self, rx: mpsc::Receiver<Transaction>) -> Self {
        self.transactions_rx = Some(rx);
        self
    }

    /// Sender of control messages towards the buffer (tx-input).
    pub fn buffer_control(mut self, tx: mpsc::Sender<BufferCommand>) -> Self {
        self.buffer_tx = Some(tx);
        self
    }

    /// Sender of completed proposals (lifecycle-output).
    pub fn proposal_output(mut self, tx: mpsc::Sender<ProposalEvent>) -> Self {
        self.proposals_tx = Some(tx);
        self
    }

    /// Validate the dependencies and spawn the processing loop.
    pub fn build(self) -> Result<Blockchain, BlockchainError> {
        let state = self
            .state
            .ok_or(BlockchainError::MissingDependency("transaction system state"))?;
        let config = self
            .config
            .ok_or(BlockchainError::MissingDependency("configuration"))?;
        let partition_id = self
            .partition_id
            .ok_or(BlockchainError::MissingDependency("partition identifier"))?;
        let description = self
            .description
            .ok_or(BlockchainError::MissingDependency("system description record"))?;
        let lifecycle_rx = self
            .lifecycle_rx
            .ok_or(BlockchainError::MissingDependency("lifecycle-input channel"))?;
        let transactions_rx = self
            .transactions_rx
            .ok_or(BlockchainError::MissingDependency("tx-output channel"))?;
        let buffer_tx = self
            .buffer_tx
            .ok_or(BlockchainError::MissingDependency("tx-input channel"))?;
        let proposals_tx = self
            .proposals_tx
            .ok_or(BlockchainError::MissingDependency("lifecycle-output channel"))?;

        if config.block_proposal_timeout.is_zero() {
            return Err(BlockchainError::InvalidConfiguration(
                "block proposal timeout must be non-zero",
            ));
        }
        if config.channel_capacity == 0 {
            return Err(BlockchainError::InvalidConfiguration(
                "channel capacity must be non-zero",
            ));
        }
        if config.max_get_blocks_batch_size == 0 {
            return Err(BlockchainError::InvalidConfiguration(
                "max get-blocks batch size must be non-zero",
            ));
        }
        if partition_id.is_empty() {
            return Err(BlockchainError::InvalidConfiguration(
                "partition identifier must be non-empty",
            ));
        }
        if description.is_empty() {
            return Err(BlockchainError::InvalidConfiguration(
                "system description record must be non-empty",
            ));
        }

        let genesis = Block::genesis(state.root_hash());
        let shared: SharedHandle = Arc::new(Mutex::new(Shared {
            phase: Phase::Idle,
            current_block: genesis.clone(),
            previous_block: genesis,
            store: BlockStore::new(),
        }));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = BlockchainLoop {
            shared: Arc::clone(&shared),
            state,
            config,
            partition_id,
            description,
            lifecycle_rx,
            transactions_rx,
            buffer_tx,
            proposals_tx,
            shutdown_rx,
        };
        tokio::spawn(worker.run());

        Ok(Blockchain {
            shared,
            shutdown_tx,
        })
    }
}

/// The processing loop: exactly one event at a time.
struct BlockchainLoop<S> {
    shared: SharedHandle,
    state: S,
    config: PartitionConfig,
    partition_id: PartitionId,
    description: SystemDescriptionRecord,
    lifecycle_rx: mpsc::Receiver<LifecycleSignal>,
    transactions_rx: mpsc::Receiver<Transaction>,
    buffer_tx: mpsc::Sender<BufferCommand>,
    proposals_tx: mpsc::Sender<ProposalEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Deadline the proposal timer parks at while no proposal is open.
fn park_deadline() -> Instant {
    Instant::now() + Duration::from_secs(60 * 60 * 24 * 365)
}

impl<S: TransactionSystem> BlockchainLoop<S> {
    async fn run(mut self) {
        let timer = tokio::time::sleep_until(park_deadline());
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    tracing::info!("exiting blockchain main loop");
                    break;
                }

                Some(signal) = self.lifecycle_rx.recv() => {
                    tracing::debug!(signal = signal.type_name(), "handling lifecycle signal");
                    match signal {
                        LifecycleSignal::StartBlockPropose { block_number } => {
                            self.start_propose(block_number, timer.as_mut());
                        }
                        LifecycleSignal::FinalizeBlock { certificate } => {
                            self.finalize(certificate);
                        }
                    }
                }

                Some(tx) = self.transactions_rx.recv() => {
                    self.handle_transaction(tx);
                }

                _ = timer.as_mut() => {
                    timer.as_mut().reset(park_deadline());
                    self.end_propose();
                }
            }
        }
    }

    /// React to a "start proposing at block N" signal.
    fn start_propose(&mut self, block_number: u64, timer: Pin<&mut Sleep>) {
        let mut shared = self.shared.lock();
        match shared.phase {
            Phase::Closing => {
                tracing::debug!(block_number, "ignoring propose signal; closing");
            }
            Phase::Synchronizing => {
                tracing::info!(block_number, "ignoring propose signal; ledger is not synchronized");
            }
            Phase::Proposing => {
                if block_number > shared.previous_block.block_number + 1 {
                    // The root is ahead of us: the open proposal is built on
                    // stale state. Abandon it and catch up.
                    tracing::warn!(
                        block_number,
                        previous = shared.previous_block.block_number,
                        "node is behind; rolling back and synchronizing"
                    );
                    self.state.rollback();
                    shared.phase = Phase::Synchronizing;
                    self.send_buffer(BufferCommand::StopSendingTransactions);
                } else {
                    tracing::debug!(block_number, "ignoring duplicate propose signal");
                }
            }
            Phase::Idle | Phase::Finalizing => {
                let accepted = shared.current_block.block_number;
                if block_number <= accepted {
                    tracing::debug!(block_number, accepted, "ignoring stale propose signal");
                    return;
                }
                if block_number > accepted + 1 {
                    tracing::warn!(
                        block_number,
                        accepted,
                        "propose signal skips blocks; synchronizing"
                    );
                    shared.phase = Phase::Synchronizing;
                    self.send_buffer(BufferCommand::StopSendingTransactions);
                    return;
                }
                shared.previous_block =
                    std::mem::replace(&mut shared.current_block, Block::new(block_number));
                shared.phase = Phase::Proposing;
                timer.reset(Instant::now() + self.config.block_proposal_timeout);
                self.send_buffer(BufferCommand::StartSendingTransactions);
                tracing::info!(block_number, "proposal opened");
            }
        }
    }

    /// React to a transaction from the tx-output channel.
    fn handle_transaction(&mut self, tx: Transaction) {
        let mut shared = self.shared.lock();
        match shared.phase {
            Phase::Closing => {
                tracing::debug!(tx_hash = %tx.hash(), "ignoring transaction; closing");
            }
            Phase::Proposing => match self.state.apply(&tx) {
                Ok(()) => shared.current_block.append_tx(tx),
                Err(error) => {
                    // Local to this transaction; the proposal continues.
                    tracing::info!(
                        %error,
                        tx_hash = %tx.hash(),
                        "failed to apply transaction; dropped from block"
                    );
                }
            },
            _ => {
                tracing::debug!(
                    tx_hash = %tx.hash(),
                    phase = %shared.phase,
                    "transaction outside acceptance window; re-queueing"
                );
                self.send_buffer(BufferCommand::Requeue(tx));
            }
        }
    }

    /// Proposal timer fired: close the window and emit the proposal.
    fn end_propose(&mut self) {
        let mut shared = self.shared.lock();
        if shared.phase != Phase::Proposing {
            tracing::debug!(phase = %shared.phase, "proposal timeout outside proposing; ignoring");
            return;
        }
        shared.phase = Phase::Finalizing;
        self.send_buffer(BufferCommand::StopSendingTransactions);
        shared.current_block.state_root = self.state.root_hash();

        let block = shared.current_block.clone();
        tracing::info!(
            block_number = block.block_number,
            transactions = block.transactions.len(),
            state_root = %block.state_root,
            "proposal closed"
        );
        if self
            .proposals_tx
            .try_send(ProposalEvent::NewBlockProposal { block })
            .is_err()
        {
            tracing::warn!("lifecycle-output channel unavailable; proposal event dropped");
        }
    }

    /// Convert the pending proposal plus its certificate into a committed
    /// block.
    fn finalize(&mut self, certificate: UnicityCertificate) {
        let mut shared = self.shared.lock();
        if shared.phase != Phase::Finalizing {
            tracing::debug!(phase = %shared.phase, "ignoring finalize signal outside finalizing");
            return;
        }

        let state_root = shared.current_block.state_root;
        if let Err(error) =
            certificate.verify(&self.partition_id, &self.description, state_root)
        {
            // Discard the proposal so the same block number can be retried.
            tracing::warn!(%error, "certificate rejected; discarding proposal");
            self.state.rollback();
            shared.current_block = shared.previous_block.clone();
            shared.phase = Phase::Idle;
            return;
        }

        let round_number = certificate.round_number;
        shared.current_block.unicity_certificate = Some(certificate);
        let block = shared.current_block.clone();
        let block_number = block.block_number;
        match shared.store.append(block) {
            Ok(()) => {
                shared.phase = Phase::Idle;
                tracing::info!(block_number, round_number, "block finalized");
            }
            Err(error) => {
                tracing::warn!(%error, "committed history would gap; synchronizing");
                self.state.rollback();
                shared.current_block.unicity_certificate = None;
                shared.phase = Phase::Synchronizing;
                self.send_buffer(BufferCommand::StopSendingTransactions);
            }
        }
    }

    fn send_buffer(&self, command: BufferCommand) {
        let name = command.type_name();
        if self.buffer_tx.try_send(command).is_err() {
            tracing::warn!(command = name, "tx-input channel unavailable; control message dropped");
        }
    }
}
