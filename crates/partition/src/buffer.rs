//! Bounded transaction buffer.
//!
//! Sits between transaction submission and the state machine. Forwarding is
//! gated by the state machine's start/stop control messages, so
//! transactions only flow while a proposal window is open; everything else
//! is held (bounded) for a later window. Delivery is at-least-once and no
//! ordering is guaranteed across the control and transaction channels.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;
use unicity_core::BufferCommand;
use unicity_types::{Hash, Transaction};

/// Handle for submitting commands to a running buffer task.
#[derive(Clone)]
pub struct TxBufferHandle {
    command_tx: mpsc::Sender<BufferCommand>,
}

impl TxBufferHandle {
    /// Sender for buffer control messages (tx-input channel).
    pub fn commands(&self) -> mpsc::Sender<BufferCommand> {
        self.command_tx.clone()
    }
}

/// The buffer task.
pub struct TxBuffer;

impl TxBuffer {
    /// Spawn a buffer with the given capacity, forwarding into `out_tx`
    /// (the state machine's tx-output channel).
    pub fn spawn(capacity: usize, out_tx: mpsc::Sender<Transaction>) -> TxBufferHandle {
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let worker = BufferLoop {
            command_rx,
            out_tx,
            queue: VecDeque::new(),
            buffered: HashSet::new(),
            forwarding: false,
            capacity,
        };
        tokio::spawn(worker.run());
        TxBufferHandle { command_tx }
    }
}

struct BufferLoop {
    command_rx: mpsc::Receiver<BufferCommand>,
    out_tx: mpsc::Sender<Transaction>,
    queue: VecDeque<Transaction>,
    /// Hashes currently held, for duplicate suppression.
    buffered: HashSet<Hash>,
    forwarding: bool,
    capacity: usize,
}

impl BufferLoop {
    async fn run(mut self) {
        // Retries forwarding when the out channel was full at drain time.
        let mut retry = tokio::time::interval(Duration::from_millis(20));
        retry.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe = self.command_rx.recv() => {
                    match maybe {
                        Some(command) => self.handle(command),
                        None => {
                            tracing::info!("exiting transaction buffer loop");
                            break;
                        }
                    }
                }
                _ = retry.tick(), if self.forwarding && !self.queue.is_empty() => {
                    self.drain();
                }
            }
        }
    }

    fn handle(&mut self, command: BufferCommand) {
        match command {
            BufferCommand::StartSendingTransactions => {
                tracing::debug!(queued = self.queue.len(), "start forwarding transactions");
                self.forwarding = true;
                self.drain();
            }
            BufferCommand::StopSendingTransactions => {
                tracing::debug!(queued = self.queue.len(), "stop forwarding transactions");
                self.forwarding = false;
            }
            BufferCommand::Submit(tx) => self.accept(tx, "submit"),
            BufferCommand::Requeue(tx) => self.accept(tx, "requeue"),
        }
    }

    fn accept(&mut self, tx: Transaction, source: &'static str) {
        let hash = tx.hash();
        if self.buffered.contains(&hash) {
            tracing::debug!(tx_hash = %hash, source, "duplicate transaction dropped");
            return;
        }
        if self.queue.len() >= self.capacity {
            tracing::warn!(tx_hash = %hash, source, "buffer full; transaction dropped");
            return;
        }
        self.buffered.insert(hash);
        self.queue.push_back(tx);
        if self.forwarding {
            self.drain();
        }
    }

    fn drain(&mut self) {
        while self.forwarding {
            let Some(tx) = self.queue.pop_front() else {
                break;
            };
            let hash = tx.hash();
            match self.out_tx.try_send(tx) {
                Ok(()) => {
                    self.buffered.remove(&hash);
                }
                Err(mpsc::error::TrySendError::Full(tx)) => {
                    // Out channel is backed up; keep the transaction and
                    // retry on the next tick.
                    self.queue.push_front(tx);
                    break;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!("tx-output channel closed; forwarding stopped");
                    self.forwarding = false;
                    break;
                }
            }
        }
    }
}
