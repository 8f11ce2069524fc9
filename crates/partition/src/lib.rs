//! Partition-side block lifecycle for the unicity ledger.
//!
//! This crate implements the actor that owns a partition node's block
//! proposal lifecycle:
//!
//! - [`Blockchain`]: the state machine handle. One dedicated tokio task per
//!   instance selects over shutdown, lifecycle signals, incoming
//!   transactions and the proposal timer; handlers never run concurrently
//!   with each other.
//! - [`Phase`]: the discrete lifecycle stage, also readable from outside
//!   the loop through [`Blockchain::snapshot`].
//! - [`TxBuffer`]: the bounded transaction buffer feeding the state
//!   machine, gated by start/stop control messages.
//! - [`PartitionNode`]: the query surface (submit / get-block / latest /
//!   blocks-in-range) exposing committed history with coarse
//!   invalid-argument / invalid-state errors.
//!
//! # Concurrency
//!
//! Exactly one event is handled at a time inside the loop, so `Phase` and
//! the current/previous block need no locking within it. They are still
//! behind a mutex because status queries read them from other tasks; every
//! external read takes one locked snapshot, never a torn multi-field view.

mod blockchain;
mod buffer;
mod config;
mod node;
mod phase;
mod store;

pub use blockchain::{Blockchain, BlockchainBuilder, BlockchainError, StatusSnapshot};
pub use buffer::{TxBuffer, TxBufferHandle};
pub use config::PartitionConfig;
pub use node::{BlockBatch, PartitionNode, QueryError};
pub use phase::Phase;
pub use store::{BlockStore, StoreError};
