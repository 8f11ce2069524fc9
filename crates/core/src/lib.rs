//! Event vocabulary and traits for the block lifecycle core.
//!
//! This crate defines the messages exchanged between the partition's block
//! lifecycle state machine and its collaborators, plus the trait the
//! pluggable transaction system implements:
//!
//! - [`LifecycleSignal`]: inputs to the state machine (propose / finalize)
//! - [`ProposalEvent`]: outputs of the state machine (completed proposals)
//! - [`BufferCommand`]: control messages towards the transaction buffer
//! - [`TransactionSystem`]: the apply / root-hash / rollback seam
//!
//! # Architecture
//!
//! There is no discoverable pub/sub fabric here. Every channel is a typed
//! tokio mpsc pair passed explicitly at construction, one per logical topic:
//!
//! ```text
//! lifecycle-input  ──▶ Blockchain ──▶ lifecycle-output
//! tx-output        ──▶            ──▶ tx-input (buffer control / re-queue)
//! ```
//!
//! Delivery is at-least-once with bounded capacity; the state machine's
//! phase guards make duplicate and late messages harmless.

mod event;
mod traits;

pub use event::{BufferCommand, LifecycleSignal, ProposalEvent};
pub use traits::{StateError, TransactionSystem};
