//! End-to-end tests through the node query surface.
//!
//! Full wiring: transactions enter via [`PartitionNode::submit_transaction`],
//! flow through the [`TxBuffer`] into the blockchain loop, proposals are
//! certified by a real [`RootState`] and finalized, and the committed history
//! is read back through the node queries.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use unicity_core::{LifecycleSignal, ProposalEvent, StateError, TransactionSystem};
use unicity_partition::{
    Blockchain, PartitionConfig, PartitionNode, Phase, QueryError, TxBuffer,
};
use unicity_root::RootState;
use unicity_types::{
    Block, Hash, PartitionId, SystemDescriptionRecord, SystemInputRecord, Transaction,
};

const WAIT: Duration = Duration::from_secs(2);
const PROPOSAL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Clone, Default)]
struct CountingState(Arc<Mutex<Vec<Hash>>>);

impl TransactionSystem for CountingState {
    fn apply(&mut self, tx: &Transaction) -> Result<(), StateError> {
        self.0.lock().push(tx.hash());
        Ok(())
    }

    fn root_hash(&self) -> Hash {
        let applied = self.0.lock();
        let mut acc = Hash::digest(&[b"genesis"]);
        for hash in applied.iter() {
            acc = Hash::digest(&[acc.as_bytes(), hash.as_bytes()]);
        }
        acc
    }

    fn rollback(&mut self) {
        self.0.lock().clear();
    }
}

fn partition_id() -> PartitionId {
    PartitionId::new(vec![0x01])
}

fn description() -> SystemDescriptionRecord {
    SystemDescriptionRecord::new(vec![0x10])
}

struct Node {
    blockchain: Blockchain,
    node: PartitionNode,
    lifecycle_tx: mpsc::Sender<LifecycleSignal>,
    proposals_rx: mpsc::Receiver<ProposalEvent>,
    root: RootState,
}

fn start(config: PartitionConfig) -> Node {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let (lifecycle_tx, lifecycle_rx) = mpsc::channel(16);
    let (forward_tx, forward_rx) = mpsc::channel(16);
    let (proposals_tx, proposals_rx) = mpsc::channel(16);
    let buffer = TxBuffer::spawn(64, forward_tx);

    let blockchain = Blockchain::builder()
        .state(CountingState::default())
        .config(config.clone())
        .partition_id(partition_id())
        .description(description())
        .lifecycle_input(lifecycle_rx)
        .transaction_input(forward_rx)
        .buffer_control(buffer.commands())
        .proposal_output(proposals_tx)
        .build()
        .expect("blockchain must start");
    let node = PartitionNode::new(&blockchain, &buffer, &config);

    let mut root = RootState::new(b"trust base".to_vec());
    root.register(partition_id(), description()).unwrap();

    Node {
        blockchain,
        node,
        lifecycle_tx,
        proposals_rx,
        root,
    }
}

async fn wait_for_phase(blockchain: &Blockchain, phase: Phase) {
    let reached = timeout(WAIT, async {
        loop {
            if blockchain.snapshot().phase == phase {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for phase {phase}");
}

/// Drive one full propose-certify-finalize round and return the block.
async fn run_round(node: &mut Node, block_number: u64) -> Block {
    node.lifecycle_tx
        .send(LifecycleSignal::StartBlockPropose { block_number })
        .await
        .unwrap();

    let event = timeout(WAIT, node.proposals_rx.recv())
        .await
        .expect("timed out waiting for proposal")
        .expect("proposal channel closed");
    let ProposalEvent::NewBlockProposal { block } = event;

    let prev = node
        .root
        .certified_root_hash(&partition_id())
        .unwrap_or(Hash::ZERO);
    let inputs = HashMap::from([(
        partition_id(),
        SystemInputRecord::new(prev, block.state_root, vec![1]),
    )]);
    let outcome = node.root.certify_round(&inputs).unwrap();
    let certificate = outcome.certificates[&partition_id()].clone();
    node.lifecycle_tx
        .send(LifecycleSignal::FinalizeBlock { certificate })
        .await
        .unwrap();
    wait_for_phase(&node.blockchain, Phase::Idle).await;
    block
}

#[tokio::test]
async fn submitted_transaction_reaches_the_committed_block() {
    let mut node = start(
        PartitionConfig::default().with_block_proposal_timeout(PROPOSAL_TIMEOUT),
    );

    let tx = Transaction::new(vec![1, 2, 3]);
    node.node.submit_transaction(tx.clone()).unwrap();
    let block = run_round(&mut node, 1).await;

    assert_eq!(block.transactions, vec![tx]);
    let committed = node.node.get_block(1).unwrap().expect("block 1 committed");
    assert!(committed.is_certified());
    assert_eq!(committed.transactions, block.transactions);
    assert_eq!(node.node.latest_round_number(), 1);
}

#[tokio::test]
async fn submit_rejects_empty_payload() {
    let node = start(
        PartitionConfig::default().with_block_proposal_timeout(PROPOSAL_TIMEOUT),
    );
    let err = node.node.submit_transaction(Transaction::new(vec![])).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

#[tokio::test]
async fn submit_rejects_while_shutting_down() {
    let node = start(
        PartitionConfig::default().with_block_proposal_timeout(PROPOSAL_TIMEOUT),
    );
    node.blockchain.close();
    let err = node
        .node
        .submit_transaction(Transaction::new(vec![1]))
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidState(_)));
}

#[tokio::test]
async fn block_queries_reject_zero_arguments() {
    let node = start(
        PartitionConfig::default().with_block_proposal_timeout(PROPOSAL_TIMEOUT),
    );
    assert!(matches!(
        node.node.get_block(0),
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        node.node.get_blocks(0, 10),
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        node.node.get_blocks(1, 0),
        Err(QueryError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn get_blocks_clamps_to_the_configured_batch_size() {
    let mut node = start(
        PartitionConfig::default()
            .with_block_proposal_timeout(PROPOSAL_TIMEOUT)
            .with_max_get_blocks_batch_size(1),
    );

    run_round(&mut node, 1).await;
    run_round(&mut node, 2).await;

    // Ten blocks requested, one allowed per batch.
    let batch = node.node.get_blocks(1, 10).unwrap();
    assert_eq!(batch.blocks.len(), 1);
    assert_eq!(batch.blocks[0].block_number, 1);
    assert_eq!(batch.batch_max_block_number, 1);
    assert_eq!(batch.max_round_number, 2);

    // The client follows up from where the batch stopped.
    let batch = node.node.get_blocks(2, 10).unwrap();
    assert_eq!(batch.blocks.len(), 1);
    assert_eq!(batch.blocks[0].block_number, 2);
    assert_eq!(batch.batch_max_block_number, 2);
}

#[tokio::test]
async fn get_blocks_near_the_numeric_limit_does_not_wrap() {
    let mut node = start(
        PartitionConfig::default().with_block_proposal_timeout(PROPOSAL_TIMEOUT),
    );

    // Fresh node: nothing committed yet.
    let batch = node.node.get_blocks(u64::MAX, 2).unwrap();
    assert!(batch.blocks.is_empty());
    assert_eq!(batch.batch_max_block_number, 0);

    // Still empty once history exists; the start is simply past the tip.
    run_round(&mut node, 1).await;
    let batch = node.node.get_blocks(u64::MAX, u64::MAX).unwrap();
    assert!(batch.blocks.is_empty());
    assert_eq!(batch.batch_max_block_number, 0);
    assert_eq!(batch.max_round_number, 1);
}

#[tokio::test]
async fn get_blocks_past_the_tip_is_empty() {
    let mut node = start(
        PartitionConfig::default().with_block_proposal_timeout(PROPOSAL_TIMEOUT),
    );
    run_round(&mut node, 1).await;

    let batch = node.node.get_blocks(5, 10).unwrap();
    assert!(batch.blocks.is_empty());
    assert_eq!(batch.batch_max_block_number, 0);
    assert_eq!(batch.max_round_number, 1);

    assert_eq!(node.node.get_block(5).unwrap(), None);
    assert_eq!(
        node.node.latest_block().map(|b| b.block_number),
        Some(1)
    );
}
