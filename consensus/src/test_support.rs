//! In-crate fakes for unit tests.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spos_sharding::{
    IndexHashedNodesCoordinator, NodesCoordinator, ShardCoordinator, ValidatorsPerShard,
};
use spos_types::{BlockHeader, PublicKey, RandomSeed, Round, RoundIndex, ShardId, Timestamp};

use crate::core::ConsensusCore;
use crate::message::ConsensusMessage;
use crate::ports::{
    BlockProcessor, Bootstrapper, Broadcaster, ChainHandler, MultiSigner, RoundClock,
};
use crate::state::ConsensusState;

pub(crate) const ROUND_MS: u64 = 4_000;

pub(crate) fn pk(byte: u8) -> PublicKey {
    PublicKey::new(vec![byte; 8])
}

/// Time only moves when told to, plus `step_ms` on every remaining-time query.
#[derive(Default)]
pub(crate) struct TestClock {
    pub index: AtomicI64,
    pub elapsed_ms: AtomicI64,
    pub step_ms: AtomicI64,
}

impl TestClock {
    pub fn round(&self) -> Round {
        self.current_round()
    }
}

impl RoundClock for TestClock {
    fn round_index(&self) -> RoundIndex {
        self.index.load(Ordering::SeqCst)
    }

    fn round_timestamp(&self) -> Timestamp {
        Timestamp::from_millis(self.round_index().max(0) as u64 * ROUND_MS)
    }

    fn round_duration(&self) -> Duration {
        Duration::from_millis(ROUND_MS)
    }

    fn remaining_time(&self, _start: Timestamp, budget: Duration) -> i64 {
        let step = self.step_ms.load(Ordering::SeqCst);
        let elapsed = self.elapsed_ms.fetch_add(step, Ordering::SeqCst);
        budget.as_millis() as i64 - elapsed
    }
}

pub(crate) struct TestChain;

impl ChainHandler for TestChain {
    fn current_block_header(&self) -> Option<BlockHeader> {
        None
    }

    fn genesis_header(&self) -> Option<BlockHeader> {
        Some(BlockHeader {
            rand_seed: RandomSeed::new(b"genesis".to_vec()),
            ..BlockHeader::default()
        })
    }
}

#[derive(Default)]
pub(crate) struct TestBootstrapper(pub AtomicBool);

impl Bootstrapper for TestBootstrapper {
    fn should_sync(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct TestSigner {
    pub resets: AtomicUsize,
    pub fail_reset: AtomicBool,
    pub stored: Mutex<Vec<u16>>,
}

impl MultiSigner for TestSigner {
    fn reset(&self, _public_keys: &[PublicKey], _self_index: Option<u16>) -> Result<(), String> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reset.load(Ordering::SeqCst) {
            return Err("re-key failed".to_string());
        }
        Ok(())
    }

    fn create_signature_share(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        Ok(message[..4].to_vec())
    }

    fn store_signature_share(&self, index: u16, _share: &[u8]) -> Result<(), String> {
        self.stored.lock().unwrap().push(index);
        Ok(())
    }

    fn aggregate(&self, signers: &[u16]) -> Result<Vec<u8>, String> {
        Ok(signers.iter().map(|index| *index as u8).collect())
    }
}

#[derive(Default)]
pub(crate) struct TestBroadcaster {
    pub sent: Mutex<Vec<ConsensusMessage>>,
}

impl Broadcaster for TestBroadcaster {
    fn broadcast(&self, message: ConsensusMessage) -> Result<(), String> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Runs inside a collaborator call, to move the node along mid-call.
pub(crate) type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct TestBlocks {
    pub committed: Mutex<Vec<BlockHeader>>,
    pub on_process: Mutex<Option<Hook>>,
}

impl BlockProcessor for TestBlocks {
    fn create_block(&self, round: &Round, shard_id: ShardId) -> Result<BlockHeader, String> {
        Ok(BlockHeader {
            nonce: round.index as u64,
            round: round.index,
            shard_id,
            rand_seed: RandomSeed::new(round.index.to_be_bytes().to_vec()),
            ..BlockHeader::default()
        })
    }

    fn process_block(&self, _header: &BlockHeader) -> Result<(), String> {
        if let Some(hook) = self.on_process.lock().unwrap().as_ref() {
            hook();
        }
        Ok(())
    }

    fn commit_block(&self, header: &BlockHeader, _signature: &[u8]) -> Result<(), String> {
        self.committed.lock().unwrap().push(header.clone());
        Ok(())
    }
}

pub(crate) struct Harness {
    pub core: Arc<ConsensusCore>,
    pub state: Arc<ConsensusState>,
    pub clock: Arc<TestClock>,
    pub bootstrapper: Arc<TestBootstrapper>,
    pub signer: Arc<TestSigner>,
    pub broadcaster: Arc<TestBroadcaster>,
    pub blocks: Arc<TestBlocks>,
}

impl Harness {
    /// Shard 0 of a single-shard network; every validator sits in the group.
    pub fn new(validators: &[u8], self_key: u8) -> Self {
        let coordinator = IndexHashedNodesCoordinator::new(validators.len(), 1).unwrap();
        let mut shards = ValidatorsPerShard::new();
        shards.insert(0, validators.iter().map(|byte| pk(*byte)).collect());
        coordinator.set_nodes_per_shards(0, shards);
        Self::with_coordinator(Arc::new(coordinator), self_key)
    }

    pub fn with_coordinator(coordinator: Arc<dyn NodesCoordinator>, self_key: u8) -> Self {
        let clock = Arc::new(TestClock::default());
        let bootstrapper = Arc::new(TestBootstrapper::default());
        let signer = Arc::new(TestSigner::default());
        let broadcaster = Arc::new(TestBroadcaster::default());
        let blocks = Arc::new(TestBlocks::default());
        let core = ConsensusCore::builder()
            .self_public_key(pk(self_key))
            .shard_coordinator(ShardCoordinator::new(1, 0).unwrap())
            .clock(clock.clone())
            .chain(Arc::new(TestChain))
            .bootstrapper(bootstrapper.clone())
            .multi_signer(signer.clone())
            .broadcaster(broadcaster.clone())
            .block_processor(blocks.clone())
            .nodes_coordinator(coordinator)
            .build()
            .unwrap();
        Self {
            state: Arc::new(ConsensusState::new(pk(self_key))),
            core: Arc::new(core),
            clock,
            bootstrapper,
            signer,
            broadcaster,
            blocks,
        }
    }

    pub fn sent(&self) -> Vec<ConsensusMessage> {
        self.broadcaster.sent.lock().unwrap().clone()
    }
}
