//! Nullable block processor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use spos_consensus::BlockProcessor;
use spos_types::{BlockHeader, RandomSeed, Round, ShardId};

use crate::locked;

/// Builds headers straight from the round and records commits.
#[derive(Default)]
pub struct NullBlockProcessor {
    reject_blocks: AtomicBool,
    processed: Mutex<Vec<BlockHeader>>,
    committed: Mutex<Vec<(BlockHeader, Vec<u8>)>>,
}

impl NullBlockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make creation and validation fail.
    pub fn reject_blocks(&self, reject: bool) {
        self.reject_blocks.store(reject, Ordering::SeqCst);
    }

    pub fn processed(&self) -> Vec<BlockHeader> {
        locked(&self.processed).clone()
    }

    pub fn committed(&self) -> Vec<(BlockHeader, Vec<u8>)> {
        locked(&self.committed).clone()
    }
}

impl BlockProcessor for NullBlockProcessor {
    fn create_block(&self, round: &Round, shard_id: ShardId) -> Result<BlockHeader, String> {
        if self.reject_blocks.load(Ordering::SeqCst) {
            return Err("null block processor: creation refused".to_string());
        }
        Ok(BlockHeader {
            nonce: round.index.max(0) as u64,
            round: round.index,
            shard_id,
            rand_seed: RandomSeed::new(round.index.to_be_bytes().to_vec()),
            ..BlockHeader::default()
        })
    }

    fn process_block(&self, header: &BlockHeader) -> Result<(), String> {
        if self.reject_blocks.load(Ordering::SeqCst) {
            return Err("null block processor: invalid block".to_string());
        }
        locked(&self.processed).push(header.clone());
        Ok(())
    }

    fn commit_block(&self, header: &BlockHeader, aggregated_signature: &[u8]) -> Result<(), String> {
        locked(&self.committed).push((header.clone(), aggregated_signature.to_vec()));
        Ok(())
    }
}
