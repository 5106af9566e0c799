//! Block header view consumed by consensus.
//!
//! Only the fields consensus reads are modelled: the epoch, the randomness seed used
//! to derive the next consensus group, and the epoch-start marker. The full block
//! structure lives with the block processor.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Epoch, RoundIndex, ShardId};

type Blake2b256 = Blake2b<U32>;

/// Unpredictable bytes carried by each header; seeds the next consensus group.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RandomSeed(Vec<u8>);

impl RandomSeed {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RandomSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomSeed({})", hex::encode(&self.0))
    }
}

/// A block header as seen by the consensus engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub nonce: u64,
    pub round: RoundIndex,
    pub epoch: Epoch,
    pub shard_id: ShardId,
    pub rand_seed: RandomSeed,
    pub prev_rand_seed: RandomSeed,
    pub is_start_of_epoch: bool,
}

impl BlockHeader {
    /// Blake2b-256 digest over every header field, in declaration order.
    ///
    /// This is the message validators sign during the signature phase.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Blake2b256::new();
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(self.round.to_be_bytes());
        hasher.update(self.epoch.to_be_bytes());
        hasher.update(self.shard_id.to_be_bytes());
        hasher.update((self.rand_seed.0.len() as u64).to_be_bytes());
        hasher.update(&self.rand_seed.0);
        hasher.update((self.prev_rand_seed.0.len() as u64).to_be_bytes());
        hasher.update(&self.prev_rand_seed.0);
        hasher.update([self.is_start_of_epoch as u8]);
        let mut output = [0u8; 32];
        output.copy_from_slice(&hasher.finalize());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(seed: &[u8]) -> BlockHeader {
        BlockHeader {
            nonce: 7,
            round: 42,
            epoch: 3,
            shard_id: 1,
            rand_seed: RandomSeed::new(seed.to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(header(b"seed").hash(), header(b"seed").hash());
    }

    #[test]
    fn hash_covers_seed_boundaries() {
        let mut a = header(b"ab");
        a.prev_rand_seed = RandomSeed::new(b"c".to_vec());
        let mut b = header(b"a");
        b.prev_rand_seed = RandomSeed::new(b"bc".to_vec());
        assert_ne!(a.hash(), b.hash());
    }
}
