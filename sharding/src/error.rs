use spos_types::{Epoch, ShardId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodesCoordinatorError {
    #[error("no validator configuration for epoch {0}")]
    EpochNotFound(Epoch),

    #[error("eligible list for shard {shard} in epoch {epoch} is empty")]
    EmptyEligibleList { shard: ShardId, epoch: Epoch },

    #[error("randomness seed is empty")]
    EmptyRandomness,

    #[error("invalid consensus group size {size} for shard {shard}")]
    InvalidConsensusGroupSize { shard: ShardId, size: usize },

    #[error("validator {0} not found in epoch {1}")]
    ValidatorNotFound(String, Epoch),

    #[error("invalid shard id {shard} for {shards} shards")]
    InvalidShardId { shard: ShardId, shards: u32 },
}
