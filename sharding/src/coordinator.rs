//! Validator-selection contract.

use std::collections::HashMap;

use spos_types::{Epoch, PublicKey, ShardId};

use crate::NodesCoordinatorError;

/// Every eligible validator of an epoch, grouped by shard.
pub type ValidatorsPerShard = HashMap<ShardId, Vec<PublicKey>>;

/// Answers "who validates where" for a given epoch.
///
/// Implementations must be deterministic: for a fixed validator set, the same
/// `(randomness, round, shard, epoch)` always yields the same ordered group, and the
/// first element is the round's leader.
pub trait NodesCoordinator: Send + Sync {
    /// The ordered consensus group for one round.
    fn compute_consensus_group(
        &self,
        randomness: &[u8],
        round: u64,
        shard_id: ShardId,
        epoch: Epoch,
    ) -> Result<Vec<PublicKey>, NodesCoordinatorError>;

    /// Positions of `public_keys` in their shard's eligible list for `epoch`.
    fn validators_indexes(
        &self,
        public_keys: &[PublicKey],
        epoch: Epoch,
    ) -> Result<Vec<u64>, NodesCoordinatorError>;

    /// The full eligible validator list of `epoch`, per shard.
    fn all_validators_public_keys(
        &self,
        epoch: Epoch,
    ) -> Result<ValidatorsPerShard, NodesCoordinatorError>;

    /// Number of validators drawn into each consensus group of `shard_id`.
    fn consensus_group_size(&self, shard_id: ShardId) -> usize;
}
