//! Nullable nodes coordinator — fixed, ordered eligible lists per epoch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use spos_sharding::{NodesCoordinator, NodesCoordinatorError, ValidatorsPerShard};
use spos_types::{Epoch, PublicKey, ShardId};

use crate::locked;

/// Returns each shard's eligible list, in insertion order, as the consensus group.
///
/// The first validator listed for a shard therefore leads every round, which keeps
/// scenarios readable. Epochs can be made to fail on fetch.
#[derive(Default)]
pub struct NullNodesCoordinator {
    epochs: Mutex<HashMap<Epoch, ValidatorsPerShard>>,
    failing_epochs: Mutex<HashSet<Epoch>>,
    group_calls: AtomicUsize,
}

impl NullNodesCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_validators(&self, epoch: Epoch, shard_id: ShardId, validators: Vec<PublicKey>) {
        locked(&self.epochs)
            .entry(epoch)
            .or_default()
            .insert(shard_id, validators);
    }

    /// Make every fetch for `epoch` fail.
    pub fn fail_epoch(&self, epoch: Epoch) {
        locked(&self.failing_epochs).insert(epoch);
    }

    pub fn group_calls(&self) -> usize {
        self.group_calls.load(Ordering::SeqCst)
    }

    fn epoch(&self, epoch: Epoch) -> Result<ValidatorsPerShard, NodesCoordinatorError> {
        if locked(&self.failing_epochs).contains(&epoch) {
            return Err(NodesCoordinatorError::EpochNotFound(epoch));
        }
        locked(&self.epochs)
            .get(&epoch)
            .cloned()
            .ok_or(NodesCoordinatorError::EpochNotFound(epoch))
    }
}

impl NodesCoordinator for NullNodesCoordinator {
    /// An empty shard list yields an empty group rather than an error.
    fn compute_consensus_group(
        &self,
        _randomness: &[u8],
        _round: u64,
        shard_id: ShardId,
        epoch: Epoch,
    ) -> Result<Vec<PublicKey>, NodesCoordinatorError> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .epoch(epoch)?
            .remove(&shard_id)
            .unwrap_or_default())
    }

    fn validators_indexes(
        &self,
        public_keys: &[PublicKey],
        epoch: Epoch,
    ) -> Result<Vec<u64>, NodesCoordinatorError> {
        let shards = self.epoch(epoch)?;
        public_keys
            .iter()
            .map(|public_key| {
                shards
                    .values()
                    .find_map(|list| list.iter().position(|candidate| candidate == public_key))
                    .map(|position| position as u64)
                    .ok_or_else(|| NodesCoordinatorError::ValidatorNotFound(public_key.to_hex(), epoch))
            })
            .collect()
    }

    fn all_validators_public_keys(
        &self,
        epoch: Epoch,
    ) -> Result<ValidatorsPerShard, NodesCoordinatorError> {
        self.epoch(epoch)
    }

    fn consensus_group_size(&self, shard_id: ShardId) -> usize {
        locked(&self.epochs)
            .values()
            .filter_map(|shards| shards.get(&shard_id).map(Vec::len))
            .max()
            .unwrap_or(0)
    }
}
