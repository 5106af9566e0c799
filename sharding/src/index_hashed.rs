//! Reference [`NodesCoordinator`]: consensus groups drawn by index hashing.
//!
//! A selection key is derived from `(randomness, round, shard, epoch)`. Each draw
//! hashes the key with the draw number and picks `hash mod remaining` from the
//! candidates not yet chosen, so a group never contains the same validator twice and
//! every honest node computes the identical ordered group.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use spos_types::{Epoch, PublicKey, ShardId, METACHAIN_SHARD_ID};

use crate::{NodesCoordinator, NodesCoordinatorError, ValidatorsPerShard};

type Blake2b256 = Blake2b<U32>;

/// Holds the eligible validators of each known epoch.
pub struct IndexHashedNodesCoordinator {
    shard_consensus_group_size: usize,
    meta_consensus_group_size: usize,
    epochs: RwLock<BTreeMap<Epoch, ValidatorsPerShard>>,
}

impl IndexHashedNodesCoordinator {
    pub fn new(
        shard_consensus_group_size: usize,
        meta_consensus_group_size: usize,
    ) -> Result<Self, NodesCoordinatorError> {
        if shard_consensus_group_size == 0 {
            return Err(NodesCoordinatorError::InvalidConsensusGroupSize {
                shard: 0,
                size: 0,
            });
        }
        if meta_consensus_group_size == 0 {
            return Err(NodesCoordinatorError::InvalidConsensusGroupSize {
                shard: METACHAIN_SHARD_ID,
                size: 0,
            });
        }
        Ok(Self {
            shard_consensus_group_size,
            meta_consensus_group_size,
            epochs: RwLock::new(BTreeMap::new()),
        })
    }

    /// Install (or replace) the eligible lists of `epoch`.
    pub fn set_nodes_per_shards(&self, epoch: Epoch, validators: ValidatorsPerShard) {
        tracing::debug!(epoch, shards = validators.len(), "nodes coordinator epoch config set");
        self.epochs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(epoch, validators);
    }

    /// Forget every epoch older than `epoch`.
    pub fn prune_before(&self, epoch: Epoch) {
        let mut epochs = self.epochs.write().unwrap_or_else(PoisonError::into_inner);
        *epochs = epochs.split_off(&epoch);
    }
}

impl NodesCoordinator for IndexHashedNodesCoordinator {
    fn compute_consensus_group(
        &self,
        randomness: &[u8],
        round: u64,
        shard_id: ShardId,
        epoch: Epoch,
    ) -> Result<Vec<PublicKey>, NodesCoordinatorError> {
        if randomness.is_empty() {
            return Err(NodesCoordinatorError::EmptyRandomness);
        }

        let epochs = self.epochs.read().unwrap_or_else(PoisonError::into_inner);
        let validators = epochs
            .get(&epoch)
            .ok_or(NodesCoordinatorError::EpochNotFound(epoch))?;
        let eligible = validators
            .get(&shard_id)
            .filter(|list| !list.is_empty())
            .ok_or(NodesCoordinatorError::EmptyEligibleList {
                shard: shard_id,
                epoch,
            })?;

        let size = self.consensus_group_size(shard_id).min(eligible.len());
        let key = selection_key(randomness, round, shard_id, epoch);

        let mut candidates: Vec<&PublicKey> = eligible.iter().collect();
        let mut group = Vec::with_capacity(size);
        for draw in 0..size as u64 {
            let idx = draw_index(&key, draw, candidates.len());
            group.push(candidates.remove(idx).clone());
        }

        tracing::trace!(round, shard_id, epoch, size, "consensus group computed");
        Ok(group)
    }

    fn validators_indexes(
        &self,
        public_keys: &[PublicKey],
        epoch: Epoch,
    ) -> Result<Vec<u64>, NodesCoordinatorError> {
        let epochs = self.epochs.read().unwrap_or_else(PoisonError::into_inner);
        let validators = epochs
            .get(&epoch)
            .ok_or(NodesCoordinatorError::EpochNotFound(epoch))?;

        public_keys
            .iter()
            .map(|pk| {
                validators
                    .values()
                    .find_map(|list| list.iter().position(|v| v == pk))
                    .map(|pos| pos as u64)
                    .ok_or_else(|| NodesCoordinatorError::ValidatorNotFound(pk.to_string(), epoch))
            })
            .collect()
    }

    fn all_validators_public_keys(
        &self,
        epoch: Epoch,
    ) -> Result<ValidatorsPerShard, NodesCoordinatorError> {
        self.epochs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&epoch)
            .cloned()
            .ok_or(NodesCoordinatorError::EpochNotFound(epoch))
    }

    fn consensus_group_size(&self, shard_id: ShardId) -> usize {
        if shard_id == METACHAIN_SHARD_ID {
            self.meta_consensus_group_size
        } else {
            self.shard_consensus_group_size
        }
    }
}

fn selection_key(randomness: &[u8], round: u64, shard_id: ShardId, epoch: Epoch) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(randomness);
    hasher.update(round.to_be_bytes());
    hasher.update(shard_id.to_be_bytes());
    hasher.update(epoch.to_be_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

fn draw_index(key: &[u8; 32], draw: u64, remaining: usize) -> usize {
    let mut hasher = Blake2b256::new();
    hasher.update(key);
    hasher.update(draw.to_be_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % remaining as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn validators(shard: ShardId, n: u8) -> Vec<PublicKey> {
        (0..n)
            .map(|i| PublicKey::new(vec![shard as u8, i, 0xee]))
            .collect()
    }

    fn coordinator(group: usize) -> IndexHashedNodesCoordinator {
        let nc = IndexHashedNodesCoordinator::new(group, 2).unwrap();
        let mut map = ValidatorsPerShard::new();
        map.insert(0, validators(0, 10));
        map.insert(1, validators(1, 10));
        map.insert(METACHAIN_SHARD_ID, validators(9, 4));
        nc.set_nodes_per_shards(5, map);
        nc
    }

    #[test]
    fn same_inputs_same_group() {
        let nc = coordinator(4);
        let a = nc.compute_consensus_group(b"seed", 42, 0, 5).unwrap();
        let b = nc.compute_consensus_group(b"seed", 42, 0, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn group_has_no_duplicates() {
        let nc = coordinator(10);
        let group = nc.compute_consensus_group(b"seed", 1, 1, 5).unwrap();
        let unique: HashSet<_> = group.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn different_round_changes_order() {
        let nc = coordinator(10);
        let rounds: HashSet<Vec<PublicKey>> = (0..8)
            .map(|r| nc.compute_consensus_group(b"seed", r, 0, 5).unwrap())
            .collect();
        assert!(rounds.len() > 1);
    }

    #[test]
    fn meta_uses_meta_group_size() {
        let nc = coordinator(4);
        let group = nc
            .compute_consensus_group(b"seed", 3, METACHAIN_SHARD_ID, 5)
            .unwrap();
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn group_size_clamped_to_eligible_count() {
        let nc = IndexHashedNodesCoordinator::new(50, 1).unwrap();
        let mut map = ValidatorsPerShard::new();
        map.insert(0, validators(0, 3));
        nc.set_nodes_per_shards(0, map);
        assert_eq!(nc.compute_consensus_group(b"r", 0, 0, 0).unwrap().len(), 3);
    }

    #[test]
    fn missing_epoch_and_empty_shard_fail() {
        let nc = coordinator(4);
        assert!(matches!(
            nc.compute_consensus_group(b"seed", 1, 0, 6),
            Err(NodesCoordinatorError::EpochNotFound(6))
        ));
        assert!(matches!(
            nc.compute_consensus_group(b"seed", 1, 2, 5),
            Err(NodesCoordinatorError::EmptyEligibleList { shard: 2, epoch: 5 })
        ));
        assert!(matches!(
            nc.compute_consensus_group(b"", 1, 0, 5),
            Err(NodesCoordinatorError::EmptyRandomness)
        ));
    }

    #[test]
    fn validators_indexes_are_eligible_list_positions() {
        let nc = coordinator(4);
        let v = validators(1, 10);
        let idx = nc
            .validators_indexes(&[v[3].clone(), v[0].clone()], 5)
            .unwrap();
        assert_eq!(idx, vec![3, 0]);

        let unknown = PublicKey::new(vec![0xff]);
        assert!(nc.validators_indexes(&[unknown], 5).is_err());
    }

    #[test]
    fn prune_drops_old_epochs() {
        let nc = coordinator(4);
        nc.set_nodes_per_shards(6, ValidatorsPerShard::new());
        nc.prune_before(6);
        assert!(nc.all_validators_public_keys(5).is_err());
        assert!(nc.all_validators_public_keys(6).is_ok());
    }

    #[test]
    fn zero_group_size_rejected() {
        assert!(IndexHashedNodesCoordinator::new(0, 1).is_err());
        assert!(IndexHashedNodesCoordinator::new(1, 0).is_err());
    }
}
