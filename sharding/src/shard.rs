//! The local node's placement in the shard layout.

use spos_types::{ShardId, METACHAIN_SHARD_ID};

use crate::NodesCoordinatorError;

/// Shard layout as seen from one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardCoordinator {
    self_id: ShardId,
    number_of_shards: u32,
}

impl ShardCoordinator {
    /// `self_id` must name one of the `number_of_shards` regular shards or the metachain.
    pub fn new(number_of_shards: u32, self_id: ShardId) -> Result<Self, NodesCoordinatorError> {
        if number_of_shards == 0 || (self_id >= number_of_shards && self_id != METACHAIN_SHARD_ID)
        {
            return Err(NodesCoordinatorError::InvalidShardId {
                shard: self_id,
                shards: number_of_shards,
            });
        }
        Ok(Self {
            self_id,
            number_of_shards,
        })
    }

    pub fn self_id(&self) -> ShardId {
        self.self_id
    }

    pub fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    pub fn is_metachain(&self) -> bool {
        self.self_id == METACHAIN_SHARD_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_regular_and_meta_shards() {
        assert_eq!(ShardCoordinator::new(3, 2).unwrap().self_id(), 2);
        assert!(ShardCoordinator::new(3, METACHAIN_SHARD_ID)
            .unwrap()
            .is_metachain());
    }

    #[test]
    fn rejects_out_of_range_shard() {
        assert!(matches!(
            ShardCoordinator::new(3, 3),
            Err(NodesCoordinatorError::InvalidShardId { shard: 3, shards: 3 })
        ));
        assert!(ShardCoordinator::new(0, 0).is_err());
    }
}
