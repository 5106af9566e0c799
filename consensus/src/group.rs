//! Consensus group derivation.
//!
//! The group for a round is a pure function of the randomness seed of the current
//! block header (genesis while bootstrapping), the round index, the shard and the
//! header's epoch. Validator selection itself is delegated to the nodes coordinator.

use std::fmt;
use std::sync::Arc;

use spos_sharding::NodesCoordinator;
use spos_types::{BlockHeader, Epoch, PublicKey, RoundIndex, ShardId};

use crate::ports::ChainHandler;
use crate::ConsensusError;

/// Ordered validators for one round. Never empty; the first member leads.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsensusGroup {
    members: Vec<PublicKey>,
}

impl ConsensusGroup {
    pub fn new(members: Vec<PublicKey>) -> Result<Self, ConsensusError> {
        if members.is_empty() {
            return Err(ConsensusError::EmptyConsensusGroup);
        }
        Ok(Self { members })
    }

    pub fn leader(&self) -> &PublicKey {
        &self.members[0]
    }

    pub fn members(&self) -> &[PublicKey] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn index_of(&self, public_key: &PublicKey) -> Option<usize> {
        self.members.iter().position(|member| member == public_key)
    }

    pub fn contains(&self, public_key: &PublicKey) -> bool {
        self.index_of(public_key).is_some()
    }
}

impl fmt::Debug for ConsensusGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsensusGroup")
            .field("leader", &self.leader().to_string())
            .field("size", &self.members.len())
            .finish()
    }
}

/// Derives consensus groups from chain state and the nodes coordinator.
pub struct ConsensusGroupSelector {
    nodes_coordinator: Arc<dyn NodesCoordinator>,
    chain: Arc<dyn ChainHandler>,
}

impl ConsensusGroupSelector {
    pub fn new(nodes_coordinator: Arc<dyn NodesCoordinator>, chain: Arc<dyn ChainHandler>) -> Self {
        Self {
            nodes_coordinator,
            chain,
        }
    }

    /// Header whose seed drives the next selection: the current one, else genesis.
    pub fn seed_header(&self) -> Result<BlockHeader, ConsensusError> {
        self.chain
            .current_block_header()
            .or_else(|| self.chain.genesis_header())
            .ok_or(ConsensusError::NilHeader)
    }

    /// Group for `round_index` in `shard_id`, seeded from the chain tip, together
    /// with the header that supplied the seed.
    pub fn select(
        &self,
        round_index: RoundIndex,
        shard_id: ShardId,
    ) -> Result<(ConsensusGroup, BlockHeader), ConsensusError> {
        let header = self.seed_header()?;
        let group =
            self.select_with_seed(header.rand_seed.as_bytes(), round_index, shard_id, header.epoch)?;
        Ok((group, header))
    }

    pub fn select_with_seed(
        &self,
        seed: &[u8],
        round_index: RoundIndex,
        shard_id: ShardId,
        epoch: Epoch,
    ) -> Result<ConsensusGroup, ConsensusError> {
        let round =
            u64::try_from(round_index).map_err(|_| ConsensusError::RoundBeforeGenesis(round_index))?;
        let members = self
            .nodes_coordinator
            .compute_consensus_group(seed, round, shard_id, epoch)?;
        ConsensusGroup::new(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spos_sharding::{IndexHashedNodesCoordinator, ValidatorsPerShard};
    use spos_types::RandomSeed;

    struct FixedChain {
        current: Option<BlockHeader>,
        genesis: Option<BlockHeader>,
    }

    impl ChainHandler for FixedChain {
        fn current_block_header(&self) -> Option<BlockHeader> {
            self.current.clone()
        }

        fn genesis_header(&self) -> Option<BlockHeader> {
            self.genesis.clone()
        }
    }

    fn coordinator() -> Arc<IndexHashedNodesCoordinator> {
        let coordinator = IndexHashedNodesCoordinator::new(3, 3).unwrap();
        let mut shards = ValidatorsPerShard::new();
        shards.insert(0, (0u8..6).map(|i| PublicKey::new(vec![i; 4])).collect());
        coordinator.set_nodes_per_shards(0, shards);
        Arc::new(coordinator)
    }

    fn header(seed: u8) -> BlockHeader {
        BlockHeader {
            rand_seed: RandomSeed::new(vec![seed; 8]),
            ..BlockHeader::default()
        }
    }

    #[test]
    fn leader_is_first_member() {
        let group = ConsensusGroup::new(vec![PublicKey::new(vec![9]), PublicKey::new(vec![1])])
            .unwrap();
        assert_eq!(group.leader(), &PublicKey::new(vec![9]));
        assert_eq!(group.index_of(&PublicKey::new(vec![1])), Some(1));
    }

    #[test]
    fn empty_group_rejected() {
        assert!(matches!(
            ConsensusGroup::new(Vec::new()),
            Err(ConsensusError::EmptyConsensusGroup)
        ));
    }

    #[test]
    fn falls_back_to_genesis_seed() {
        let from_genesis = ConsensusGroupSelector::new(
            coordinator(),
            Arc::new(FixedChain {
                current: None,
                genesis: Some(header(7)),
            }),
        );
        let from_tip = ConsensusGroupSelector::new(
            coordinator(),
            Arc::new(FixedChain {
                current: Some(header(7)),
                genesis: Some(header(1)),
            }),
        );
        let (group, seed_header) = from_genesis.select(5, 0).unwrap();
        assert_eq!(seed_header, header(7));
        assert_eq!(group, from_tip.select(5, 0).unwrap().0);
    }

    #[test]
    fn no_header_is_an_error() {
        let selector = ConsensusGroupSelector::new(
            coordinator(),
            Arc::new(FixedChain {
                current: None,
                genesis: None,
            }),
        );
        assert!(matches!(selector.select(1, 0), Err(ConsensusError::NilHeader)));
    }

    #[test]
    fn negative_round_rejected() {
        let selector = ConsensusGroupSelector::new(
            coordinator(),
            Arc::new(FixedChain {
                current: Some(header(2)),
                genesis: None,
            }),
        );
        assert!(matches!(
            selector.select(-1, 0),
            Err(ConsensusError::RoundBeforeGenesis(-1))
        ));
    }
}
