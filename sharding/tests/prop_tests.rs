use proptest::prelude::*;
use std::collections::HashSet;

use spos_sharding::{IndexHashedNodesCoordinator, NodesCoordinator, ValidatorsPerShard};
use spos_types::PublicKey;

fn coordinator(eligible: usize, group: usize) -> IndexHashedNodesCoordinator {
    let nc = IndexHashedNodesCoordinator::new(group, 1).unwrap();
    let keys = (0..eligible)
        .map(|i| PublicKey::new((i as u32).to_be_bytes().to_vec()))
        .collect();
    let mut map = ValidatorsPerShard::new();
    map.insert(0, keys);
    nc.set_nodes_per_shards(1, map);
    nc
}

proptest! {
    /// For fixed inputs and validator set, derivation returns the same ordered group.
    #[test]
    fn derivation_is_deterministic(
        seed in prop::collection::vec(any::<u8>(), 1..64),
        round in any::<u64>(),
        eligible in 1usize..40,
        group in 1usize..40,
    ) {
        let nc = coordinator(eligible, group);
        let first = nc.compute_consensus_group(&seed, round, 0, 1).unwrap();
        let second = nc.compute_consensus_group(&seed, round, 0, 1).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), group.min(eligible));
    }

    /// Every group is a duplicate-free subset of the eligible list.
    #[test]
    fn group_is_subset_without_duplicates(
        seed in prop::collection::vec(any::<u8>(), 1..64),
        round in any::<u64>(),
        eligible in 1usize..40,
    ) {
        let nc = coordinator(eligible, 16);
        let all: HashSet<PublicKey> = nc.all_validators_public_keys(1).unwrap()[&0]
            .iter()
            .cloned()
            .collect();
        let group = nc.compute_consensus_group(&seed, round, 0, 1).unwrap();
        let unique: HashSet<PublicKey> = group.iter().cloned().collect();
        prop_assert_eq!(unique.len(), group.len());
        prop_assert!(unique.is_subset(&all));
    }
}
