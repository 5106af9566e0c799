use proptest::prelude::*;

use spos_types::{BlockHeader, RandomSeed, Round, Timestamp};
use std::time::Duration;

proptest! {
    /// Changing the randomness seed always changes the header digest.
    #[test]
    fn header_hash_depends_on_seed(
        a in prop::collection::vec(any::<u8>(), 1..48),
        b in prop::collection::vec(any::<u8>(), 1..48),
    ) {
        prop_assume!(a != b);
        let ha = BlockHeader { rand_seed: RandomSeed::new(a), ..Default::default() };
        let hb = BlockHeader { rand_seed: RandomSeed::new(b), ..Default::default() };
        prop_assert_ne!(ha.hash(), hb.hash());
    }

    /// A phase budget never exceeds the round it belongs to.
    #[test]
    fn fraction_never_exceeds_round(ms in 1u64..600_000, pct in 0u32..=100) {
        let round = Round::new(0, Timestamp::EPOCH, Duration::from_millis(ms));
        prop_assert!(round.fraction(pct) <= round.duration);
    }
}
