//! Wall-clock [`RoundClock`] anchored at the chain's genesis time.

use std::time::Duration;

use spos_types::{Round, RoundIndex, Timestamp};

use crate::ports::RoundClock;
use crate::ConsensusError;

/// Rounds of fixed duration counted from genesis. Index is negative before genesis.
#[derive(Clone, Copy, Debug)]
pub struct SystemRoundClock {
    genesis: Timestamp,
    round_duration: Duration,
}

impl SystemRoundClock {
    pub fn new(genesis: Timestamp, round_duration: Duration) -> Result<Self, ConsensusError> {
        if round_duration.as_millis() == 0 {
            return Err(ConsensusError::InvalidConfig(
                "round duration must be at least one millisecond".to_string(),
            ));
        }
        Ok(Self {
            genesis,
            round_duration,
        })
    }

    fn round_at(&self, now: Timestamp) -> Round {
        let duration_ms = self.round_duration.as_millis() as i64;
        let index: RoundIndex = now.millis_since(self.genesis).div_euclid(duration_ms);
        let start_ms = self.genesis.as_millis() as i64 + index * duration_ms;
        Round::new(
            index,
            Timestamp::from_millis(start_ms.max(0) as u64),
            self.round_duration,
        )
    }
}

impl RoundClock for SystemRoundClock {
    fn round_index(&self) -> RoundIndex {
        self.round_at(Timestamp::now()).index
    }

    fn round_timestamp(&self) -> Timestamp {
        self.round_at(Timestamp::now()).start_time
    }

    fn round_duration(&self) -> Duration {
        self.round_duration
    }

    fn remaining_time(&self, start: Timestamp, budget: Duration) -> i64 {
        start.saturating_add(budget).millis_since(Timestamp::now())
    }

    fn current_round(&self) -> Round {
        self.round_at(Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> SystemRoundClock {
        SystemRoundClock::new(Timestamp::from_millis(10_000), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn rounds_count_from_genesis() {
        let round = clock().round_at(Timestamp::from_millis(10_000 + 42 * 5_000 + 100));
        assert_eq!(round.index, 42);
        assert_eq!(round.start_time, Timestamp::from_millis(10_000 + 42 * 5_000));
    }

    #[test]
    fn index_is_negative_before_genesis() {
        let round = clock().round_at(Timestamp::from_millis(9_999));
        assert_eq!(round.index, -1);
    }

    #[test]
    fn remaining_time_is_positive_for_future_deadline() {
        let c = clock();
        let now = Timestamp::now();
        assert!(c.remaining_time(now, Duration::from_secs(60)) > 0);
        assert!(c.remaining_time(Timestamp::from_millis(0), Duration::from_secs(1)) < 0);
    }

    #[test]
    fn zero_duration_rejected() {
        assert!(SystemRoundClock::new(Timestamp::EPOCH, Duration::ZERO).is_err());
    }
}
