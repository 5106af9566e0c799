//! Consensus round descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::Timestamp;

/// Index of a round since genesis. Negative before genesis.
pub type RoundIndex = i64;

/// A fixed-duration time slot in which one consensus instance runs.
///
/// Immutable once started; the controller creates a new value on every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub index: RoundIndex,
    pub start_time: Timestamp,
    pub duration: Duration,
}

impl Round {
    pub fn new(index: RoundIndex, start_time: Timestamp, duration: Duration) -> Self {
        Self {
            index,
            start_time,
            duration,
        }
    }

    /// The share of this round's duration given by `percentage` (0..=100).
    pub fn fraction(&self, percentage: u32) -> Duration {
        self.duration * percentage / 100
    }

    /// Wall-clock instant at which this round ends.
    pub fn end_time(&self) -> Timestamp {
        self.start_time.saturating_add(self.duration)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {} @ {}", self.index, self.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_of_round_duration() {
        let round = Round::new(42, Timestamp::from_millis(0), Duration::from_secs(5));
        assert_eq!(round.fraction(25), Duration::from_millis(1_250));
        assert_eq!(round.fraction(100), Duration::from_secs(5));
        assert_eq!(round.end_time(), Timestamp::from_millis(5_000));
    }
}
