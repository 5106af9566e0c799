//! Nullable clock — deterministic round time for testing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use spos_consensus::RoundClock;
use spos_types::{RoundIndex, Timestamp};

/// A deterministic round clock anchored at the Unix epoch.
///
/// Time only advances when you tell it to.
pub struct NullClock {
    now_ms: AtomicU64,
    round_duration: Duration,
}

impl NullClock {
    pub fn new(round_duration: Duration) -> Self {
        Self {
            now_ms: AtomicU64::new(0),
            round_duration,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms.load(Ordering::SeqCst))
    }

    /// Jump to the start of round `index`.
    pub fn set_round(&self, index: u64) {
        let start = index * self.round_duration.as_millis() as u64;
        self.now_ms.store(start, Ordering::SeqCst);
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Elapsed time within the current round.
    pub fn elapsed_in_round(&self) -> Duration {
        let duration = self.round_duration.as_millis() as u64;
        Duration::from_millis(self.now_ms.load(Ordering::SeqCst) % duration)
    }
}

impl RoundClock for NullClock {
    fn round_index(&self) -> RoundIndex {
        (self.now_ms.load(Ordering::SeqCst) / self.round_duration.as_millis() as u64) as RoundIndex
    }

    fn round_timestamp(&self) -> Timestamp {
        let duration = self.round_duration.as_millis() as u64;
        Timestamp::from_millis(self.round_index() as u64 * duration)
    }

    fn round_duration(&self) -> Duration {
        self.round_duration
    }

    fn remaining_time(&self, start: Timestamp, budget: Duration) -> i64 {
        start.saturating_add(budget).millis_since(self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time_goes_negative_past_budget() {
        let clock = NullClock::new(Duration::from_secs(5));
        clock.set_round(42);
        let start = clock.round_timestamp();
        clock.advance(Duration::from_millis(1_300));
        assert_eq!(clock.round_index(), 42);
        assert_eq!(clock.remaining_time(start, Duration::from_millis(1_250)), -50);
        assert_eq!(clock.elapsed_in_round(), Duration::from_millis(1_300));
    }
}
