//! Timestamp type used by round scheduling.
//!
//! Round budgets are fractions of a few seconds, so timestamps carry Unix epoch
//! milliseconds rather than seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A Unix timestamp in milliseconds since epoch (UTC).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A system clock set before the Unix epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by `duration`, saturating at `u64::MAX`.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// Signed milliseconds from `earlier` to this timestamp.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_since_is_signed() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(1_250);
        assert_eq!(b.millis_since(a), 250);
        assert_eq!(a.millis_since(b), -250);
    }

    #[test]
    fn saturating_add_shifts_by_duration() {
        let t = Timestamp::from_millis(5_000).saturating_add(Duration::from_millis(1_250));
        assert_eq!(t.as_millis(), 6_250);
        let max = Timestamp::from_millis(u64::MAX).saturating_add(Duration::from_secs(1));
        assert_eq!(max.as_millis(), u64::MAX);
    }
}
