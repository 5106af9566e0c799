//! The subround capability interface and extension policies.
//!
//! A subround is one phase of a consensus round. The controller drives it through
//! three behaviours: `execute` (the job, run once), `is_finished` (the completion
//! check, polled) and `extend` (asked when the check is still false at the deadline).

use std::fmt;
use std::time::Duration;

use spos_types::Round;

/// Identifies a phase within the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubroundId(pub u8);

impl fmt::Display for SubroundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-round completion status of a phase. Never demoted within a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SubroundStatus {
    #[default]
    NotFinished,
    Finished,
}

/// Lifecycle of a phase as tracked by the controller within one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubroundPhase {
    Pending,
    Running,
    Extended,
    Finished,
    Canceled,
}

/// Result of a phase's job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job did its work.
    Done,
    /// Nothing to do for this node in this round (e.g. not the leader).
    Skipped,
    /// The job could not complete; the check decides whether the phase still finishes.
    Failed,
}

/// Answer of the extension policy at a phase deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendDecision {
    /// Keep polling with the deadline pushed back by `extra`.
    Grant { extra: Duration },
    /// Give up on the round.
    Cancel,
}

/// One phase of the consensus pipeline.
pub trait Subround: Send + Sync {
    fn id(&self) -> SubroundId;

    fn name(&self) -> &'static str;

    /// Share of the round duration, counted from the round start, by which this phase
    /// must be finished.
    fn budget_percentage(&self) -> u32;

    fn execute(&self) -> JobOutcome;

    fn is_finished(&self) -> bool;

    fn extend(&self) -> ExtendDecision;
}

/// Decides what happens when a phase misses its deadline.
pub trait ExtendPolicy: Send + Sync {
    fn extend(&self, subround: SubroundId, round: &Round) -> ExtendDecision;
}

/// Every missed deadline cancels the round.
#[derive(Clone, Copy, Debug, Default)]
pub struct CancelOnTimeout;

impl ExtendPolicy for CancelOnTimeout {
    fn extend(&self, subround: SubroundId, round: &Round) -> ExtendDecision {
        tracing::debug!(%subround, round = round.index, "deadline missed, no extension");
        ExtendDecision::Cancel
    }
}

/// Grants a fixed share of the round. The controller honours one grant per phase.
#[derive(Clone, Copy, Debug)]
pub struct GrantOnce {
    extra_percentage: u32,
}

impl GrantOnce {
    pub fn new(extra_percentage: u32) -> Self {
        Self { extra_percentage }
    }
}

impl ExtendPolicy for GrantOnce {
    fn extend(&self, subround: SubroundId, round: &Round) -> ExtendDecision {
        let extra = round.fraction(self.extra_percentage);
        tracing::debug!(%subround, round = round.index, ?extra, "deadline extension requested");
        ExtendDecision::Grant { extra }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spos_types::Timestamp;

    #[test]
    fn grant_once_scales_with_round() {
        let round = Round::new(1, Timestamp::EPOCH, Duration::from_secs(4));
        assert_eq!(
            GrantOnce::new(10).extend(SubroundId(2), &round),
            ExtendDecision::Grant {
                extra: Duration::from_millis(400)
            }
        );
        assert_eq!(
            CancelOnTimeout.extend(SubroundId(2), &round),
            ExtendDecision::Cancel
        );
    }
}
