//! Phase deadlines.
//!
//! A phase's budget is `percentage × round.duration`, measured from the round start.
//! Remaining time is `budget − elapsed`; the controller treats `<= 0` at a poll
//! boundary as a timeout.

use std::time::Duration;

use spos_types::Round;

use crate::ports::RoundClock;

/// Budget of a phase that must finish by `percentage` of `round`.
pub fn phase_budget(round: &Round, percentage: u32) -> Duration {
    round.fraction(percentage.min(100))
}

/// Milliseconds left before the phase budget runs out; negative once overrun.
pub fn remaining_millis(clock: &dyn RoundClock, round: &Round, budget: Duration) -> i64 {
    clock.remaining_time(round.start_time, budget)
}

/// Deadline of one phase within one round, with room for a single extension.
#[derive(Clone, Copy, Debug)]
pub struct PhaseDeadline {
    round: Round,
    budget: Duration,
    extended: bool,
}

impl PhaseDeadline {
    pub fn new(round: Round, percentage: u32) -> Self {
        Self {
            round,
            budget: phase_budget(&round, percentage),
            extended: false,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn remaining(&self, clock: &dyn RoundClock) -> i64 {
        remaining_millis(clock, &self.round, self.budget)
    }

    /// Push the deadline back by `extra`, capped at the end of the round.
    ///
    /// Returns false when an extension was already granted or the budget already
    /// covers the whole round.
    pub fn try_extend(&mut self, extra: Duration) -> bool {
        if self.extended || self.budget >= self.round.duration || extra.is_zero() {
            return false;
        }
        self.budget = (self.budget + extra).min(self.round.duration);
        self.extended = true;
        true
    }
}
