//! Drives the subround pipeline across successive rounds.
//!
//! One round is active at a time and its phases run strictly in order on the
//! controller's task. For every phase: a check that already holds finishes it, else
//! the job runs once and the check is polled until it holds, the round is canceled,
//! or the phase deadline passes. A missed deadline asks the phase for an extension;
//! at most one is honoured per phase and never past the end of the round.
//!
//! Jobs and checks call collaborators that may block (block creation, re-keying), so
//! they run on the blocking pool while the controller task awaits them.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{Instrument, Span};

use spos_types::{Round, RoundIndex};

use crate::config::ConsensusConfig;
use crate::core::ConsensusCore;
use crate::phases::Pipeline;
use crate::state::ConsensusState;
use crate::status::{METRIC_ROUNDS_CANCELED, METRIC_ROUNDS_COMPLETED};
use crate::subround::{
    ExtendDecision, JobOutcome, Subround, SubroundId, SubroundPhase, SubroundStatus,
};
use crate::telemetry::RoundIndexer;
use crate::timing::PhaseDeadline;
use crate::tracing_spans::{round_span, subround_span};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    Completed,
    /// `subround` is the phase during which the cancellation was observed.
    Canceled { subround: SubroundId },
}

/// How one round went, phase by phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundReport {
    pub round: RoundIndex,
    pub outcome: RoundOutcome,
    pub phases: Vec<(SubroundId, SubroundPhase)>,
}

pub struct SubroundController {
    core: Arc<ConsensusCore>,
    state: Arc<ConsensusState>,
    pipeline: Pipeline,
    poll_interval: Duration,
    /// Phase states of the round in progress, or of the last round run.
    progress: Mutex<Vec<(SubroundId, SubroundPhase)>>,
}

impl SubroundController {
    pub fn new(
        core: Arc<ConsensusCore>,
        state: Arc<ConsensusState>,
        pipeline: Pipeline,
        config: &ConsensusConfig,
    ) -> Self {
        Self {
            core,
            state,
            pipeline,
            poll_interval: config.poll_interval(),
            progress: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &Arc<ConsensusState> {
        &self.state
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn set_indexer(&self, indexer: Arc<dyn RoundIndexer>) -> bool {
        self.pipeline.set_indexer(indexer)
    }

    /// Where each phase of the current round stands; the active one is `Running`.
    pub fn progress(&self) -> Vec<(SubroundId, SubroundPhase)> {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, phases: &[(SubroundId, SubroundPhase)]) {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner) = phases.to_vec();
    }

    /// Run rounds until `shutdown` fires. A round in progress is abandoned at its
    /// next poll boundary.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let span = self.core.span().clone();
        async move {
            tracing::info!(phases = self.pipeline.len(), "consensus controller started");
            let mut last_round = None;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    report = self.next_round_report(last_round) => {
                        last_round = Some(report.round);
                        self.record(&report);
                    }
                }
            }
            tracing::info!("consensus controller stopped");
        }
        .instrument(span)
        .await
    }

    async fn next_round_report(&self, last_round: Option<RoundIndex>) -> RoundReport {
        let round = self.next_round(last_round).await;
        self.run_round(round).await
    }

    /// Wait for a round after `last_round` that is not before genesis.
    async fn next_round(&self, last_round: Option<RoundIndex>) -> Round {
        loop {
            let round = self.core.clock().current_round();
            if round.index >= 0 && last_round.map_or(true, |last| round.index > last) {
                return round;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Run every phase of `round` in pipeline order.
    pub async fn run_round(&self, round: Round) -> RoundReport {
        let span = round_span(self.core.span(), round.index);
        self.run_phases(round).instrument(span).await
    }

    async fn run_phases(&self, round: Round) -> RoundReport {
        self.state.reset_for_new_round(round);
        tracing::debug!(start = ?round.start_time, duration = ?round.duration, "round started");

        let mut phases: Vec<(SubroundId, SubroundPhase)> = self
            .pipeline
            .subrounds()
            .iter()
            .map(|subround| (subround.id(), SubroundPhase::Pending))
            .collect();
        self.publish(&phases);
        let mut outcome = RoundOutcome::Completed;

        for (slot, subround) in self.pipeline.subrounds().iter().enumerate() {
            if self.state.is_canceled() {
                phases[slot].1 = SubroundPhase::Canceled;
                outcome = RoundOutcome::Canceled {
                    subround: subround.id(),
                };
                break;
            }
            phases[slot].1 = SubroundPhase::Running;
            self.publish(&phases);
            let span = subround_span(self.core.span(), subround.name());
            let (phase, extended) = self
                .run_subround(subround, round)
                .instrument(span)
                .await;
            phases[slot].1 = if phase == SubroundPhase::Finished && extended {
                SubroundPhase::Extended
            } else {
                phase
            };
            if phase == SubroundPhase::Canceled {
                outcome = RoundOutcome::Canceled {
                    subround: subround.id(),
                };
                break;
            }
        }

        self.publish(&phases);
        RoundReport {
            round: round.index,
            outcome,
            phases,
        }
    }

    /// Returns the terminal phase and whether an extension was used.
    async fn run_subround(
        &self,
        subround: &Arc<dyn Subround>,
        round: Round,
    ) -> (SubroundPhase, bool) {
        let id = subround.id();
        if is_finished(subround).await {
            self.state.set_status(id, SubroundStatus::Finished);
            tracing::trace!("subround already satisfied");
            return (SubroundPhase::Finished, false);
        }

        let outcome = match blocking(subround, |subround| subround.execute()).await {
            Some(outcome) => outcome,
            None => {
                self.state.cancel_round();
                JobOutcome::Failed
            }
        };
        tracing::trace!(?outcome, "subround job executed");

        let clock = self.core.clock();
        let mut deadline = PhaseDeadline::new(round, subround.budget_percentage());
        loop {
            if self.state.is_canceled() {
                return (SubroundPhase::Canceled, deadline.is_extended());
            }
            if is_finished(subround).await {
                self.state.set_status(id, SubroundStatus::Finished);
                return (SubroundPhase::Finished, deadline.is_extended());
            }
            let remaining = deadline.remaining(clock);
            if remaining <= 0 {
                match subround.extend() {
                    ExtendDecision::Grant { extra } if deadline.try_extend(extra) => {
                        tracing::debug!(?extra, "subround deadline extended");
                        continue;
                    }
                    _ => {
                        tracing::debug!(overrun_ms = -remaining, "subround timed out, round canceled");
                        self.state.cancel_round();
                        return (SubroundPhase::Canceled, deadline.is_extended());
                    }
                }
            }
            let wait = u64::try_from(remaining).map_or(self.poll_interval, |ms| {
                self.poll_interval.min(Duration::from_millis(ms))
            });
            tokio::time::sleep(wait).await;
        }
    }

    fn record(&self, report: &RoundReport) {
        match report.outcome {
            RoundOutcome::Completed => {
                self.core.status().increment(METRIC_ROUNDS_COMPLETED);
                tracing::debug!(round = report.round, "round completed");
            }
            RoundOutcome::Canceled { subround } => {
                self.core.status().increment(METRIC_ROUNDS_CANCELED);
                tracing::debug!(round = report.round, %subround, "round canceled");
            }
        }
    }
}

/// Run `call` against `subround` on the blocking pool, inside the current span.
/// Returns `None` if the call panicked.
async fn blocking<T, F>(subround: &Arc<dyn Subround>, call: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn Subround) -> T + Send + 'static,
{
    let subround = Arc::clone(subround);
    let span = Span::current();
    match tokio::task::spawn_blocking(move || span.in_scope(|| call(subround.as_ref()))).await {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(%err, "subround call did not complete");
            None
        }
    }
}

async fn is_finished(subround: &Arc<dyn Subround>) -> bool {
    blocking(subround, |subround| subround.is_finished())
        .await
        .unwrap_or(false)
}
