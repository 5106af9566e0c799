//! The start phase: prepares every round before any other phase runs.
//!
//! Its job derives the consensus group and leader, re-keys the multi-signer and checks
//! that all of this fit within the processing threshold of the round. Any failure
//! cancels the round; the next round boundary is the retry. On success it hands the
//! messages stored for this round to a detached replay task.
//!
//! A node that is syncing when the round starts defers initialisation. The completion
//! check retries it on every poll, so a node that catches up within the processing
//! threshold still takes part in the round.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use spos_types::{BlockHeader, PublicKey, RoundIndex};

use crate::status::{
    METRIC_CONSENSUS_ROUND_STATE, METRIC_CONSENSUS_STATE, METRIC_COUNT_CONSENSUS,
    METRIC_COUNT_LEADER,
};
use crate::subround::{ExtendDecision, JobOutcome, Subround, SubroundId, SubroundStatus};
use crate::tasks::spawn_detached;
use crate::telemetry::{submit_round_info, NoopIndexer, RoundIndexer, RoundInfo};
use crate::tracing_spans::replay_span;
use crate::worker::MessageReplay;
use crate::ConsensusError;

use super::base::SubroundBase;
use super::SIGNATURE;

pub struct StartRound {
    base: SubroundBase,
    replay: Arc<dyn MessageReplay>,
    indexer: RwLock<Arc<dyn RoundIndexer>>,
    /// Round whose initialisation was deferred because the node was syncing.
    deferred: Mutex<Option<RoundIndex>>,
}

impl StartRound {
    pub(crate) fn new(base: SubroundBase, replay: Arc<dyn MessageReplay>) -> Self {
        Self {
            base,
            replay,
            indexer: RwLock::new(Arc::new(NoopIndexer)),
            deferred: Mutex::new(None),
        }
    }

    /// Install the round indexer used from the next round on.
    pub fn set_indexer(&self, indexer: Arc<dyn RoundIndexer>) {
        *self.indexer.write().unwrap_or_else(PoisonError::into_inner) = indexer;
    }

    fn indexer(&self) -> Arc<dyn RoundIndexer> {
        self.indexer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `Ok(false)` when initialisation was deferred because the node is
    /// syncing.
    fn init_current_round(&self) -> Result<bool, ConsensusError> {
        let core = &self.base.core;
        let state = &self.base.state;

        if core.bootstrapper().should_sync() {
            tracing::debug!("node is syncing, round initialisation deferred");
            return Ok(false);
        }

        state.set_round_state("");
        core.status().set_string_value(METRIC_CONSENSUS_ROUND_STATE, "");

        let round = state.round().ok_or(ConsensusError::NoActiveRound)?;
        let shard_id = core.shard_coordinator().self_id();
        let (group, seed_header) = core.group_selector().select(round.index, shard_id)?;
        state.set_consensus_group(group.clone());

        let leader = group.leader();
        let self_is_leader = leader == core.self_public_key();
        if self_is_leader {
            core.status().increment(METRIC_COUNT_LEADER);
            core.status().set_string_value(METRIC_CONSENSUS_ROUND_STATE, "proposed");
            state.set_round_state("proposed");
        }
        tracing::debug!(leader = %leader, my_turn = self_is_leader, "preparing the round");

        self.index_round_if_needed(&seed_header, round.index, group.members());

        let self_index = match state.self_consensus_group_index() {
            Ok(index) => {
                if !self_is_leader {
                    core.status().increment(METRIC_COUNT_CONSENSUS);
                }
                let label = if self_is_leader { "proposer" } else { "participant" };
                core.status().set_string_value(METRIC_CONSENSUS_STATE, label);
                u16::try_from(index).ok()
            }
            Err(_) => {
                tracing::debug!("not in consensus group");
                core.status()
                    .set_string_value(METRIC_CONSENSUS_STATE, "not in consensus group");
                None
            }
        };

        core.multi_signer()
            .reset(group.members(), self_index)
            .map_err(ConsensusError::MultiSigner)?;

        state.set_threshold(SIGNATURE, group.len() * 2 / 3 + 1);

        let budget = round.fraction(self.base.budget_percentage);
        let remaining = core.clock().remaining_time(round.start_time, budget);
        if remaining < 0 {
            return Err(ConsensusError::TimeIsOut {
                round: round.index,
                overrun_ms: -remaining,
            });
        }

        state.set_status(self.base.id, SubroundStatus::Finished);

        let replay = Arc::clone(&self.replay);
        spawn_detached(
            "spos-replay",
            replay_span(core.span(), round.index),
            move || replay.execute_stored_messages(),
        );
        Ok(true)
    }

    fn index_round_if_needed(
        &self,
        seed_header: &BlockHeader,
        round_index: RoundIndex,
        members: &[PublicKey],
    ) {
        let indexer = self.indexer();
        if indexer.is_noop() {
            return;
        }
        let core = &self.base.core;
        let signer_indexes = match core
            .nodes_coordinator()
            .validators_indexes(members, seed_header.epoch)
        {
            Ok(indexes) => indexes,
            Err(err) => {
                tracing::error!(%err, "failed to resolve validator indexes for indexing");
                return;
            }
        };
        let info = RoundInfo {
            index: round_index,
            signer_indexes,
            block_proposed: false,
            shard_id: core.shard_coordinator().self_id(),
            timestamp: core.clock().round_timestamp(),
        };
        submit_round_info(indexer, info, core.span());
    }
}

impl Subround for StartRound {
    fn id(&self) -> SubroundId {
        self.base.id
    }

    fn name(&self) -> &'static str {
        self.base.name
    }

    fn budget_percentage(&self) -> u32 {
        self.base.budget_percentage
    }

    fn execute(&self) -> JobOutcome {
        let outcome = match self.init_current_round() {
            Ok(true) => JobOutcome::Done,
            Ok(false) => JobOutcome::Skipped,
            Err(err) => {
                tracing::debug!(%err, "round canceled during initialisation");
                self.base.state.cancel_round();
                JobOutcome::Failed
            }
        };
        *self.deferred.lock().unwrap_or_else(PoisonError::into_inner) =
            match outcome {
                JobOutcome::Skipped => self.base.state.round_index(),
                _ => None,
            };
        outcome
    }

    fn is_finished(&self) -> bool {
        if let Some(done) = self.base.precheck() {
            return done;
        }
        let deferred = *self.deferred.lock().unwrap_or_else(PoisonError::into_inner);
        if deferred.is_none() || deferred != self.base.state.round_index() {
            return false;
        }
        if self.base.core.bootstrapper().should_sync() {
            return false;
        }
        tracing::debug!("sync finished, initialising the round");
        self.execute() == JobOutcome::Done
    }

    fn extend(&self) -> ExtendDecision {
        // Initialisation is never retried within a round.
        ExtendDecision::Cancel
    }
}
