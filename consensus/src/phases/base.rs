use std::sync::Arc;

use spos_types::{PublicKey, Round};

use crate::core::ConsensusCore;
use crate::message::{ConsensusMessage, MessagePayload};
use crate::state::ConsensusState;
use crate::subround::{ExtendDecision, ExtendPolicy, SubroundId, SubroundStatus};

/// Plumbing shared by every concrete phase.
pub(crate) struct SubroundBase {
    pub(crate) id: SubroundId,
    pub(crate) name: &'static str,
    pub(crate) budget_percentage: u32,
    pub(crate) core: Arc<ConsensusCore>,
    pub(crate) state: Arc<ConsensusState>,
    extend_policy: Arc<dyn ExtendPolicy>,
}

impl SubroundBase {
    pub(crate) fn new(
        id: SubroundId,
        name: &'static str,
        budget_percentage: u32,
        core: Arc<ConsensusCore>,
        state: Arc<ConsensusState>,
        extend_policy: Arc<dyn ExtendPolicy>,
    ) -> Self {
        Self {
            id,
            name,
            budget_percentage,
            core,
            state,
            extend_policy,
        }
    }

    pub(crate) fn self_key(&self) -> &PublicKey {
        self.core.self_public_key()
    }

    pub(crate) fn extend(&self) -> ExtendDecision {
        match self.state.round() {
            Some(round) => self.extend_policy.extend(self.id, &round),
            None => ExtendDecision::Cancel,
        }
    }

    /// Common head of every completion check: a canceled round never finishes a
    /// phase, and a finished phase stays finished.
    pub(crate) fn precheck(&self) -> Option<bool> {
        if self.state.is_canceled() {
            return Some(false);
        }
        if self.state.is_subround_finished(self.id) {
            return Some(true);
        }
        None
    }

    pub(crate) fn finish(&self) -> bool {
        self.state.set_status(self.id, SubroundStatus::Finished);
        tracing::debug!(subround = self.name, "subround finished");
        true
    }

    /// Whether a message can still affect this phase of the current round.
    pub(crate) fn accepts(&self, message: &ConsensusMessage) -> bool {
        !self.state.is_canceled()
            && self.state.round_index() == Some(message.round)
            && !self.state.is_subround_finished(self.id)
    }

    pub(crate) fn broadcast(&self, round: &Round, payload: MessagePayload) -> bool {
        let message = ConsensusMessage::new(round.index, self.self_key().clone(), payload);
        match self.core.broadcaster().broadcast(message) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(subround = self.name, %err, "broadcast failed");
                false
            }
        }
    }
}
