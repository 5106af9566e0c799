//! Signature phase. Group members sign the proposed header hash; the leader collects
//! shares until the threshold (`2/3·n + 1`) is reached. Observers have nothing to do.

use crate::message::{ConsensusMessage, MessagePayload, MessageTopic};
use crate::subround::{ExtendDecision, JobOutcome, Subround, SubroundId};
use crate::worker::MessageHandler;
use crate::ConsensusError;

use super::base::SubroundBase;

pub struct Signature {
    base: SubroundBase,
}

impl Signature {
    pub(crate) fn new(base: SubroundBase) -> Self {
        Self { base }
    }

    fn sign(&self) -> Result<(), ConsensusError> {
        let state = &self.base.state;
        let core = &self.base.core;
        let round = state.round().ok_or(ConsensusError::NoActiveRound)?;
        let header = state
            .header_for(round.index)
            .ok_or(ConsensusError::NoProposal)?;
        let share = core
            .multi_signer()
            .create_signature_share(&header.hash())
            .map_err(ConsensusError::MultiSigner)?;

        if state.is_self_leader() {
            let index = state.self_consensus_group_index()?;
            let index = u16::try_from(index).map_err(|_| ConsensusError::NotInConsensusGroup)?;
            core.multi_signer()
                .store_signature_share(index, &share)
                .map_err(ConsensusError::MultiSigner)?;
        } else if !self.base.broadcast(&round, MessagePayload::SignatureShare(share)) {
            return Err(ConsensusError::Broadcast("signature share".to_string()));
        }
        state.set_job_done(round.index, self.base.self_key(), self.base.id)
    }
}

impl Subround for Signature {
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
        let state = &self.base.state;
        if !state.is_self_in_consensus_group() {
            return JobOutcome::Skipped;
        }
        if state.self_job_done(self.base.id) {
            return JobOutcome::Done;
        }
        match self.sign() {
            Ok(()) => JobOutcome::Done,
            Err(err) => {
                tracing::debug!(%err, "signing failed");
                JobOutcome::Failed
            }
        }
    }

    fn is_finished(&self) -> bool {
        if let Some(done) = self.base.precheck() {
            return done;
        }
        let state = &self.base.state;
        let id = self.base.id;
        let done = if !state.is_self_in_consensus_group() {
            true
        } else if state.is_self_leader() {
            state.jobs_done_count(id) >= state.threshold(id)
        } else {
            state.self_job_done(id)
        };
        done && self.base.finish()
    }

    fn extend(&self) -> ExtendDecision {
        self.base.extend()
    }
}

impl MessageHandler for Signature {
    fn topic(&self) -> MessageTopic {
        MessageTopic::Signature
    }

    /// Only the leader collects shares.
    fn handle(&self, message: &ConsensusMessage) -> bool {
        let MessagePayload::SignatureShare(share) = &message.payload else {
            return false;
        };
        let state = &self.base.state;
        if !self.base.accepts(message) || !state.is_self_leader() {
            return false;
        }
        if state.job_done(&message.sender, self.base.id) {
            return false;
        }
        let Ok(index) = state.consensus_group_index(&message.sender) else {
            return false;
        };
        let Ok(index) = u16::try_from(index) else {
            return false;
        };
        if !state.is_current_round(message.round) {
            return false;
        }
        if let Err(err) = self
            .base
            .core
            .multi_signer()
            .store_signature_share(index, share)
        {
            tracing::debug!(sender = %message.sender, %err, "invalid signature share");
            return false;
        }
        state
            .set_job_done(message.round, &message.sender, self.base.id)
            .is_ok()
    }
}
