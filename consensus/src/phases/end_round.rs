//! Finalisation phase. The leader aggregates the collected shares, commits the block
//! and broadcasts the final info; other nodes commit when that info arrives.

use crate::message::{ConsensusMessage, MessagePayload, MessageTopic};
use crate::status::METRIC_COUNT_ACCEPTED_BLOCKS;
use crate::subround::{ExtendDecision, JobOutcome, Subround, SubroundId};
use crate::worker::MessageHandler;
use crate::ConsensusError;

use super::base::SubroundBase;
use super::SIGNATURE;

pub struct EndRound {
    base: SubroundBase,
}

impl EndRound {
    pub(crate) fn new(base: SubroundBase) -> Self {
        Self { base }
    }

    fn finalize(&self) -> Result<(), ConsensusError> {
        let state = &self.base.state;
        let core = &self.base.core;
        let round = state.round().ok_or(ConsensusError::NoActiveRound)?;
        let header = state
            .header_for(round.index)
            .ok_or(ConsensusError::NoProposal)?;
        let signers = state.signers(SIGNATURE);
        let aggregated_signature = core
            .multi_signer()
            .aggregate(&signers)
            .map_err(ConsensusError::MultiSigner)?;
        core.block_processor()
            .commit_block(&header, &aggregated_signature)
            .map_err(ConsensusError::BlockProcessing)?;
        core.status().increment(METRIC_COUNT_ACCEPTED_BLOCKS);
        state.set_job_done(round.index, self.base.self_key(), self.base.id)?;
        tracing::info!(nonce = header.nonce, signers = signers.len(), "block committed");

        // Followers that miss the final info sync the block later.
        self.base.broadcast(
            &round,
            MessagePayload::FinalInfo {
                aggregated_signature,
                signers,
            },
        );
        Ok(())
    }
}

impl Subround for EndRound {
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
        if !state.is_self_leader() {
            return JobOutcome::Skipped;
        }
        if state.self_job_done(self.base.id) {
            return JobOutcome::Done;
        }
        match self.finalize() {
            Ok(()) => JobOutcome::Done,
            Err(err) => {
                tracing::debug!(%err, "finalisation failed");
                JobOutcome::Failed
            }
        }
    }

    fn is_finished(&self) -> bool {
        if let Some(done) = self.base.precheck() {
            return done;
        }
        let state = &self.base.state;
        match state.leader() {
            Some(leader) if state.job_done(&leader, self.base.id) => self.base.finish(),
            _ => false,
        }
    }

    fn extend(&self) -> ExtendDecision {
        self.base.extend()
    }
}

impl MessageHandler for EndRound {
    fn topic(&self) -> MessageTopic {
        MessageTopic::FinalInfo
    }

    fn handle(&self, message: &ConsensusMessage) -> bool {
        let MessagePayload::FinalInfo {
            aggregated_signature,
            signers,
        } = &message.payload
        else {
            return false;
        };
        let state = &self.base.state;
        if !self.base.accepts(message) || !state.is_leader(&message.sender) {
            return false;
        }
        let Some(header) = state.header_for(message.round) else {
            return false;
        };
        let core = &self.base.core;
        if let Err(err) = core.block_processor().commit_block(&header, aggregated_signature) {
            tracing::debug!(%err, "commit of finalised block failed");
            return false;
        }
        core.status().increment(METRIC_COUNT_ACCEPTED_BLOCKS);
        tracing::info!(nonce = header.nonce, signers = signers.len(), "block committed");
        state
            .set_job_done(message.round, &message.sender, self.base.id)
            .is_ok()
    }
}
