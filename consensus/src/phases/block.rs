//! Block proposal phase. The leader builds and broadcasts the round's block; every
//! other node validates the leader's proposal when it arrives.

use crate::message::{ConsensusMessage, MessagePayload, MessageTopic};
use crate::subround::{ExtendDecision, JobOutcome, Subround, SubroundId};
use crate::worker::MessageHandler;
use crate::ConsensusError;

use super::base::SubroundBase;

pub struct Block {
    base: SubroundBase,
}

impl Block {
    pub(crate) fn new(base: SubroundBase) -> Self {
        Self { base }
    }

    fn propose(&self) -> Result<(), ConsensusError> {
        let state = &self.base.state;
        let core = &self.base.core;
        let round = state.round().ok_or(ConsensusError::NoActiveRound)?;
        let header = core
            .block_processor()
            .create_block(&round, core.shard_coordinator().self_id())
            .map_err(ConsensusError::BlockProcessing)?;
        if !state.set_header(round.index, header.clone()) {
            return Err(ConsensusError::RoundChanged(round.index));
        }
        state.set_job_done(round.index, self.base.self_key(), self.base.id)?;
        tracing::debug!(nonce = header.nonce, "block proposed");
        if !self.base.broadcast(&round, MessagePayload::BlockProposal(header)) {
            return Err(ConsensusError::Broadcast("block proposal".to_string()));
        }
        Ok(())
    }
}

impl Subround for Block {
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
        match self.propose() {
            Ok(()) => JobOutcome::Done,
            Err(err) => {
                tracing::debug!(%err, "block proposal failed");
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

impl MessageHandler for Block {
    fn topic(&self) -> MessageTopic {
        MessageTopic::Block
    }

    fn handle(&self, message: &ConsensusMessage) -> bool {
        let MessagePayload::BlockProposal(header) = &message.payload else {
            return false;
        };
        let state = &self.base.state;
        if !self.base.accepts(message) || !state.is_leader(&message.sender) {
            return false;
        }
        if header.round != message.round || state.header().is_some() {
            return false;
        }
        if let Err(err) = self.base.core.block_processor().process_block(header) {
            tracing::debug!(%err, "received block rejected");
            return false;
        }
        // The round may have moved on while the block was being processed.
        if !state.set_header(message.round, header.clone()) {
            return false;
        }
        if let Err(err) = state.set_job_done(message.round, &message.sender, self.base.id) {
            tracing::debug!(%err, "cannot record proposal");
            return false;
        }
        tracing::debug!(nonce = header.nonce, "block received from leader");
        true
    }
}
