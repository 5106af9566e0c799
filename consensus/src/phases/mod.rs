//! The concrete consensus phases and the pipeline that orders them.

mod base;
pub mod block;
pub mod end_round;
pub mod signature;
pub mod start_round;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ConsensusConfig;
use crate::core::ConsensusCore;
use crate::state::ConsensusState;
use crate::subround::{Subround, SubroundId};
use crate::telemetry::RoundIndexer;
use crate::worker::{ConsensusWorker, MessageReplay};
use crate::ConsensusError;

use base::SubroundBase;

pub use block::Block;
pub use end_round::EndRound;
pub use signature::Signature;
pub use start_round::StartRound;

pub const START_ROUND: SubroundId = SubroundId(0);
pub const BLOCK: SubroundId = SubroundId(1);
pub const SIGNATURE: SubroundId = SubroundId(2);
pub const END_ROUND: SubroundId = SubroundId(3);

/// Ordered phases run by the controller. Fixed for the lifetime of the node.
pub struct Pipeline {
    subrounds: Vec<Arc<dyn Subround>>,
    start_round: Option<Arc<StartRound>>,
}

impl Pipeline {
    /// Build the standard pipeline and register its message handlers with `worker`.
    pub fn build(
        core: Arc<ConsensusCore>,
        state: Arc<ConsensusState>,
        worker: &Arc<ConsensusWorker>,
        config: &ConsensusConfig,
    ) -> Result<Self, ConsensusError> {
        config.validate()?;
        let policy = config.extend_policy();
        let base = |id, name, percentage| {
            SubroundBase::new(
                id,
                name,
                percentage,
                Arc::clone(&core),
                Arc::clone(&state),
                Arc::clone(&policy),
            )
        };

        let replay: Arc<dyn MessageReplay> = Arc::clone(worker) as Arc<dyn MessageReplay>;
        let start_round = Arc::new(StartRound::new(
            base(START_ROUND, "start_round", config.processing_threshold_percentage),
            replay,
        ));
        let block = Arc::new(Block::new(base(BLOCK, "block", config.block_percentage)));
        let signature = Arc::new(Signature::new(base(
            SIGNATURE,
            "signature",
            config.signature_percentage,
        )));
        let end_round = Arc::new(EndRound::new(base(
            END_ROUND,
            "end_round",
            config.end_round_percentage,
        )));

        worker.register_handler(block.clone());
        worker.register_handler(signature.clone());
        worker.register_handler(end_round.clone());

        let subrounds: Vec<Arc<dyn Subround>> =
            vec![start_round.clone(), block, signature, end_round];
        let mut pipeline = Self::from_subrounds(subrounds)?;
        pipeline.start_round = Some(start_round);
        Ok(pipeline)
    }

    /// A pipeline of arbitrary phases, run in the given order.
    pub fn from_subrounds(subrounds: Vec<Arc<dyn Subround>>) -> Result<Self, ConsensusError> {
        if subrounds.is_empty() {
            return Err(ConsensusError::EmptyPipeline);
        }
        let mut seen = HashSet::new();
        for subround in &subrounds {
            if !seen.insert(subround.id()) {
                return Err(ConsensusError::DuplicateSubround(subround.id()));
            }
        }
        Ok(Self {
            subrounds,
            start_round: None,
        })
    }

    pub fn subrounds(&self) -> &[Arc<dyn Subround>] {
        &self.subrounds
    }

    pub fn len(&self) -> usize {
        self.subrounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subrounds.is_empty()
    }

    /// Replace the round indexer. Returns false for a pipeline without a start phase.
    pub fn set_indexer(&self, indexer: Arc<dyn RoundIndexer>) -> bool {
        match &self.start_round {
            Some(start_round) => {
                start_round.set_indexer(indexer);
                true
            }
            None => false,
        }
    }
}
