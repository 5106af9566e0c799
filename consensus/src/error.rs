use spos_sharding::NodesCoordinatorError;
use spos_types::RoundIndex;
use thiserror::Error;

use crate::message::MessageTopic;
use crate::subround::SubroundId;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("missing required dependency: {0}")]
    MissingDependency(&'static str),

    #[error("invalid consensus config: {0}")]
    InvalidConfig(String),

    #[error("subround pipeline is empty")]
    EmptyPipeline,

    #[error("subround {0} registered twice")]
    DuplicateSubround(SubroundId),

    #[error("no current or genesis block header")]
    NilHeader,

    #[error("no round is active")]
    NoActiveRound,

    #[error("no block proposal for the current round")]
    NoProposal,

    #[error("round {0} is no longer current")]
    RoundChanged(RoundIndex),

    #[error("round index {0} is before genesis")]
    RoundBeforeGenesis(RoundIndex),

    #[error("consensus group is empty")]
    EmptyConsensusGroup,

    #[error("self is not in the consensus group")]
    NotInConsensusGroup,

    #[error("validator selection failed: {0}")]
    NodesCoordinator(#[from] NodesCoordinatorError),

    #[error("multi-signer error: {0}")]
    MultiSigner(String),

    #[error("block processing error: {0}")]
    BlockProcessing(String),

    #[error("broadcast error: {0}")]
    Broadcast(String),

    #[error("time is out in round {round}: {overrun_ms} ms past budget")]
    TimeIsOut { round: RoundIndex, overrun_ms: i64 },

    #[error("message for past round {message_round}, current round is {current_round}")]
    MessageForPastRound {
        message_round: RoundIndex,
        current_round: RoundIndex,
    },

    #[error("message for future round {message_round}, current round is {current_round}")]
    MessageForFutureRound {
        message_round: RoundIndex,
        current_round: RoundIndex,
    },

    #[error("sender {0} is not in the eligible list")]
    SenderNotEligible(String),

    #[error("no handler registered for {0:?} messages")]
    NoHandler(MessageTopic),
}
