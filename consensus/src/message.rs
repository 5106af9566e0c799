//! Consensus messages as exchanged with the transport layer.
//!
//! Only the in-memory shape is defined here; encoding belongs to the transport.

use spos_types::{BlockHeader, PublicKey, RoundIndex};

/// What a consensus message carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessagePayload {
    /// The leader's block proposal for the round.
    BlockProposal(BlockHeader),
    /// A group member's signature share over the proposed header hash.
    SignatureShare(Vec<u8>),
    /// The leader's aggregated signature and the group indexes that signed.
    FinalInfo {
        aggregated_signature: Vec<u8>,
        signers: Vec<u16>,
    },
}

/// Routing key for message handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageTopic {
    Block,
    Signature,
    FinalInfo,
}

impl MessagePayload {
    pub fn topic(&self) -> MessageTopic {
        match self {
            Self::BlockProposal(_) => MessageTopic::Block,
            Self::SignatureShare(_) => MessageTopic::Signature,
            Self::FinalInfo { .. } => MessageTopic::FinalInfo,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusMessage {
    pub round: RoundIndex,
    pub sender: PublicKey,
    pub payload: MessagePayload,
}

impl ConsensusMessage {
    pub fn new(round: RoundIndex, sender: PublicKey, payload: MessagePayload) -> Self {
        Self {
            round,
            sender,
            payload,
        }
    }

    pub fn topic(&self) -> MessageTopic {
        self.payload.topic()
    }
}
