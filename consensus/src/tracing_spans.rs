//! Pre-built [`tracing::Span`] constructors for the consensus engine.
//!
//! The node span is created once per validator instance and handed to
//! [`ConsensusCore`](crate::ConsensusCore); every other span here is opened as its
//! child, so two nodes in one process keep separate log contexts.

use tracing::{info_span, Span};

use spos_types::{PublicKey, RoundIndex, ShardId};

/// Root span of one validator instance.
pub fn node_span(shard_id: ShardId, public_key: &PublicKey) -> Span {
    info_span!("validator", shard = shard_id, pk = %public_key)
}

/// Span covering one consensus round.
pub fn round_span(parent: &Span, index: RoundIndex) -> Span {
    info_span!(parent: parent, "round", index)
}

/// Span covering one phase within a round.
pub fn subround_span(parent: &Span, name: &'static str) -> Span {
    info_span!(parent: parent, "subround", name)
}

/// Span of the stored-message replay task.
pub fn replay_span(parent: &Span, round: RoundIndex) -> Span {
    info_span!(parent: parent, "replay", round)
}

/// Span of a telemetry submission.
pub fn telemetry_span(parent: &Span, round: RoundIndex) -> Span {
    info_span!(parent: parent, "telemetry", round)
}

/// Span of an epoch-start notification.
pub fn epoch_span(parent: &Span, epoch: u32) -> Span {
    info_span!(parent: parent, "epoch_start", epoch)
}

/// Span covering the handling of one inbound consensus message.
pub fn message_span(parent: &Span, round: RoundIndex, topic: &str) -> Span {
    info_span!(parent: parent, "consensus_msg", round, topic = %topic)
}
