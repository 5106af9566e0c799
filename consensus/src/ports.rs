//! Collaborator contracts consumed by the consensus core.
//!
//! None of these are implemented here: transport, signing, block storage and sync
//! live in other subsystems. Fallible calls report a plain `String` reason, which the
//! core wraps into a typed [`ConsensusError`](crate::ConsensusError).

use std::time::Duration;

use spos_types::{BlockHeader, PublicKey, Round, RoundIndex, ShardId, Timestamp};

use crate::message::ConsensusMessage;

/// Supplies round timing.
pub trait RoundClock: Send + Sync {
    fn round_index(&self) -> RoundIndex;

    fn round_timestamp(&self) -> Timestamp;

    fn round_duration(&self) -> Duration;

    /// Milliseconds left until `start + budget`; negative once the budget is overrun.
    fn remaining_time(&self, start: Timestamp, budget: Duration) -> i64;

    /// The current round as one consistent value.
    fn current_round(&self) -> Round {
        Round::new(
            self.round_index(),
            self.round_timestamp(),
            self.round_duration(),
        )
    }
}

/// Read access to the local chain.
pub trait ChainHandler: Send + Sync {
    fn current_block_header(&self) -> Option<BlockHeader>;

    fn genesis_header(&self) -> Option<BlockHeader>;
}

/// Reports whether the node is still catching up with the network.
pub trait Bootstrapper: Send + Sync {
    fn should_sync(&self) -> bool;
}

/// Multi-signature scheme re-keyed for every consensus group.
pub trait MultiSigner: Send + Sync {
    /// Re-initialise for a new group. `self_index` is `None` for an observer.
    fn reset(&self, public_keys: &[PublicKey], self_index: Option<u16>) -> Result<(), String>;

    fn create_signature_share(&self, message: &[u8]) -> Result<Vec<u8>, String>;

    /// Verify and keep the share of the group member at `index`.
    fn store_signature_share(&self, index: u16, share: &[u8]) -> Result<(), String>;

    /// Aggregate the stored shares of `signers` (group indexes).
    fn aggregate(&self, signers: &[u16]) -> Result<Vec<u8>, String>;
}

/// Outbound side of the consensus topic on the peer-to-peer layer.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, message: ConsensusMessage) -> Result<(), String>;
}

/// Builds, validates and commits blocks.
pub trait BlockProcessor: Send + Sync {
    fn create_block(&self, round: &Round, shard_id: ShardId) -> Result<BlockHeader, String>;

    fn process_block(&self, header: &BlockHeader) -> Result<(), String>;

    fn commit_block(&self, header: &BlockHeader, aggregated_signature: &[u8])
        -> Result<(), String>;
}
