//! Consensus — round-based subround state machine for sharded proof-of-stake.
//!
//! Time is split into fixed-duration rounds. In every round a deterministic
//! consensus group is drawn from the shard's validators; its first member leads.
//! The round runs as an ordered pipeline of phases (start, block, signature, end),
//! each with a job, a completion check and a deadline expressed as a share of the
//! round. A phase that misses its deadline cancels the round unless the extension
//! policy grants it more time; the next round boundary is the retry.
//!
//! ## Module overview
//!
//! - [`controller`] — [`SubroundController`], the round loop.
//! - [`phases`] — [`StartRound`], [`Block`], [`Signature`], [`EndRound`] and the [`Pipeline`].
//! - [`subround`] — the [`Subround`] capability interface and extension policies.
//! - [`state`] — [`ConsensusState`], the progress of the current round.
//! - [`group`] — consensus group derivation.
//! - [`worker`] — inbound message screening, dispatch and stored-message replay.
//! - [`epoch`] — eligible-set reconciliation across epoch boundaries.
//! - [`telemetry`] — optional round indexing.
//! - [`core`] — [`ConsensusCore`], the collaborator bundle.
//! - [`ports`] — collaborator contracts consumed by the engine.
//! - [`config`] — timing configuration.
//! - [`error`] — consensus error types.

pub mod clock;
pub mod config;
pub mod controller;
pub mod core;
pub mod eligible;
pub mod epoch;
pub mod error;
pub mod group;
pub mod message;
pub mod phases;
pub mod ports;
pub mod state;
pub mod status;
pub mod subround;
pub mod tasks;
pub mod telemetry;
pub mod timing;
pub mod tracing_spans;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use clock::SystemRoundClock;
pub use config::{ConsensusConfig, ExtensionConfig};
pub use controller::{RoundOutcome, RoundReport, SubroundController};
pub use core::{ConsensusCore, ConsensusCoreBuilder};
pub use eligible::EligibleSet;
pub use epoch::{
    EpochStartHandler, EpochStartNotifier, EpochStartSubscriber, EpochTransitionHandler,
};
pub use error::ConsensusError;
pub use group::{ConsensusGroup, ConsensusGroupSelector};
pub use message::{ConsensusMessage, MessagePayload, MessageTopic};
pub use phases::{Block, EndRound, Pipeline, Signature, StartRound};
pub use ports::{BlockProcessor, Bootstrapper, Broadcaster, ChainHandler, MultiSigner, RoundClock};
pub use state::{ConsensusState, StateSnapshot};
pub use status::{NullStatusHandler, StatusHandler};
pub use subround::{
    CancelOnTimeout, ExtendDecision, ExtendPolicy, GrantOnce, JobOutcome, Subround, SubroundId,
    SubroundPhase, SubroundStatus,
};
pub use telemetry::{NoopIndexer, RoundIndexer, RoundInfo};
pub use timing::PhaseDeadline;
pub use worker::{ConsensusWorker, MessageDisposition, MessageHandler, MessageReplay};
