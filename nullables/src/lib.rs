//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the consensus engine consumes (clock, chain, bootstrapper,
//! multi-signer, broadcaster, block processor, nodes coordinator, indexer, status
//! sink) has a test-friendly implementation here that:
//! - Returns deterministic values
//! - Can be controlled programmatically
//! - Records what the engine asked of it
//! - Never touches the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod blocks;
pub mod chain;
pub mod clock;
pub mod coordinator;
pub mod network;
pub mod recording;
pub mod signer;

pub use blocks::NullBlockProcessor;
pub use chain::{NullBootstrapper, NullChain};
pub use clock::NullClock;
pub use coordinator::NullNodesCoordinator;
pub use network::NullBroadcaster;
pub use recording::{RecordingIndexer, RecordingStatusHandler};
pub use signer::NullMultiSigner;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock, ignoring poisoning.
pub(crate) fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
