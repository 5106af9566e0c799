//! Fundamental types for the SPOS validator.
//!
//! This crate defines the value types shared across every other crate in the workspace:
//! validator identities, randomness seeds, block headers, timestamps, rounds, shards and
//! epochs.

pub mod block;
pub mod keys;
pub mod round;
pub mod shard;
pub mod time;

pub use block::{BlockHeader, RandomSeed};
pub use keys::PublicKey;
pub use round::{Round, RoundIndex};
pub use shard::{Epoch, ShardId, METACHAIN_SHARD_ID};
pub use time::Timestamp;
