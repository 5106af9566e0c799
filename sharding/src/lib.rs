//! Sharding — which validators sit in which shard, and who forms each round's group.
//!
//! ## Module overview
//!
//! - [`coordinator`] — the [`NodesCoordinator`] contract consumed by consensus.
//! - [`index_hashed`] — reference coordinator drawing groups by Blake2b hashing.
//! - [`shard`] — [`ShardCoordinator`], the local node's shard placement.
//! - [`error`] — sharding error types.

pub mod coordinator;
pub mod error;
pub mod index_hashed;
pub mod shard;

pub use coordinator::{NodesCoordinator, ValidatorsPerShard};
pub use error::NodesCoordinatorError;
pub use index_hashed::IndexHashedNodesCoordinator;
pub use shard::ShardCoordinator;
