//! Shard and epoch identifiers.

/// Identifies a shard of the network.
pub type ShardId = u32;

/// The metachain coordinates the regular shards and uses the highest shard id.
pub const METACHAIN_SHARD_ID: ShardId = u32::MAX;

/// An epoch spans many rounds; validator eligibility is recomputed at its boundary.
pub type Epoch = u32;
