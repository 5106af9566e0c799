//! Validators authorised to take part in consensus, per shard.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use spos_types::{PublicKey, ShardId};

/// Shared handle to the eligible set.
///
/// Clones share the same data. Only the epoch transition handler replaces entries;
/// everyone else reads.
#[derive(Clone, Debug, Default)]
pub struct EligibleSet {
    inner: Arc<RwLock<HashMap<ShardId, HashSet<PublicKey>>>>,
}

impl EligibleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, shard_id: ShardId, public_key: &PublicKey) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&shard_id)
            .is_some_and(|set| set.contains(public_key))
    }

    pub fn members(&self, shard_id: ShardId) -> HashSet<PublicKey> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&shard_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self, shard_id: ShardId) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&shard_id)
            .map_or(0, HashSet::len)
    }

    pub(crate) fn replace_shard(&self, shard_id: ShardId, members: HashSet<PublicKey>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(shard_id, members);
    }
}
