//! Epoch transition reconciliation of the eligible set.
//!
//! Two-phase contract: `prepare` fires when an epoch-start block is seen but not yet
//! final and must not touch state; `action` fires once it is committed and recomputes
//! the local shard's eligible set as the union of the validators of the previous and
//! the new epoch. A failed fetch leaves the previous set in place.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::Span;

use spos_sharding::NodesCoordinator;
use spos_types::{BlockHeader, Epoch, ShardId};

use crate::core::ConsensusCore;
use crate::eligible::EligibleSet;
use crate::tracing_spans::epoch_span;
use crate::ConsensusError;

/// Receives epoch-start notifications.
pub trait EpochStartHandler: Send + Sync {
    fn prepare(&self, header: &BlockHeader);

    fn action(&self, header: &BlockHeader);
}

/// Source of epoch-start notifications.
pub trait EpochStartSubscriber: Send + Sync {
    fn register_handler(&self, handler: Arc<dyn EpochStartHandler>);
}

/// In-process fan-out of epoch-start notifications.
#[derive(Default)]
pub struct EpochStartNotifier {
    handlers: RwLock<Vec<Arc<dyn EpochStartHandler>>>,
}

impl EpochStartNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn notify_prepare(&self, header: &BlockHeader) {
        for handler in self.snapshot() {
            handler.prepare(header);
        }
    }

    pub fn notify_action(&self, header: &BlockHeader) {
        for handler in self.snapshot() {
            handler.action(header);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn EpochStartHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EpochStartSubscriber for EpochStartNotifier {
    fn register_handler(&self, handler: Arc<dyn EpochStartHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}

/// Keeps the local shard's eligible set in step with epoch transitions.
pub struct EpochTransitionHandler {
    nodes_coordinator: Arc<dyn NodesCoordinator>,
    shard_id: ShardId,
    eligible: EligibleSet,
    span: Span,
}

impl EpochTransitionHandler {
    pub fn new(core: &ConsensusCore) -> Self {
        Self {
            nodes_coordinator: Arc::clone(core.nodes_coordinator()),
            shard_id: core.shard_coordinator().self_id(),
            eligible: core.eligible().clone(),
            span: core.span().clone(),
        }
    }

    /// Seed the eligible set when the node starts inside `epoch`.
    pub fn initialize(&self, epoch: Epoch) -> Result<usize, ConsensusError> {
        self.reconcile(epoch)
    }

    fn reconcile(&self, epoch: Epoch) -> Result<usize, ConsensusError> {
        let previous = self
            .nodes_coordinator
            .all_validators_public_keys(epoch.saturating_sub(1))?;
        let current = self.nodes_coordinator.all_validators_public_keys(epoch)?;

        let members: HashSet<_> = previous
            .get(&self.shard_id)
            .into_iter()
            .chain(current.get(&self.shard_id))
            .flatten()
            .cloned()
            .collect();
        let count = members.len();
        self.eligible.replace_shard(self.shard_id, members);
        Ok(count)
    }
}

impl EpochStartHandler for EpochTransitionHandler {
    fn prepare(&self, header: &BlockHeader) {
        let span = epoch_span(&self.span, header.epoch);
        let _entered = span.enter();
        tracing::trace!(nonce = header.nonce, "epoch start prepare");
    }

    fn action(&self, header: &BlockHeader) {
        let span = epoch_span(&self.span, header.epoch);
        let _entered = span.enter();
        match self.reconcile(header.epoch) {
            Ok(count) => tracing::info!(shard = self.shard_id, eligible = count, "eligible set updated"),
            Err(err) => tracing::error!(%err, "eligible set not updated, keeping the previous one"),
        }
    }
}
