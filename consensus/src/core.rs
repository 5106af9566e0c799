//! The bundle of collaborators every phase works with.

use std::sync::Arc;

use tracing::Span;

use spos_sharding::{NodesCoordinator, ShardCoordinator};
use spos_types::PublicKey;

use crate::eligible::EligibleSet;
use crate::group::ConsensusGroupSelector;
use crate::ports::{
    BlockProcessor, Bootstrapper, Broadcaster, ChainHandler, MultiSigner, RoundClock,
};
use crate::status::{NullStatusHandler, StatusHandler};
use crate::tracing_spans::node_span;
use crate::ConsensusError;

/// Collaborators, identity and log context shared by the controller, the phases and
/// the worker.
pub struct ConsensusCore {
    self_public_key: PublicKey,
    shard_coordinator: ShardCoordinator,
    clock: Arc<dyn RoundClock>,
    chain: Arc<dyn ChainHandler>,
    bootstrapper: Arc<dyn Bootstrapper>,
    multi_signer: Arc<dyn MultiSigner>,
    broadcaster: Arc<dyn Broadcaster>,
    block_processor: Arc<dyn BlockProcessor>,
    nodes_coordinator: Arc<dyn NodesCoordinator>,
    status: Arc<dyn StatusHandler>,
    eligible: EligibleSet,
    group_selector: ConsensusGroupSelector,
    span: Span,
}

impl ConsensusCore {
    pub fn builder() -> ConsensusCoreBuilder {
        ConsensusCoreBuilder::default()
    }

    pub fn self_public_key(&self) -> &PublicKey {
        &self.self_public_key
    }

    pub fn shard_coordinator(&self) -> &ShardCoordinator {
        &self.shard_coordinator
    }

    pub fn clock(&self) -> &dyn RoundClock {
        self.clock.as_ref()
    }

    pub fn chain(&self) -> &dyn ChainHandler {
        self.chain.as_ref()
    }

    pub fn bootstrapper(&self) -> &dyn Bootstrapper {
        self.bootstrapper.as_ref()
    }

    pub fn multi_signer(&self) -> &dyn MultiSigner {
        self.multi_signer.as_ref()
    }

    pub fn broadcaster(&self) -> &dyn Broadcaster {
        self.broadcaster.as_ref()
    }

    pub fn block_processor(&self) -> &dyn BlockProcessor {
        self.block_processor.as_ref()
    }

    pub fn nodes_coordinator(&self) -> &Arc<dyn NodesCoordinator> {
        &self.nodes_coordinator
    }

    pub fn status(&self) -> &dyn StatusHandler {
        self.status.as_ref()
    }

    pub fn eligible(&self) -> &EligibleSet {
        &self.eligible
    }

    pub fn group_selector(&self) -> &ConsensusGroupSelector {
        &self.group_selector
    }

    /// Log context of this validator instance.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Assembles a [`ConsensusCore`]. Every collaborator except the status handler, the
/// eligible set and the span is required.
#[derive(Default)]
pub struct ConsensusCoreBuilder {
    self_public_key: Option<PublicKey>,
    shard_coordinator: Option<ShardCoordinator>,
    clock: Option<Arc<dyn RoundClock>>,
    chain: Option<Arc<dyn ChainHandler>>,
    bootstrapper: Option<Arc<dyn Bootstrapper>>,
    multi_signer: Option<Arc<dyn MultiSigner>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    block_processor: Option<Arc<dyn BlockProcessor>>,
    nodes_coordinator: Option<Arc<dyn NodesCoordinator>>,
    status: Option<Arc<dyn StatusHandler>>,
    eligible: Option<EligibleSet>,
    span: Option<Span>,
}

impl ConsensusCoreBuilder {
    pub fn self_public_key(mut self, public_key: PublicKey) -> Self {
        self.self_public_key = Some(public_key);
        self
    }

    pub fn shard_coordinator(mut self, shard_coordinator: ShardCoordinator) -> Self {
        self.shard_coordinator = Some(shard_coordinator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn RoundClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn chain(mut self, chain: Arc<dyn ChainHandler>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn bootstrapper(mut self, bootstrapper: Arc<dyn Bootstrapper>) -> Self {
        self.bootstrapper = Some(bootstrapper);
        self
    }

    pub fn multi_signer(mut self, multi_signer: Arc<dyn MultiSigner>) -> Self {
        self.multi_signer = Some(multi_signer);
        self
    }

    pub fn broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn block_processor(mut self, block_processor: Arc<dyn BlockProcessor>) -> Self {
        self.block_processor = Some(block_processor);
        self
    }

    pub fn nodes_coordinator(mut self, nodes_coordinator: Arc<dyn NodesCoordinator>) -> Self {
        self.nodes_coordinator = Some(nodes_coordinator);
        self
    }

    pub fn status(mut self, status: Arc<dyn StatusHandler>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn eligible(mut self, eligible: EligibleSet) -> Self {
        self.eligible = Some(eligible);
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<ConsensusCore, ConsensusError> {
        let self_public_key = self
            .self_public_key
            .ok_or(ConsensusError::MissingDependency("self public key"))?;
        if self_public_key.is_empty() {
            return Err(ConsensusError::MissingDependency("self public key"));
        }
        let shard_coordinator = self
            .shard_coordinator
            .ok_or(ConsensusError::MissingDependency("shard coordinator"))?;
        let chain = self
            .chain
            .ok_or(ConsensusError::MissingDependency("chain handler"))?;
        let nodes_coordinator = self
            .nodes_coordinator
            .ok_or(ConsensusError::MissingDependency("nodes coordinator"))?;
        let span = self
            .span
            .unwrap_or_else(|| node_span(shard_coordinator.self_id(), &self_public_key));
        Ok(ConsensusCore {
            clock: self
                .clock
                .ok_or(ConsensusError::MissingDependency("round clock"))?,
            bootstrapper: self
                .bootstrapper
                .ok_or(ConsensusError::MissingDependency("bootstrapper"))?,
            multi_signer: self
                .multi_signer
                .ok_or(ConsensusError::MissingDependency("multi-signer"))?,
            broadcaster: self
                .broadcaster
                .ok_or(ConsensusError::MissingDependency("broadcaster"))?,
            block_processor: self
                .block_processor
                .ok_or(ConsensusError::MissingDependency("block processor"))?,
            status: self.status.unwrap_or_else(|| Arc::new(NullStatusHandler)),
            eligible: self.eligible.unwrap_or_default(),
            group_selector: ConsensusGroupSelector::new(nodes_coordinator.clone(), chain.clone()),
            self_public_key,
            shard_coordinator,
            chain,
            nodes_coordinator,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pk, Harness, TestBlocks, TestBootstrapper, TestChain, TestClock};

    #[test]
    fn missing_collaborator_is_a_construction_error() {
        let result = ConsensusCore::builder()
            .self_public_key(pk(1))
            .shard_coordinator(ShardCoordinator::new(1, 0).unwrap())
            .clock(Arc::new(TestClock::default()))
            .chain(Arc::new(TestChain))
            .bootstrapper(Arc::new(TestBootstrapper::default()))
            .block_processor(Arc::new(TestBlocks::default()))
            .build();
        assert!(matches!(
            result,
            Err(ConsensusError::MissingDependency("nodes coordinator"))
        ));
    }

    #[test]
    fn empty_identity_rejected() {
        let result = ConsensusCore::builder()
            .self_public_key(PublicKey::new(Vec::new()))
            .build();
        assert!(matches!(
            result,
            Err(ConsensusError::MissingDependency("self public key"))
        ));
    }

    #[test]
    fn optional_collaborators_default() {
        let harness = Harness::new(&[1], 1);
        assert_eq!(harness.core.eligible().len(0), 0);
        assert_eq!(harness.core.self_public_key(), &pk(1));
        harness.core.status().increment("ignored");
    }
}
