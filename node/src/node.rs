//! The validator node — wires the consensus engine to its collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use spos_consensus::tracing_spans::node_span;
use spos_consensus::{
    BlockProcessor, Bootstrapper, Broadcaster, ChainHandler, ConsensusCore, ConsensusState,
    ConsensusWorker, EligibleSet, EpochStartSubscriber, EpochTransitionHandler, MultiSigner,
    NullStatusHandler, Pipeline, RoundClock, RoundIndexer, StatusHandler, SubroundController,
    SystemRoundClock,
};
use spos_sharding::{NodesCoordinator, ShardCoordinator};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;

/// Timeout for the controller task to stop during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// External subsystems the node consumes.
pub struct Collaborators {
    /// Defaults to a wall clock built from the configured genesis and round duration.
    pub clock: Option<Arc<dyn RoundClock>>,
    pub chain: Arc<dyn ChainHandler>,
    pub bootstrapper: Arc<dyn Bootstrapper>,
    pub multi_signer: Arc<dyn MultiSigner>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub block_processor: Arc<dyn BlockProcessor>,
    pub nodes_coordinator: Arc<dyn NodesCoordinator>,
    /// Where the epoch transition handler gets registered.
    pub epoch_notifier: Arc<dyn EpochStartSubscriber>,
    /// Defaults to the node's Prometheus metrics when enabled, else a null sink.
    pub status: Option<Arc<dyn StatusHandler>>,
}

pub struct ValidatorNode {
    config: NodeConfig,
    core: Arc<ConsensusCore>,
    state: Arc<ConsensusState>,
    worker: Arc<ConsensusWorker>,
    controller: Arc<SubroundController>,
    epoch_handler: Arc<EpochTransitionHandler>,
    metrics: Option<Arc<NodeMetrics>>,
    /// Stop signal for the round loop.
    stop: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl ValidatorNode {
    /// Assemble the engine. Fails on invalid configuration or missing collaborators;
    /// nothing runs until [`start`](Self::start).
    pub fn new(config: NodeConfig, collaborators: Collaborators) -> Result<Self, NodeError> {
        config.validate()?;
        let public_key = config.self_public_key()?;
        let shard_coordinator = ShardCoordinator::new(config.num_shards, config.shard_id)?;

        let clock: Arc<dyn RoundClock> = match collaborators.clock {
            Some(clock) => clock,
            None => Arc::new(SystemRoundClock::new(
                config.genesis_time(),
                config.round_duration(),
            )?),
        };

        let mut metrics = None;
        let status: Arc<dyn StatusHandler> = match collaborators.status {
            Some(status) => status,
            None if config.enable_metrics => {
                let node_metrics = Arc::new(NodeMetrics::new()?);
                metrics = Some(node_metrics.clone());
                node_metrics
            }
            None => Arc::new(NullStatusHandler),
        };

        let span = node_span(shard_coordinator.self_id(), &public_key);
        let core = Arc::new(
            ConsensusCore::builder()
                .self_public_key(public_key.clone())
                .shard_coordinator(shard_coordinator)
                .clock(clock)
                .chain(collaborators.chain.clone())
                .bootstrapper(collaborators.bootstrapper)
                .multi_signer(collaborators.multi_signer)
                .broadcaster(collaborators.broadcaster)
                .block_processor(collaborators.block_processor)
                .nodes_coordinator(collaborators.nodes_coordinator)
                .status(status)
                .eligible(EligibleSet::new())
                .span(span.clone())
                .build()?,
        );

        let epoch_handler = Arc::new(EpochTransitionHandler::new(&core));
        collaborators
            .epoch_notifier
            .register_handler(epoch_handler.clone());

        let epoch = collaborators
            .chain
            .current_block_header()
            .or_else(|| collaborators.chain.genesis_header())
            .map_or(0, |header| header.epoch);
        match epoch_handler.initialize(epoch) {
            Ok(count) => tracing::info!(parent: &span, epoch, eligible = count, "eligible set initialised"),
            Err(err) => tracing::warn!(parent: &span, epoch, %err, "eligible set not initialised"),
        }

        let state = Arc::new(ConsensusState::new(public_key));
        let worker = Arc::new(ConsensusWorker::new(core.clone(), state.clone()));
        let pipeline = Pipeline::build(core.clone(), state.clone(), &worker, &config.consensus)?;
        let controller = Arc::new(SubroundController::new(
            core.clone(),
            state.clone(),
            pipeline,
            &config.consensus,
        ));

        Ok(Self {
            config,
            core,
            state,
            worker,
            controller,
            epoch_handler,
            metrics,
            stop: broadcast::channel(1).0,
            task: None,
        })
    }

    /// Spawn the round loop on the current tokio runtime.
    pub fn start(&mut self) -> Result<(), NodeError> {
        if self.task.is_some() {
            return Err(NodeError::AlreadyStarted);
        }
        let stop = self.stop.subscribe();
        let controller = self.controller.clone();
        self.task = Some(tokio::spawn(async move { controller.run(stop).await }));
        tracing::info!(parent: self.core.span(), "validator node started");
        Ok(())
    }

    /// Stop the round loop and wait for it to exit.
    pub async fn shutdown(&mut self) -> Result<(), NodeError> {
        // Nobody listens when the node was never started.
        let _ = self.stop.send(());
        if let Some(task) = self.task.take() {
            tokio::time::timeout(SHUTDOWN_TIMEOUT, task)
                .await
                .map_err(|_| NodeError::ShutdownTimeout)?
                .map_err(|e| NodeError::Other(e.to_string()))?;
        }
        tracing::info!(parent: self.core.span(), "validator node stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn core(&self) -> &Arc<ConsensusCore> {
        &self.core
    }

    pub fn state(&self) -> &Arc<ConsensusState> {
        &self.state
    }

    /// Message ingestion point for the transport layer.
    pub fn worker(&self) -> &Arc<ConsensusWorker> {
        &self.worker
    }

    pub fn controller(&self) -> &Arc<SubroundController> {
        &self.controller
    }

    pub fn epoch_handler(&self) -> &Arc<EpochTransitionHandler> {
        &self.epoch_handler
    }

    pub fn metrics(&self) -> Option<&Arc<NodeMetrics>> {
        self.metrics.as_ref()
    }

    /// Install a round indexer; used from the next round on.
    pub fn set_indexer(&self, indexer: Arc<dyn RoundIndexer>) -> bool {
        self.controller.set_indexer(indexer)
    }
}
