//! Prometheus metrics for the validator node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] and is the node's
//! [`StatusHandler`]: the consensus engine's named counters land in
//! [`IntCounter`]s and its string states in an [`IntGaugeVec`] labelled by key and
//! value, where only the latest value of each key is set to 1.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_vec_with_registry, Encoder,
    IntCounter, IntGaugeVec, Opts, Registry, TextEncoder,
};

use spos_consensus::status::{
    METRIC_COUNT_ACCEPTED_BLOCKS, METRIC_COUNT_CONSENSUS, METRIC_COUNT_LEADER,
    METRIC_ROUNDS_CANCELED, METRIC_ROUNDS_COMPLETED,
};
use spos_consensus::StatusHandler;

use crate::error::NodeError;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Rounds in which this node was the leader.
    pub count_leader: IntCounter,
    /// Rounds in which this node was a non-leading group member.
    pub count_consensus: IntCounter,
    /// Blocks committed through consensus.
    pub accepted_blocks: IntCounter,
    pub rounds_completed: IntCounter,
    pub rounds_canceled: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Current string state per key (`consensus_state`, `round_state`).
    pub states: IntGaugeVec,

    current_states: Mutex<HashMap<String, String>>,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let count_leader = register_int_counter_with_registry!(
            Opts::new("spos_count_leader_total", "Rounds led by this node"),
            registry
        )?;

        let count_consensus = register_int_counter_with_registry!(
            Opts::new(
                "spos_count_consensus_total",
                "Rounds this node took part in without leading"
            ),
            registry
        )?;

        let accepted_blocks = register_int_counter_with_registry!(
            Opts::new(
                "spos_accepted_blocks_total",
                "Blocks committed through consensus"
            ),
            registry
        )?;

        let rounds_completed = register_int_counter_with_registry!(
            Opts::new("spos_rounds_completed_total", "Rounds that ran every phase"),
            registry
        )?;

        let rounds_canceled = register_int_counter_with_registry!(
            Opts::new("spos_rounds_canceled_total", "Rounds canceled before the end"),
            registry
        )?;

        let states = register_int_gauge_vec_with_registry!(
            Opts::new("spos_consensus_status", "Latest consensus state value per key"),
            &["key", "value"],
            registry
        )?;

        Ok(Self {
            registry,
            count_leader,
            count_consensus,
            accepted_blocks,
            rounds_completed,
            rounds_canceled,
            states,
            current_states: Mutex::new(HashMap::new()),
        })
    }

    /// Encode the registry in the Prometheus text exposition format.
    pub fn gather_text(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| NodeError::Other(e.to_string()))
    }

    /// Latest string value recorded for `key`.
    pub fn state(&self, key: &str) -> Option<String> {
        self.current_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl StatusHandler for NodeMetrics {
    fn increment(&self, key: &str) {
        let counter = match key {
            METRIC_COUNT_LEADER => &self.count_leader,
            METRIC_COUNT_CONSENSUS => &self.count_consensus,
            METRIC_COUNT_ACCEPTED_BLOCKS => &self.accepted_blocks,
            METRIC_ROUNDS_COMPLETED => &self.rounds_completed,
            METRIC_ROUNDS_CANCELED => &self.rounds_canceled,
            other => {
                tracing::trace!(key = other, "unknown status counter");
                return;
            }
        };
        counter.inc();
    }

    fn set_string_value(&self, key: &str, value: &str) {
        let mut current = self
            .current_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.insert(key.to_string(), value.to_string()) {
            if previous != value {
                let _ = self.states.remove_label_values(&[key, &previous]);
            }
        }
        self.states.with_label_values(&[key, value]).set(1);
    }
}
