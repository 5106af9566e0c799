//! Named-key status updates: leader counts, consensus state labels, round outcomes.
//!
//! Updates are best-effort and must never block the caller.

pub const METRIC_COUNT_LEADER: &str = "spos_count_leader";
pub const METRIC_COUNT_CONSENSUS: &str = "spos_count_consensus";
pub const METRIC_COUNT_ACCEPTED_BLOCKS: &str = "spos_count_accepted_blocks";
pub const METRIC_ROUNDS_COMPLETED: &str = "spos_rounds_completed";
pub const METRIC_ROUNDS_CANCELED: &str = "spos_rounds_canceled";
pub const METRIC_CONSENSUS_STATE: &str = "spos_consensus_state";
pub const METRIC_CONSENSUS_ROUND_STATE: &str = "spos_consensus_round_state";

/// Sink for node status metrics.
pub trait StatusHandler: Send + Sync {
    fn increment(&self, key: &str);

    fn set_string_value(&self, key: &str, value: &str);
}

/// Discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStatusHandler;

impl StatusHandler for NullStatusHandler {
    fn increment(&self, _key: &str) {}

    fn set_string_value(&self, _key: &str, _value: &str) {}
}
