//! Consensus timing configuration.
//!
//! Every phase budget is a percentage of the round duration measured from the round
//! start, so the percentages are deadlines: they must not decrease along the pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::subround::{CancelOnTimeout, ExtendPolicy, GrantOnce};
use crate::ConsensusError;

/// Timing and extension settings for the subround pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Budget of the start phase: group derivation and re-keying must finish within
    /// this share of the round.
    #[serde(default = "default_processing_threshold")]
    pub processing_threshold_percentage: u32,

    /// Deadline of the block proposal phase.
    #[serde(default = "default_block_percentage")]
    pub block_percentage: u32,

    /// Deadline of the signature collection phase.
    #[serde(default = "default_signature_percentage")]
    pub signature_percentage: u32,

    /// Deadline of the finalisation phase.
    #[serde(default = "default_end_round_percentage")]
    pub end_round_percentage: u32,

    /// How often the controller polls a phase's completion check.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub extension: ExtensionConfig,
}

/// Deadline extension policy applied when a phase runs out of time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// When false, an unfinished phase cancels the round at its deadline.
    #[serde(default)]
    pub enabled: bool,

    /// Extra share of the round granted once per phase.
    #[serde(default = "default_extra_percentage")]
    pub extra_percentage: u32,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_processing_threshold() -> u32 {
    25
}

fn default_block_percentage() -> u32 {
    40
}

fn default_signature_percentage() -> u32 {
    85
}

fn default_end_round_percentage() -> u32 {
    95
}

fn default_poll_interval_ms() -> u64 {
    5
}

fn default_extra_percentage() -> u32 {
    10
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ConsensusConfig {
    /// Reject budgets outside `1..=100`, decreasing deadlines and a zero poll interval.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        let deadlines = [
            ("processing_threshold_percentage", self.processing_threshold_percentage),
            ("block_percentage", self.block_percentage),
            ("signature_percentage", self.signature_percentage),
            ("end_round_percentage", self.end_round_percentage),
        ];
        for (name, value) in deadlines {
            if value == 0 || value > 100 {
                return Err(ConsensusError::InvalidConfig(format!(
                    "{name} must be within 1..=100, got {value}"
                )));
            }
        }
        for pair in deadlines.windows(2) {
            if pair[1].1 < pair[0].1 {
                return Err(ConsensusError::InvalidConfig(format!(
                    "{} ({}) must not be below {} ({})",
                    pair[1].0, pair[1].1, pair[0].0, pair[0].1
                )));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(ConsensusError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.extension.enabled
            && (self.extension.extra_percentage == 0 || self.extension.extra_percentage > 100)
        {
            return Err(ConsensusError::InvalidConfig(format!(
                "extension.extra_percentage must be within 1..=100, got {}",
                self.extension.extra_percentage
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The extension policy shared by every phase of the pipeline.
    pub fn extend_policy(&self) -> Arc<dyn ExtendPolicy> {
        if self.extension.enabled {
            Arc::new(GrantOnce::new(self.extension.extra_percentage))
        } else {
            Arc::new(CancelOnTimeout)
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            processing_threshold_percentage: default_processing_threshold(),
            block_percentage: default_block_percentage(),
            signature_percentage: default_signature_percentage(),
            end_round_percentage: default_end_round_percentage(),
            poll_interval_ms: default_poll_interval_ms(),
            extension: ExtensionConfig::default(),
        }
    }
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            extra_percentage: default_extra_percentage(),
        }
    }
}
