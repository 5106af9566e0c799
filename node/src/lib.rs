//! SPOS validator node — assembles and runs the consensus engine.
//!
//! The node:
//! - Loads its configuration from TOML
//! - Initialises structured logging and Prometheus metrics
//! - Builds the consensus core, worker, phase pipeline and round controller
//! - Registers the epoch transition handler with the epoch-start notifier
//! - Runs the round loop until shutdown

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{Collaborators, ValidatorNode};
