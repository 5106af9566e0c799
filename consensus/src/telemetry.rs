//! Optional round indexing.
//!
//! The default indexer is a no-op and is never called: callers check
//! [`RoundIndexer::is_noop`] before submitting. A real indexer receives round info
//! from a detached task, so its latency and failures never touch the round.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Span;

use spos_types::{RoundIndex, ShardId, Timestamp};

use crate::tasks::spawn_detached;
use crate::tracing_spans::telemetry_span;

/// Round statistics handed to an indexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub index: RoundIndex,
    pub signer_indexes: Vec<u64>,
    pub block_proposed: bool,
    pub shard_id: ShardId,
    pub timestamp: Timestamp,
}

pub trait RoundIndexer: Send + Sync {
    fn save_round_info(&self, info: RoundInfo) -> Result<(), String>;

    fn is_noop(&self) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopIndexer;

impl RoundIndexer for NoopIndexer {
    fn save_round_info(&self, _info: RoundInfo) -> Result<(), String> {
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Hand `info` to `indexer` in the background. Returns whether a submission was
/// started.
pub fn submit_round_info(indexer: Arc<dyn RoundIndexer>, info: RoundInfo, parent: &Span) -> bool {
    if indexer.is_noop() {
        return false;
    }
    let span = telemetry_span(parent, info.index);
    spawn_detached("spos-telemetry", span, move || {
        let index = info.index;
        if let Err(err) = indexer.save_round_info(info) {
            tracing::error!(round = index, %err, "failed to index round info");
        }
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Sender};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ChannelIndexer(Mutex<Sender<RoundIndex>>);

    impl RoundIndexer for ChannelIndexer {
        fn save_round_info(&self, info: RoundInfo) -> Result<(), String> {
            self.0.lock().unwrap().send(info.index).unwrap();
            Err("indexer offline".to_string())
        }

        fn is_noop(&self) -> bool {
            false
        }
    }

    fn info() -> RoundInfo {
        RoundInfo {
            index: 3,
            signer_indexes: vec![0, 2],
            block_proposed: true,
            shard_id: 0,
            timestamp: Timestamp::from_millis(10),
        }
    }

    #[test]
    fn noop_indexer_is_skipped() {
        assert!(!submit_round_info(Arc::new(NoopIndexer), info(), &Span::none()));
    }

    #[test]
    fn real_indexer_receives_info_and_errors_are_swallowed() {
        let (tx, rx) = channel();
        let indexer = Arc::new(ChannelIndexer(Mutex::new(tx)));
        assert!(submit_round_info(indexer, info(), &Span::none()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 3);
    }
}
