//! Recording sinks for telemetry and status updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use spos_consensus::{RoundIndexer, RoundInfo, StatusHandler};

use crate::locked;

/// Indexer that keeps every submitted round.
///
/// Built with [`RecordingIndexer::noop`] it reports itself as a no-op while still
/// recording, which lets a test prove no-op indexers are never called.
#[derive(Default)]
pub struct RecordingIndexer {
    noop: bool,
    failing: AtomicBool,
    saved: Mutex<Vec<RoundInfo>>,
}

impl RecordingIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn noop() -> Self {
        Self {
            noop: true,
            ..Self::default()
        }
    }

    /// Record, then report failure for every save.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<RoundInfo> {
        locked(&self.saved).clone()
    }

    /// Submissions are detached; poll until `count` arrived or `timeout` passed.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if locked(&self.saved).len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        locked(&self.saved).len() >= count
    }
}

impl RoundIndexer for RecordingIndexer {
    fn save_round_info(&self, info: RoundInfo) -> Result<(), String> {
        locked(&self.saved).push(info);
        if self.failing.load(Ordering::SeqCst) {
            return Err("recording indexer: store unavailable".to_string());
        }
        Ok(())
    }

    fn is_noop(&self) -> bool {
        self.noop
    }
}

/// Status sink that keeps counters and the latest string value per key.
#[derive(Default)]
pub struct RecordingStatusHandler {
    counters: Mutex<HashMap<String, u64>>,
    values: Mutex<HashMap<String, String>>,
}

impl RecordingStatusHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, key: &str) -> u64 {
        locked(&self.counters).get(key).copied().unwrap_or(0)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        locked(&self.values).get(key).cloned()
    }
}

impl StatusHandler for RecordingStatusHandler {
    fn increment(&self, key: &str) {
        *locked(&self.counters).entry(key.to_string()).or_default() += 1;
    }

    fn set_string_value(&self, key: &str, value: &str) {
        locked(&self.values).insert(key.to_string(), value.to_string());
    }
}
