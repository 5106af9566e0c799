//! Nullable broadcaster — record consensus messages without sending them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use spos_consensus::{Broadcaster, ConsensusMessage, MessageTopic};

use crate::locked;

/// A test broadcaster that records messages instead of sending them.
#[derive(Default)]
pub struct NullBroadcaster {
    sent: Mutex<Vec<ConsensusMessage>>,
    offline: AtomicBool,
}

impl NullBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every broadcast fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Get all sent messages (for assertions).
    pub fn sent(&self) -> Vec<ConsensusMessage> {
        locked(&self.sent).clone()
    }

    pub fn sent_with_topic(&self, topic: MessageTopic) -> Vec<ConsensusMessage> {
        self.sent()
            .into_iter()
            .filter(|message| message.topic() == topic)
            .collect()
    }

    /// Drain the recorded messages, e.g. to deliver them to another node.
    pub fn take_sent(&self) -> Vec<ConsensusMessage> {
        std::mem::take(&mut *locked(&self.sent))
    }
}

impl Broadcaster for NullBroadcaster {
    fn broadcast(&self, message: ConsensusMessage) -> Result<(), String> {
        if self.offline.load(Ordering::SeqCst) {
            return Err("null broadcaster: offline".to_string());
        }
        locked(&self.sent).push(message);
        Ok(())
    }
}
