//! Entry point for consensus messages coming from the transport layer.
//!
//! Messages are screened (eligible sender, round window) and then either dispatched
//! to the phase handler registered for their topic, or stored when they arrive ahead
//! of the local state: for the next round, or for the current round before the start
//! phase has finished initialising it. The start phase triggers
//! [`MessageReplay::execute_stored_messages`] once initialisation is done.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::core::ConsensusCore;
use crate::message::{ConsensusMessage, MessageTopic};
use crate::phases::START_ROUND;
use crate::state::ConsensusState;
use crate::tracing_spans::message_span;
use crate::ConsensusError;

/// Upper bound on messages held for replay.
pub const DEFAULT_MAX_STORED_MESSAGES: usize = 1024;

/// Phase-side handler for one message topic.
///
/// Handlers must tolerate replays and late arrivals: a message for a phase that is
/// already finished, or for a round that is no longer current, is discarded.
pub trait MessageHandler: Send + Sync {
    fn topic(&self) -> MessageTopic;

    /// Returns whether the message changed the round state.
    fn handle(&self, message: &ConsensusMessage) -> bool;
}

/// Replays messages that arrived before the round was ready for them.
pub trait MessageReplay: Send + Sync {
    fn execute_stored_messages(&self);
}

/// What happened to an accepted message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Handed to the phase handler; `applied` is the handler's verdict.
    Dispatched { applied: bool },
    /// Held until the start phase of its round finishes.
    Stored,
    /// The replay buffer is full.
    Dropped,
}

pub struct ConsensusWorker {
    core: Arc<ConsensusCore>,
    state: Arc<ConsensusState>,
    handlers: RwLock<HashMap<MessageTopic, Arc<dyn MessageHandler>>>,
    stored: Mutex<Vec<ConsensusMessage>>,
    max_stored: usize,
}

impl ConsensusWorker {
    pub fn new(core: Arc<ConsensusCore>, state: Arc<ConsensusState>) -> Self {
        Self::with_capacity(core, state, DEFAULT_MAX_STORED_MESSAGES)
    }

    pub fn with_capacity(
        core: Arc<ConsensusCore>,
        state: Arc<ConsensusState>,
        max_stored: usize,
    ) -> Self {
        Self {
            core,
            state,
            handlers: RwLock::new(HashMap::new()),
            stored: Mutex::new(Vec::new()),
            max_stored,
        }
    }

    /// Route messages of the handler's topic to it, replacing any previous handler.
    pub fn register_handler(&self, handler: Arc<dyn MessageHandler>) {
        let topic = handler.topic();
        let previous = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic, handler);
        if previous.is_some() {
            tracing::warn!(?topic, "message handler replaced");
        }
    }

    pub fn stored_len(&self) -> usize {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Screen and route one inbound message.
    pub fn process_received_message(
        &self,
        message: ConsensusMessage,
    ) -> Result<MessageDisposition, ConsensusError> {
        let span = message_span(self.core.span(), message.round, topic_name(message.topic()));
        let _entered = span.enter();

        let shard_id = self.core.shard_coordinator().self_id();
        if !self.core.eligible().contains(shard_id, &message.sender) {
            tracing::trace!(sender = %message.sender, "message from non-eligible sender");
            return Err(ConsensusError::SenderNotEligible(message.sender.to_string()));
        }

        let current_round = self.core.clock().round_index();
        if message.round < current_round {
            return Err(ConsensusError::MessageForPastRound {
                message_round: message.round,
                current_round,
            });
        }
        if message.round > current_round.saturating_add(1) {
            return Err(ConsensusError::MessageForFutureRound {
                message_round: message.round,
                current_round,
            });
        }

        {
            let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
            let ready = self.state.round_index() == Some(message.round)
                && self.state.is_subround_finished(START_ROUND);
            if !ready {
                // Replay does not run while the node is syncing, so rounds the clock has
                // left behind are evicted here.
                let before = stored.len();
                stored.retain(|held| held.round >= current_round);
                if stored.len() < before {
                    let evicted = before - stored.len();
                    tracing::trace!(evicted, "stale stored messages evicted");
                }
                if stored.len() >= self.max_stored {
                    tracing::debug!(limit = self.max_stored, "replay buffer full, message dropped");
                    return Ok(MessageDisposition::Dropped);
                }
                tracing::trace!("message stored until its round is initialised");
                stored.push(message);
                return Ok(MessageDisposition::Stored);
            }
        }

        let applied = self.dispatch(&message)?;
        Ok(MessageDisposition::Dispatched { applied })
    }

    fn dispatch(&self, message: &ConsensusMessage) -> Result<bool, ConsensusError> {
        let topic = message.topic();
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .cloned()
            .ok_or(ConsensusError::NoHandler(topic))?;
        Ok(handler.handle(message))
    }
}

impl MessageReplay for ConsensusWorker {
    /// Dispatch the stored messages of the current round exactly once, keep the ones
    /// for later rounds and drop the rest.
    fn execute_stored_messages(&self) {
        let Some(current_round) = self.state.round_index() else {
            return;
        };
        let due = {
            let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
            let (due, later): (Vec<_>, Vec<_>) = mem::take(&mut *stored)
                .into_iter()
                .filter(|message| message.round >= current_round)
                .partition(|message| message.round == current_round);
            *stored = later;
            due
        };
        if due.is_empty() {
            return;
        }
        tracing::debug!(round = current_round, count = due.len(), "replaying stored messages");
        for message in &due {
            match self.dispatch(message) {
                Ok(applied) => tracing::trace!(topic = ?message.topic(), applied, "stored message replayed"),
                Err(err) => tracing::debug!(%err, "stored message not replayed"),
            }
        }
    }
}

fn topic_name(topic: MessageTopic) -> &'static str {
    match topic {
        MessageTopic::Block => "block",
        MessageTopic::Signature => "signature",
        MessageTopic::FinalInfo => "final_info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessagePayload;
    use crate::subround::SubroundStatus;
    use crate::test_support::{pk, Harness, ROUND_MS};
    use spos_types::{PublicKey, Round, RoundIndex, Timestamp};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingHandler(AtomicUsize);

    impl MessageHandler for CountingHandler {
        fn topic(&self) -> MessageTopic {
            MessageTopic::Signature
        }

        fn handle(&self, _message: &ConsensusMessage) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn setup(capacity: usize) -> (Harness, ConsensusWorker, Arc<CountingHandler>) {
        let harness = Harness::new(&[1, 2], 1);
        harness
            .core
            .eligible()
            .replace_shard(0, HashSet::from([pk(1), pk(2)]));
        harness.clock.index.store(5, Ordering::SeqCst);
        let worker =
            ConsensusWorker::with_capacity(harness.core.clone(), harness.state.clone(), capacity);
        let handler = Arc::new(CountingHandler::default());
        worker.register_handler(handler.clone());
        (harness, worker, handler)
    }

    fn share(round: RoundIndex, sender: PublicKey) -> ConsensusMessage {
        ConsensusMessage::new(round, sender, MessagePayload::SignatureShare(vec![1]))
    }

    fn round(index: RoundIndex) -> Round {
        Round::new(index, Timestamp::EPOCH, Duration::from_millis(ROUND_MS))
    }

    #[test]
    fn rejects_ineligible_sender() {
        let (_harness, worker, _) = setup(8);
        assert!(matches!(
            worker.process_received_message(share(5, pk(9))),
            Err(ConsensusError::SenderNotEligible(_))
        ));
    }

    #[test]
    fn rejects_rounds_outside_window() {
        let (_harness, worker, _) = setup(8);
        assert!(matches!(
            worker.process_received_message(share(4, pk(2))),
            Err(ConsensusError::MessageForPastRound { .. })
        ));
        assert!(matches!(
            worker.process_received_message(share(7, pk(2))),
            Err(ConsensusError::MessageForFutureRound { .. })
        ));
    }

    #[test]
    fn stores_until_start_round_finishes() {
        let (harness, worker, handler) = setup(8);
        harness.state.reset_for_new_round(round(5));
        assert_eq!(
            worker.process_received_message(share(5, pk(2))).unwrap(),
            MessageDisposition::Stored
        );
        assert_eq!(handler.0.load(Ordering::SeqCst), 0);

        harness
            .state
            .set_status(START_ROUND, SubroundStatus::Finished);
        assert_eq!(
            worker.process_received_message(share(5, pk(1))).unwrap(),
            MessageDisposition::Dispatched { applied: true }
        );
        worker.execute_stored_messages();
        assert_eq!(handler.0.load(Ordering::SeqCst), 2);
        assert_eq!(worker.stored_len(), 0);
    }

    #[test]
    fn replay_keeps_next_round_and_drops_stale() {
        let (harness, worker, handler) = setup(8);
        harness.state.reset_for_new_round(round(5));
        worker.process_received_message(share(5, pk(2))).unwrap();
        worker.process_received_message(share(6, pk(2))).unwrap();

        worker.execute_stored_messages();
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
        assert_eq!(worker.stored_len(), 1);

        // Replay runs at most once per stored message.
        worker.execute_stored_messages();
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);

        harness.state.reset_for_new_round(round(7));
        worker.execute_stored_messages();
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
        assert_eq!(worker.stored_len(), 0);
    }

    #[test]
    fn full_buffer_drops() {
        let (_harness, worker, _) = setup(2);
        worker.process_received_message(share(5, pk(1))).unwrap();
        worker.process_received_message(share(6, pk(2))).unwrap();
        assert_eq!(
            worker.process_received_message(share(6, pk(1))).unwrap(),
            MessageDisposition::Dropped
        );
    }

    #[test]
    fn stale_messages_make_room_for_current_round() {
        let (harness, worker, handler) = setup(2);
        worker.process_received_message(share(5, pk(1))).unwrap();
        worker.process_received_message(share(6, pk(2))).unwrap();

        // The node was syncing through rounds 5 to 8; round 9 is initialising.
        harness.clock.index.store(9, Ordering::SeqCst);
        harness.state.reset_for_new_round(round(9));
        assert_eq!(
            worker.process_received_message(share(9, pk(2))).unwrap(),
            MessageDisposition::Stored
        );
        assert_eq!(worker.stored_len(), 1);

        harness
            .state
            .set_status(START_ROUND, SubroundStatus::Finished);
        worker.execute_stored_messages();
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_topic_has_no_handler() {
        let (harness, worker, _) = setup(8);
        harness.state.reset_for_new_round(round(5));
        harness
            .state
            .set_status(START_ROUND, SubroundStatus::Finished);
        let message = ConsensusMessage::new(
            5,
            pk(2),
            MessagePayload::FinalInfo {
                aggregated_signature: Vec::new(),
                signers: Vec::new(),
            },
        );
        assert!(matches!(
            worker.process_received_message(message),
            Err(ConsensusError::NoHandler(MessageTopic::FinalInfo))
        ));
    }
}
