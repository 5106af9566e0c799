//! Mutable record of the current round's progress.
//!
//! The controller's execution context is the only writer of round progress. The
//! replay task, the worker and epoch callbacks read through the same lock, so every
//! accessor takes the lock for the shortest possible time and never calls out while
//! holding it.
//!
//! Writes that message handlers make (the proposal, jobs done) name the round they
//! belong to and are rejected once that round is no longer current: a handler may be
//! calling a collaborator while the controller moves on to the next round.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use spos_types::{BlockHeader, PublicKey, Round, RoundIndex};

use crate::group::ConsensusGroup;
use crate::subround::{SubroundId, SubroundStatus};
use crate::ConsensusError;

#[derive(Debug, Default)]
struct RoundData {
    round: Option<Round>,
    group: Option<ConsensusGroup>,
    canceled: bool,
    round_state: String,
    statuses: HashMap<SubroundId, SubroundStatus>,
    thresholds: HashMap<SubroundId, usize>,
    jobs_done: HashMap<SubroundId, HashSet<PublicKey>>,
    header: Option<BlockHeader>,
}

/// Point-in-time copy of the round progress, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSnapshot {
    pub round: Option<Round>,
    pub leader: Option<PublicKey>,
    pub group_size: usize,
    pub self_index: Option<usize>,
    pub canceled: bool,
    /// Label of the local node's part in the round (`proposed` when leading).
    pub round_state: String,
    pub finished: Vec<SubroundId>,
    pub header: Option<BlockHeader>,
}

pub struct ConsensusState {
    self_public_key: PublicKey,
    data: RwLock<RoundData>,
}

impl ConsensusState {
    pub fn new(self_public_key: PublicKey) -> Self {
        Self {
            self_public_key,
            data: RwLock::new(RoundData::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RoundData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RoundData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn self_public_key(&self) -> &PublicKey {
        &self.self_public_key
    }

    /// Start tracking `round`: clears the group, leader, cancellation flag, every
    /// phase status and all per-round bookkeeping.
    pub fn reset_for_new_round(&self, round: Round) {
        let mut data = self.write();
        *data = RoundData {
            round: Some(round),
            ..RoundData::default()
        };
    }

    pub fn round(&self) -> Option<Round> {
        self.read().round
    }

    pub fn round_index(&self) -> Option<RoundIndex> {
        self.read().round.map(|round| round.index)
    }

    pub fn is_current_round(&self, round: RoundIndex) -> bool {
        self.round_index() == Some(round)
    }

    pub fn set_consensus_group(&self, group: ConsensusGroup) {
        self.write().group = Some(group);
    }

    pub fn consensus_group(&self) -> Option<ConsensusGroup> {
        self.read().group.clone()
    }

    pub fn leader(&self) -> Option<PublicKey> {
        self.read().group.as_ref().map(|group| group.leader().clone())
    }

    pub fn is_self_leader(&self) -> bool {
        self.is_leader(&self.self_public_key)
    }

    pub fn is_leader(&self, public_key: &PublicKey) -> bool {
        self.read()
            .group
            .as_ref()
            .is_some_and(|group| group.leader() == public_key)
    }

    /// Position of the local validator in this round's group.
    pub fn self_consensus_group_index(&self) -> Result<usize, ConsensusError> {
        self.consensus_group_index(&self.self_public_key)
    }

    pub fn consensus_group_index(&self, public_key: &PublicKey) -> Result<usize, ConsensusError> {
        self.read()
            .group
            .as_ref()
            .and_then(|group| group.index_of(public_key))
            .ok_or(ConsensusError::NotInConsensusGroup)
    }

    pub fn is_node_in_consensus_group(&self, public_key: &PublicKey) -> bool {
        self.consensus_group_index(public_key).is_ok()
    }

    pub fn is_self_in_consensus_group(&self) -> bool {
        self.is_node_in_consensus_group(&self.self_public_key)
    }

    /// Cancel the rest of the round. Stays set until the next reset.
    pub fn cancel_round(&self) {
        self.write().canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.read().canceled
    }

    pub fn set_round_state(&self, label: &str) {
        self.write().round_state = label.to_string();
    }

    /// Record a phase status. `Finished` is final for the round.
    pub fn set_status(&self, subround: SubroundId, status: SubroundStatus) {
        let mut data = self.write();
        let entry = data.statuses.entry(subround).or_default();
        if *entry != SubroundStatus::Finished {
            *entry = status;
        }
    }

    pub fn status(&self, subround: SubroundId) -> SubroundStatus {
        self.read()
            .statuses
            .get(&subround)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_subround_finished(&self, subround: SubroundId) -> bool {
        self.status(subround) == SubroundStatus::Finished
    }

    pub fn set_threshold(&self, subround: SubroundId, threshold: usize) {
        self.write().thresholds.insert(subround, threshold);
    }

    pub fn threshold(&self, subround: SubroundId) -> usize {
        self.read().thresholds.get(&subround).copied().unwrap_or(0)
    }

    /// Mark `public_key`'s job for `subround` of `round` as done. Only group members
    /// of the current round count.
    pub fn set_job_done(
        &self,
        round: RoundIndex,
        public_key: &PublicKey,
        subround: SubroundId,
    ) -> Result<(), ConsensusError> {
        let mut data = self.write();
        if data.round.map(|current| current.index) != Some(round) {
            return Err(ConsensusError::RoundChanged(round));
        }
        let member = data
            .group
            .as_ref()
            .is_some_and(|group| group.contains(public_key));
        if !member {
            return Err(ConsensusError::NotInConsensusGroup);
        }
        data.jobs_done
            .entry(subround)
            .or_default()
            .insert(public_key.clone());
        Ok(())
    }

    pub fn job_done(&self, public_key: &PublicKey, subround: SubroundId) -> bool {
        self.read()
            .jobs_done
            .get(&subround)
            .is_some_and(|done| done.contains(public_key))
    }

    pub fn self_job_done(&self, subround: SubroundId) -> bool {
        self.job_done(&self.self_public_key, subround)
    }

    pub fn jobs_done_count(&self, subround: SubroundId) -> usize {
        self.read().jobs_done.get(&subround).map_or(0, HashSet::len)
    }

    /// Group indexes, in group order, of the members whose job for `subround` is done.
    pub fn signers(&self, subround: SubroundId) -> Vec<u16> {
        let data = self.read();
        let (Some(group), Some(done)) = (data.group.as_ref(), data.jobs_done.get(&subround))
        else {
            return Vec::new();
        };
        group
            .members()
            .iter()
            .enumerate()
            .filter(|(_, member)| done.contains(member))
            .filter_map(|(index, _)| u16::try_from(index).ok())
            .collect()
    }

    /// Keep `header` as the proposal of `round`. The first header wins, and nothing is
    /// kept once `round` is no longer current.
    pub fn set_header(&self, round: RoundIndex, header: BlockHeader) -> bool {
        let mut data = self.write();
        if data.round.map(|current| current.index) != Some(round) || data.header.is_some() {
            return false;
        }
        data.header = Some(header);
        true
    }

    pub fn header(&self) -> Option<BlockHeader> {
        self.read().header.clone()
    }

    /// The proposal of `round`, if `round` is still current.
    pub fn header_for(&self, round: RoundIndex) -> Option<BlockHeader> {
        let data = self.read();
        if data.round.map(|current| current.index) != Some(round) {
            return None;
        }
        data.header.clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let data = self.read();
        let mut finished: Vec<SubroundId> = data
            .statuses
            .iter()
            .filter(|(_, status)| **status == SubroundStatus::Finished)
            .map(|(id, _)| *id)
            .collect();
        finished.sort();
        StateSnapshot {
            round: data.round,
            leader: data.group.as_ref().map(|group| group.leader().clone()),
            group_size: data.group.as_ref().map_or(0, ConsensusGroup::len),
            self_index: data
                .group
                .as_ref()
                .and_then(|group| group.index_of(&self.self_public_key)),
            canceled: data.canceled,
            round_state: data.round_state.clone(),
            finished,
            header: data.header.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spos_types::Timestamp;
    use std::time::Duration;

    fn pk(byte: u8) -> PublicKey {
        PublicKey::new(vec![byte; 4])
    }

    fn state_with_group() -> ConsensusState {
        let state = ConsensusState::new(pk(2));
        state.reset_for_new_round(Round::new(7, Timestamp::EPOCH, Duration::from_secs(4)));
        state.set_consensus_group(ConsensusGroup::new(vec![pk(1), pk(2), pk(3)]).unwrap());
        state
    }

    #[test]
    fn self_index_and_leader() {
        let state = state_with_group();
        assert_eq!(state.self_consensus_group_index().unwrap(), 1);
        assert_eq!(state.leader(), Some(pk(1)));
        assert!(!state.is_self_leader());
    }

    #[test]
    fn observer_has_no_index() {
        let state = ConsensusState::new(pk(9));
        state.set_consensus_group(ConsensusGroup::new(vec![pk(1)]).unwrap());
        assert!(matches!(
            state.self_consensus_group_index(),
            Err(ConsensusError::NotInConsensusGroup)
        ));
    }

    #[test]
    fn cancellation_is_sticky_until_reset() {
        let state = state_with_group();
        state.cancel_round();
        state.set_status(SubroundId(0), SubroundStatus::NotFinished);
        assert!(state.is_canceled());
        state.reset_for_new_round(Round::new(8, Timestamp::EPOCH, Duration::from_secs(4)));
        assert!(!state.is_canceled());
        assert!(state.consensus_group().is_none());
    }

    #[test]
    fn finished_status_is_never_demoted() {
        let state = state_with_group();
        state.set_status(SubroundId(1), SubroundStatus::Finished);
        state.set_status(SubroundId(1), SubroundStatus::NotFinished);
        assert!(state.is_subround_finished(SubroundId(1)));
        assert!(!state.is_subround_finished(SubroundId(2)));
    }

    #[test]
    fn signers_follow_group_order() {
        let state = state_with_group();
        state.set_job_done(7, &pk(3), SubroundId(2)).unwrap();
        state.set_job_done(7, &pk(1), SubroundId(2)).unwrap();
        assert!(state.set_job_done(7, &pk(8), SubroundId(2)).is_err());
        assert_eq!(state.signers(SubroundId(2)), vec![0, 2]);
        assert_eq!(state.jobs_done_count(SubroundId(2)), 2);
    }

    #[test]
    fn first_header_wins() {
        let state = state_with_group();
        let first = BlockHeader {
            nonce: 1,
            ..BlockHeader::default()
        };
        assert!(state.set_header(7, first.clone()));
        assert!(!state.set_header(7, BlockHeader::default()));
        assert_eq!(state.header(), Some(first));
    }

    #[test]
    fn writes_for_a_previous_round_are_rejected() {
        let state = state_with_group();
        state.reset_for_new_round(Round::new(8, Timestamp::EPOCH, Duration::from_secs(4)));
        state.set_consensus_group(ConsensusGroup::new(vec![pk(1), pk(2), pk(3)]).unwrap());

        assert!(!state.set_header(7, BlockHeader::default()));
        assert!(matches!(
            state.set_job_done(7, &pk(1), SubroundId(1)),
            Err(ConsensusError::RoundChanged(7))
        ));
        assert_eq!(state.header(), None);
        assert!(!state.job_done(&pk(1), SubroundId(1)));
        assert!(!state.is_current_round(7));
        assert!(state.is_current_round(8));

        assert!(state.set_header(8, BlockHeader::default()));
        assert!(state.header_for(8).is_some());
        assert!(state.header_for(7).is_none());
    }

    #[test]
    fn snapshot_reports_progress() {
        let state = state_with_group();
        state.set_status(SubroundId(0), SubroundStatus::Finished);
        state.set_round_state("participant");
        let snapshot = state.snapshot();
        assert_eq!(snapshot.round_state, "participant");
        assert_eq!(snapshot.self_index, Some(1));
        assert_eq!(snapshot.group_size, 3);
        assert_eq!(snapshot.finished, vec![SubroundId(0)]);
    }
}
