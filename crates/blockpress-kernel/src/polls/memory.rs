//! In-memory poll store.
//!
//! One mutex guards polls and vote records together, so the duplicate check
//! and the increments of a vote are a single critical section.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use blockpress_types::{Poll, PollId, VoteRecord};

use super::{PollError, PollResult, PollStore};

#[derive(Debug, Default)]
struct Inner {
    polls: HashMap<PollId, Poll>,
    /// Per poll, in arrival order.
    votes: HashMap<PollId, Vec<VoteRecord>>,
}

#[derive(Debug, Default)]
pub struct MemoryPollStore {
    inner: Mutex<Inner>,
}

impl MemoryPollStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored polls.
    pub fn len(&self) -> usize {
        self.inner.lock().polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().polls.is_empty()
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn get(&self, poll_id: &PollId) -> PollResult<Option<Poll>> {
        Ok(self.inner.lock().polls.get(poll_id).cloned())
    }

    async fn replace(&self, poll: Poll) -> PollResult<Poll> {
        let mut inner = self.inner.lock();
        inner.polls.insert(poll.poll_id().clone(), poll.clone());
        Ok(poll)
    }

    async fn record_vote(&self, vote: VoteRecord) -> PollResult<Poll> {
        let mut inner = self.inner.lock();
        let Inner { polls, votes } = &mut *inner;

        let poll = polls
            .get_mut(&vote.poll_id)
            .ok_or_else(|| PollError::NotFound(vote.poll_id.clone()))?;
        let records = votes.entry(vote.poll_id.clone()).or_default();
        if records
            .iter()
            .any(|r| r.voter_fingerprint == vote.voter_fingerprint)
        {
            return Err(PollError::AlreadyVoted(vote.poll_id));
        }
        if !poll.record_vote(&vote.option_id) {
            return Err(PollError::UnknownOption {
                poll_id: vote.poll_id,
                option_id: vote.option_id,
            });
        }
        let updated = poll.clone();
        records.push(vote);
        Ok(updated)
    }

    async fn voters(&self, poll_id: &PollId) -> PollResult<Vec<VoteRecord>> {
        Ok(self
            .inner
            .lock()
            .votes
            .get(poll_id)
            .cloned()
            .unwrap_or_default())
    }
}
