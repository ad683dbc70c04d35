//! Poll engine: read, replace, and vote with one vote per fingerprint.
//!
//! The engine validates input and delegates to a [`PollStore`], which owns
//! atomicity. A vote is one read-modify-write: the duplicate check, the vote
//! record insert, and both counter increments happen together or not at all.
//!
//! Duplicate prevention keys on `(poll_id, voter_fingerprint)`. The
//! fingerprint is supplied by the client and can be forged or cleared, so
//! this is an approximation of "one vote per visitor" suited to low-stakes
//! engagement polls. It is not an identity check. The voter IP is recorded
//! for audit and does not affect uniqueness.

mod memory;
mod sqlite;

pub use memory::MemoryPollStore;
pub use sqlite::SqlitePollStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use blockpress_types::{
    ErrorKind, OptionId, Poll, PollChoice, PollId, PollShapeError, VoteRecord, now_millis,
};

#[derive(Error, Debug)]
pub enum PollError {
    #[error("poll not found: {0}")]
    NotFound(PollId),

    #[error("already voted in poll {0}")]
    AlreadyVoted(PollId),

    #[error("poll {poll_id} has no option '{option_id}'")]
    UnknownOption { poll_id: PollId, option_id: OptionId },

    #[error("invalid poll: {0}")]
    InvalidPoll(String),

    #[error("invalid vote: {0}")]
    InvalidVote(String),

    /// Stored counts disagree with each other.
    #[error("stored poll {poll_id} is inconsistent: {reason}")]
    Corrupt { poll_id: PollId, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::NotFound(_) => ErrorKind::NotFound,
            PollError::AlreadyVoted(_) => ErrorKind::Conflict,
            PollError::UnknownOption { .. }
            | PollError::InvalidPoll(_)
            | PollError::InvalidVote(_) => ErrorKind::Validation,
            PollError::Corrupt { .. } | PollError::Database(_) => ErrorKind::Storage,
        }
    }
}

impl From<PollShapeError> for PollError {
    fn from(e: PollShapeError) -> Self {
        PollError::InvalidPoll(e.to_string())
    }
}

pub type PollResult<T> = Result<T, PollError>;

/// Persistence for polls and their vote records.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn get(&self, poll_id: &PollId) -> PollResult<Option<Poll>>;

    /// Create or wholesale-replace a poll. `poll` arrives with zero counts;
    /// existing counts are dropped. Vote records are kept, so a fingerprint
    /// that already voted still conflicts after a replace.
    async fn replace(&self, poll: Poll) -> PollResult<Poll>;

    /// Atomically record a vote and increment its option and the total.
    ///
    /// Fails with `NotFound`, then `AlreadyVoted`, then `UnknownOption`, in
    /// that order; on any failure nothing changes.
    async fn record_vote(&self, vote: VoteRecord) -> PollResult<Poll>;

    /// Vote records for audit, oldest first.
    async fn voters(&self, poll_id: &PollId) -> PollResult<Vec<VoteRecord>>;
}

/// Validating front end over a [`PollStore`].
#[derive(Clone)]
pub struct PollEngine {
    store: Arc<dyn PollStore>,
}

impl PollEngine {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    /// Read a poll. No side effects.
    pub async fn get(&self, poll_id: &PollId) -> PollResult<Poll> {
        self.store
            .get(poll_id)
            .await?
            .ok_or_else(|| PollError::NotFound(poll_id.clone()))
    }

    /// Like [`get`](Self::get) but `None` when missing.
    pub async fn find(&self, poll_id: &PollId) -> PollResult<Option<Poll>> {
        self.store.get(poll_id).await
    }

    /// Create the poll, or replace its question and options.
    ///
    /// Replacing resets every count to zero, even for options that did not
    /// change. Who voted is remembered: earlier voters still get
    /// [`PollError::AlreadyVoted`]. Callers that only want to create should
    /// check [`find`](Self::find) first.
    #[tracing::instrument(skip(self, question, choices), name = "polls.upsert_and_reset_votes")]
    pub async fn upsert_and_reset_votes(
        &self,
        poll_id: &PollId,
        question: &str,
        choices: Vec<PollChoice>,
    ) -> PollResult<Poll> {
        validate_shape(poll_id, question, &choices)?;
        let poll = Poll::new(poll_id.clone(), question.trim(), choices)?;
        let stored = self.store.replace(poll).await?;
        tracing::info!(options = stored.options().len(), "poll replaced, votes reset");
        Ok(stored)
    }

    /// Cast one vote.
    ///
    /// One vote per `(poll, fingerprint)`. The fingerprint is supplied by the
    /// client and can be forged, so this only approximates one vote per
    /// visitor. `voter_ip` is recorded for audit and not used for uniqueness.
    #[tracing::instrument(skip(self, voter_fingerprint, voter_ip), name = "polls.vote")]
    pub async fn vote(
        &self,
        poll_id: &PollId,
        option_id: &OptionId,
        voter_fingerprint: &str,
        voter_ip: Option<&str>,
    ) -> PollResult<Poll> {
        let fingerprint = voter_fingerprint.trim();
        if fingerprint.is_empty() {
            return Err(PollError::InvalidVote("voter fingerprint is required".into()));
        }
        if option_id.is_empty() {
            return Err(PollError::InvalidVote("option id is required".into()));
        }

        let record = VoteRecord {
            poll_id: poll_id.clone(),
            option_id: option_id.clone(),
            voter_fingerprint: fingerprint.to_string(),
            voter_ip: voter_ip.map(str::to_string).filter(|ip| !ip.is_empty()),
            created_at: now_millis(),
        };
        match self.store.record_vote(record).await {
            Ok(poll) => {
                tracing::info!(total = poll.total_votes(), "vote recorded");
                Ok(poll)
            }
            Err(e) => {
                tracing::debug!("vote rejected: {}", e);
                Err(e)
            }
        }
    }

    pub async fn voters(&self, poll_id: &PollId) -> PollResult<Vec<VoteRecord>> {
        if self.store.get(poll_id).await?.is_none() {
            return Err(PollError::NotFound(poll_id.clone()));
        }
        self.store.voters(poll_id).await
    }
}

impl std::fmt::Debug for PollEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollEngine").finish_non_exhaustive()
    }
}

/// Check if an authored poll can be stored.
pub fn validate_shape(poll_id: &PollId, question: &str, choices: &[PollChoice]) -> PollResult<()> {
    if poll_id.is_empty() {
        return Err(PollError::InvalidPoll("poll id is required".into()));
    }
    if question.trim().is_empty() {
        return Err(PollError::InvalidPoll("question is required".into()));
    }
    if choices.is_empty() {
        return Err(PollError::InvalidPoll("at least one option is required".into()));
    }
    if let Some(c) = choices.iter().find(|c| c.id.is_empty()) {
        return Err(PollError::InvalidPoll(format!(
            "option '{}' has an empty id",
            c.text
        )));
    }
    Ok(())
}
