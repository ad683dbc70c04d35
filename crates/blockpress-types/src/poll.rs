//! Poll value types.
//!
//! A [`Poll`] is the stored, countable form of a poll block. Its
//! `total_votes` is derived: every constructor (including deserialization)
//! checks it against the option counts instead of trusting a stored value.

use serde::{Deserialize, Serialize};

use crate::ids::{OptionId, PollId};

/// One answer as authored in the editor (no count).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollChoice {
    pub id: OptionId,
    pub text: String,
}

impl PollChoice {
    pub fn new(id: impl Into<OptionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One answer with its running count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: OptionId,
    pub text: String,
    pub votes: u64,
}

/// Errors from building a poll whose counts disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollShapeError {
    #[error("total votes {stored} does not match option sum {summed}")]
    TotalMismatch { stored: u64, summed: u64 },

    #[error("duplicate option id '{0}'")]
    DuplicateOption(OptionId),
}

/// A poll with counts. `total_votes` always equals the sum of option votes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PollRepr")]
pub struct Poll {
    poll_id: PollId,
    question: String,
    options: Vec<PollOption>,
    total_votes: u64,
}

/// Wire shape before the invariant check.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollRepr {
    poll_id: PollId,
    question: String,
    options: Vec<PollOption>,
    #[serde(default)]
    total_votes: Option<u64>,
}

impl TryFrom<PollRepr> for Poll {
    type Error = PollShapeError;

    fn try_from(repr: PollRepr) -> Result<Self, Self::Error> {
        let poll = Poll::with_counts(repr.poll_id, repr.question, repr.options)?;
        match repr.total_votes {
            Some(stored) if stored != poll.total_votes => Err(PollShapeError::TotalMismatch {
                stored,
                summed: poll.total_votes,
            }),
            _ => Ok(poll),
        }
    }
}

impl Poll {
    /// A fresh poll: every count at zero.
    pub fn new(
        poll_id: PollId,
        question: impl Into<String>,
        choices: impl IntoIterator<Item = PollChoice>,
    ) -> Result<Self, PollShapeError> {
        let options = choices
            .into_iter()
            .map(|c| PollOption {
                id: c.id,
                text: c.text,
                votes: 0,
            })
            .collect();
        Self::with_counts(poll_id, question, options)
    }

    /// Rebuild a poll from stored counts; the total is recomputed.
    pub fn with_counts(
        poll_id: PollId,
        question: impl Into<String>,
        options: Vec<PollOption>,
    ) -> Result<Self, PollShapeError> {
        for (i, opt) in options.iter().enumerate() {
            if options[..i].iter().any(|o| o.id == opt.id) {
                return Err(PollShapeError::DuplicateOption(opt.id.clone()));
            }
        }
        let total_votes = options.iter().map(|o| o.votes).sum();
        Ok(Self {
            poll_id,
            question: question.into(),
            options,
            total_votes,
        })
    }

    pub fn poll_id(&self) -> &PollId {
        &self.poll_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    pub fn option(&self, id: &OptionId) -> Option<&PollOption> {
        self.options.iter().find(|o| &o.id == id)
    }

    /// Count one vote for `option_id`. Returns `false` (and changes nothing)
    /// when the option does not exist.
    pub fn record_vote(&mut self, option_id: &OptionId) -> bool {
        match self.options.iter_mut().find(|o| &o.id == option_id) {
            Some(opt) => {
                opt.votes += 1;
                self.total_votes += 1;
                true
            }
            None => false,
        }
    }

    /// The authored shape (ids and texts, no counts).
    pub fn choices(&self) -> Vec<PollChoice> {
        self.options
            .iter()
            .map(|o| PollChoice::new(o.id.clone(), o.text.clone()))
            .collect()
    }

    /// Check if the question and options match an authored poll exactly.
    pub fn same_shape(&self, question: &str, choices: &[PollChoice]) -> bool {
        self.question == question
            && self.options.len() == choices.len()
            && self
                .options
                .iter()
                .zip(choices)
                .all(|(o, c)| o.id == c.id && o.text == c.text)
    }

    /// Share of the total for one option, in percent (0 when nobody voted).
    pub fn percentage(&self, option_id: &OptionId) -> f64 {
        match (self.option(option_id), self.total_votes) {
            (Some(opt), total) if total > 0 => opt.votes as f64 * 100.0 / total as f64,
            _ => 0.0,
        }
    }
}

/// One recorded vote. `(poll_id, voter_fingerprint)` is unique.
///
/// The fingerprint is client-generated and spoofable: it approximates "one
/// vote per visitor" for low-stakes polls and is not an identity. The IP is
/// kept for audit only and plays no part in uniqueness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub poll_id: PollId,
    pub option_id: OptionId,
    pub voter_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voter_ip: Option<String>,
    /// Unix millis.
    pub created_at: u64,
}
