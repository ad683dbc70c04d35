//! SQLite poll store.
//!
//! Counters live in `poll_options.votes` and `polls.total_votes`; vote
//! records in `poll_votes` with `UNIQUE(poll_id, voter_fingerprint)`. A vote
//! runs in an IMMEDIATE transaction so the write lock is taken before the
//! duplicate check, and concurrent voters serialize on it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};

use blockpress_types::{OptionId, Poll, PollId, PollOption, VoteRecord};

use super::{PollError, PollResult, PollStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS polls (
    poll_id TEXT PRIMARY KEY,
    question TEXT NOT NULL,
    total_votes INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS poll_options (
    poll_id TEXT NOT NULL REFERENCES polls(poll_id) ON DELETE CASCADE,
    option_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    votes INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (poll_id, option_id)
);

-- One row per vote; the fingerprint is client supplied (best effort only)
CREATE TABLE IF NOT EXISTS poll_votes (
    id INTEGER PRIMARY KEY,
    poll_id TEXT NOT NULL REFERENCES polls(poll_id) ON DELETE CASCADE,
    option_id TEXT NOT NULL,
    voter_fingerprint TEXT NOT NULL,
    voter_ip TEXT,
    created_at INTEGER NOT NULL,
    UNIQUE (poll_id, voter_fingerprint)
);
CREATE INDEX IF NOT EXISTS idx_poll_votes_poll ON poll_votes(poll_id, id);
"#;

/// Poll store over a shared SQLite connection.
#[derive(Clone)]
pub struct SqlitePollStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePollStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> PollResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> PollResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> PollResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Load a poll and check its stored total against the option sum.
fn load_poll(conn: &Connection, poll_id: &PollId) -> PollResult<Option<Poll>> {
    let header: Option<(String, i64)> = conn
        .query_row(
            "SELECT question, total_votes FROM polls WHERE poll_id = ?1",
            params![poll_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((question, stored_total)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT option_id, text, votes FROM poll_options
         WHERE poll_id = ?1 ORDER BY position",
    )?;
    let options = stmt
        .query_map(params![poll_id.as_str()], |row| {
            let id: String = row.get(0)?;
            let votes: i64 = row.get(2)?;
            Ok(PollOption {
                id: OptionId::from(id),
                text: row.get(1)?,
                votes: votes.max(0) as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let corrupt = |reason: String| PollError::Corrupt {
        poll_id: poll_id.clone(),
        reason,
    };
    let poll = Poll::with_counts(poll_id.clone(), question, options)
        .map_err(|e| corrupt(e.to_string()))?;
    if stored_total < 0 || poll.total_votes() != stored_total as u64 {
        return Err(corrupt(format!(
            "total_votes {stored_total} but options sum to {}",
            poll.total_votes()
        )));
    }
    Ok(Some(poll))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl PollStore for SqlitePollStore {
    async fn get(&self, poll_id: &PollId) -> PollResult<Option<Poll>> {
        let conn = self.conn.lock();
        load_poll(&conn, poll_id)
    }

    async fn replace(&self, poll: Poll) -> PollResult<Poll> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = poll.poll_id().as_str();

        tx.execute(
            "INSERT INTO polls (poll_id, question, total_votes, updated_at)
             VALUES (?1, ?2, 0, ?3)
             ON CONFLICT(poll_id) DO UPDATE SET
                 question = excluded.question,
                 total_votes = 0,
                 updated_at = excluded.updated_at",
            params![id, poll.question(), blockpress_types::now_millis() as i64],
        )?;
        tx.execute("DELETE FROM poll_options WHERE poll_id = ?1", params![id])?;
        for (position, option) in poll.options().iter().enumerate() {
            tx.execute(
                "INSERT INTO poll_options (poll_id, option_id, position, text, votes)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![id, option.id.as_str(), position as i64, option.text],
            )?;
        }

        let stored = load_poll(&tx, poll.poll_id())?
            .ok_or_else(|| PollError::NotFound(poll.poll_id().clone()))?;
        tx.commit()?;
        Ok(stored)
    }

    async fn record_vote(&self, vote: VoteRecord) -> PollResult<Poll> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = vote.poll_id.as_str();

        let exists: Option<i64> = tx
            .query_row("SELECT 1 FROM polls WHERE poll_id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(PollError::NotFound(vote.poll_id.clone()));
        }

        let inserted = tx.execute(
            "INSERT INTO poll_votes (poll_id, option_id, voter_fingerprint, voter_ip, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                vote.option_id.as_str(),
                vote.voter_fingerprint,
                vote.voter_ip,
                vote.created_at as i64,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(PollError::AlreadyVoted(vote.poll_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let bumped = tx.execute(
            "UPDATE poll_options SET votes = votes + 1 WHERE poll_id = ?1 AND option_id = ?2",
            params![id, vote.option_id.as_str()],
        )?;
        if bumped == 0 {
            // Dropping the transaction rolls back the vote record
            return Err(PollError::UnknownOption {
                poll_id: vote.poll_id.clone(),
                option_id: vote.option_id.clone(),
            });
        }
        tx.execute(
            "UPDATE polls SET total_votes = total_votes + 1 WHERE poll_id = ?1",
            params![id],
        )?;

        let poll = load_poll(&tx, &vote.poll_id)?
            .ok_or_else(|| PollError::NotFound(vote.poll_id.clone()))?;
        tx.commit()?;
        Ok(poll)
    }

    async fn voters(&self, poll_id: &PollId) -> PollResult<Vec<VoteRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT option_id, voter_fingerprint, voter_ip, created_at
             FROM poll_votes WHERE poll_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![poll_id.as_str()], |row| {
            let option_id: String = row.get(0)?;
            let created_at: i64 = row.get(3)?;
            Ok(VoteRecord {
                poll_id: poll_id.clone(),
                option_id: OptionId::from(option_id),
                voter_fingerprint: row.get(1)?,
                voter_ip: row.get(2)?,
                created_at: created_at.max(0) as u64,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
