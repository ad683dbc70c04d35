//! Editor session: one open document, its staged images, and the save flow.
//!
//! ```text
//! save():
//!   assign poll ids ──► resolve_all ──► plan polls ──► check ──► upsert polls ──► store.save
//!                                                                                  │
//!                                              success: working doc = saved copy ◄─┘
//!                                              failure: images stay staged, poll ids kept
//! ```
//!
//! Each session owns its own [`ImageStager`]; sessions never share staged
//! images.

use std::sync::Arc;

use thiserror::Error;

use blockpress_types::block::PollData;
use blockpress_types::{BlockData, BlockError, Document, ErrorKind, PollChoice, PollId};

use crate::documents::{DocumentStore, DocumentStoreError, check_storable};
use crate::polls::{PollEngine, PollError, validate_shape};
use crate::staging::{ImageFile, ImageStager, StagingError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Document(#[from] DocumentStoreError),

    #[error(transparent)]
    Block(#[from] BlockError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Staging(e) => e.kind(),
            SessionError::Poll(e) => e.kind(),
            SessionError::Document(e) => e.kind(),
            SessionError::Block(e) => e.kind(),
        }
    }
}

/// Outcome of syncing poll blocks with the poll store on save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSync {
    /// Polls created or replaced (their votes were reset).
    pub upserted: Vec<PollId>,
    /// Polls already stored with the same question and options.
    pub unchanged: Vec<PollId>,
    /// Poll blocks without a question or options; not stored yet.
    pub skipped: usize,
}

/// Unchanged poll ids, then polls to upsert.
type PollPlan = (Vec<PollId>, Vec<(PollId, String, Vec<PollChoice>)>);

fn is_complete(poll: &PollData) -> bool {
    !poll.question.trim().is_empty() && !poll.options.is_empty()
}

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub document: Document,
    pub polls: PollSync,
}

pub struct EditorSession {
    document_id: String,
    document: Document,
    /// Last version known to be in the store (or the opened version).
    saved: Document,
    stager: ImageStager,
    documents: Arc<dyn DocumentStore>,
    polls: PollEngine,
}

impl EditorSession {
    pub fn new(
        document_id: impl Into<String>,
        document: Document,
        stager: ImageStager,
        documents: Arc<dyn DocumentStore>,
        polls: PollEngine,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            saved: document.clone(),
            document,
            stager,
            documents,
            polls,
        }
    }

    /// Load a stored document, or start empty when there is none.
    pub async fn open(
        document_id: impl Into<String>,
        stager: ImageStager,
        documents: Arc<dyn DocumentStore>,
        polls: PollEngine,
    ) -> Result<Self, SessionError> {
        let document_id = document_id.into();
        let document = match documents.load(&document_id).await {
            Ok(doc) => doc,
            Err(DocumentStoreError::NotFound(_)) => {
                tracing::debug!(%document_id, "no stored document, starting empty");
                Document::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(document_id, document, stager, documents, polls))
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn stager(&self) -> &ImageStager {
        &self.stager
    }

    /// Check if the working document differs from the last saved version.
    pub fn is_dirty(&self) -> bool {
        !self.document.content_eq(&self.saved)
    }

    /// Stage an image and return the representation to put in a block.
    pub fn attach_image(&mut self, file: ImageFile) -> Result<String, SessionError> {
        Ok(self.stager.stage(file)?)
    }

    /// Swap a staged image for another file.
    pub fn replace_image(
        &mut self,
        old_representation: &str,
        file: ImageFile,
    ) -> Result<String, SessionError> {
        Ok(self.stager.replace(old_representation, file)?)
    }

    /// Resolve images, sync polls, and persist.
    ///
    /// Poll ids are written into the working document before anything is
    /// stored, so a retry after a failed save reuses them. Nothing is written
    /// to the poll store until the resolved document has passed the checks
    /// the document store applies.
    #[tracing::instrument(skip(self), fields(document_id = %self.document_id), name = "session.save")]
    pub async fn save(&mut self) -> Result<SaveReport, SessionError> {
        let skipped = self.assign_poll_ids();
        let document = self.stager.resolve_all(&self.document).await?;
        let (unchanged, changed) = self.plan_polls(&document).await?;
        check_storable(&self.document_id, &document)?;

        let mut polls = PollSync {
            upserted: Vec::with_capacity(changed.len()),
            unchanged,
            skipped,
        };
        for (id, question, choices) in changed {
            self.polls
                .upsert_and_reset_votes(&id, &question, choices)
                .await?;
            polls.upserted.push(id);
        }
        self.documents.save(&self.document_id, &document).await?;

        tracing::info!(
            blocks = document.len(),
            polls_upserted = polls.upserted.len(),
            "document saved"
        );
        self.document = document.clone();
        self.saved = document.clone();
        Ok(SaveReport { document, polls })
    }

    /// Give every complete poll block an id. Returns the number of
    /// incomplete poll blocks.
    fn assign_poll_ids(&mut self) -> usize {
        let mut skipped = 0;
        for poll in self.document.polls_mut() {
            if is_complete(poll) {
                poll.poll_id.get_or_insert_with(PollId::new);
            } else {
                skipped += 1;
            }
        }
        skipped
    }

    /// Split the document's polls into those the store already matches and
    /// those that need an upsert. Reads only.
    async fn plan_polls(&self, document: &Document) -> Result<PollPlan, SessionError> {
        let mut unchanged = Vec::new();
        let mut changed = Vec::new();

        for block in document.iter() {
            let BlockData::Poll(poll) = block.data() else {
                continue;
            };
            let Some(id) = poll.poll_id.as_ref().filter(|_| is_complete(poll)) else {
                continue;
            };
            validate_shape(id, &poll.question, &poll.options)?;
            match self.polls.find(id).await? {
                Some(p) if p.same_shape(poll.question.trim(), &poll.options) => {
                    unchanged.push(id.clone())
                }
                _ => changed.push((id.clone(), poll.question.clone(), poll.options.clone())),
            }
        }
        Ok((unchanged, changed))
    }

    /// Drop staged images and return to the last saved version.
    #[tracing::instrument(skip(self), fields(document_id = %self.document_id), name = "session.cancel")]
    pub fn cancel(&mut self) {
        self.stager.discard_all();
        self.document = self.saved.clone();
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("document_id", &self.document_id)
            .field("blocks", &self.document.len())
            .field("stager", &self.stager)
            .finish_non_exhaustive()
    }
}
