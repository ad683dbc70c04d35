//! Block model types for blockpress.
//!
//! This crate is the foundation: typed IDs, the closed set of content block
//! variants, the block factory, documents, and poll value types. It has **no
//! internal blockpress dependencies** and does no I/O.
//!
//! # Overview
//!
//! ```text
//! Document  ← ordered Vec<Block>, serialized as a JSON array
//!     └── Block (BlockId + BlockData)
//!             └── BlockData::{Text, Image, Table, Poll, …}  ← one payload per kind
//!
//! Poll (PollId)  ← counts for a poll block, stored outside the document
//!     └── PollOption { id, text, votes }
//!     └── VoteRecord keyed by (PollId, fingerprint)
//! ```
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`Block`]         | Stable id + typed payload                    |
//! | [`BlockKind`]     | Closed set of block types (wire tags)        |
//! | [`BlockData`]     | Tagged payload union                         |
//! | [`Document`]      | Ordered blocks, edit operations              |
//! | [`Poll`]          | Poll with counts (total checked on build)    |
//! | [`VoteRecord`]    | One vote, unique per (poll, fingerprint)     |
//! |-------------------|----------------------------------------------|

pub mod block;
pub mod document;
pub mod error;
pub mod factory;
pub mod ids;
pub mod poll;

// Re-export primary types at crate root for convenience.
pub use block::{Block, BlockData, BlockKind, Tone};
pub use document::Document;
pub use error::{BlockError, ErrorKind};
pub use factory::{create, create_from_tag};
pub use ids::{BlockId, OptionId, PollId};
pub use poll::{Poll, PollChoice, PollOption, PollShapeError, VoteRecord};

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
