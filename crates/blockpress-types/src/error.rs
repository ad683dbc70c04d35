//! Error types for block and document operations.

use thiserror::Error;

use crate::ids::BlockId;

/// Coarse classification shared by every blockpress error type.
///
/// Clients branch on this instead of matching each variant: a conflict is
/// shown as "you already voted", a not-found may mean "create new".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input, rejected before anything was changed.
    Validation,
    /// The request collides with existing state (duplicate vote).
    Conflict,
    NotFound,
    /// Persistence or upload failure.
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not found",
            ErrorKind::Storage => "storage",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while building or editing a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// The requested block type is not part of the closed set.
    #[error("unknown block type '{0}'")]
    UnknownBlockType(String),

    /// Block not found in document.
    #[error("block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Duplicate block ID.
    #[error("block already exists: {0:?}")]
    DuplicateBlock(BlockId),

    /// Insert or move position out of bounds.
    #[error("position {index} out of bounds for document with {len} blocks")]
    PositionOutOfBounds { index: usize, len: usize },

    /// Payload could not be converted.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl BlockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockError::BlockNotFound(_) => ErrorKind::NotFound,
            BlockError::DuplicateBlock(_) => ErrorKind::Conflict,
            BlockError::UnknownBlockType(_)
            | BlockError::PositionOutOfBounds { .. }
            | BlockError::Serialization(_) => ErrorKind::Validation,
        }
    }
}

impl From<serde_json::Error> for BlockError {
    fn from(e: serde_json::Error) -> Self {
        BlockError::Serialization(e.to_string())
    }
}
