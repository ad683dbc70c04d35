//! Block factory: fresh blocks with default payloads.
//!
//! Ids are unique (UUIDv7) but not deterministic; payload defaults are
//! identical on every call for the same kind.

use crate::block::{Block, BlockData, BlockKind};
use crate::error::BlockError;

/// Create a block of `kind` with a fresh id and that kind's default payload.
pub fn create(kind: BlockKind) -> Block {
    Block::new(BlockData::default_for(kind))
}

/// Create a block from a wire tag such as `"file-download"`.
///
/// An unknown tag is a caller bug and is rejected with
/// [`BlockError::UnknownBlockType`] rather than producing a fallback block.
pub fn create_from_tag(tag: &str) -> Result<Block, BlockError> {
    BlockKind::from_str(tag)
        .map(create)
        .ok_or_else(|| BlockError::UnknownBlockType(tag.to_string()))
}
