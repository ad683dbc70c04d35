//! Document: an ordered list of blocks.
//!
//! Order is render order. Editing operations keep every block's id stable and
//! refuse to introduce a second block with an existing id.

use serde::{Deserialize, Deserializer, Serialize};

use crate::block::{Block, BlockData, BlockKind};
use crate::error::BlockError;
use crate::ids::BlockId;

/// One piece of content (e.g. a blog post body). Serializes as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document {
    blocks: Vec<Block>,
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let blocks = Vec::<Block>::deserialize(deserializer)?;
        Document::from_blocks(blocks).map_err(serde::de::Error::custom)
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from blocks, rejecting duplicate ids.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, BlockError> {
        let mut doc = Self::new();
        for block in blocks {
            doc.push(block)?;
        }
        Ok(doc)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.position(id).is_some()
    }

    /// Index of a block in render order.
    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id() == id)
    }

    /// Append a block at the end.
    pub fn push(&mut self, block: Block) -> Result<(), BlockError> {
        let len = self.blocks.len();
        self.insert(len, block)
    }

    /// Insert a block at `index` (0..=len).
    pub fn insert(&mut self, index: usize, block: Block) -> Result<(), BlockError> {
        if index > self.blocks.len() {
            return Err(BlockError::PositionOutOfBounds {
                index,
                len: self.blocks.len(),
            });
        }
        if self.contains(block.id()) {
            return Err(BlockError::DuplicateBlock(block.id().clone()));
        }
        self.blocks.insert(index, block);
        Ok(())
    }

    /// Insert a block directly after `after`.
    pub fn insert_after(&mut self, after: &BlockId, block: Block) -> Result<(), BlockError> {
        let pos = self
            .position(after)
            .ok_or_else(|| BlockError::BlockNotFound(after.clone()))?;
        self.insert(pos + 1, block)
    }

    /// Remove a block, returning it.
    pub fn remove(&mut self, id: &BlockId) -> Result<Block, BlockError> {
        let pos = self
            .position(id)
            .ok_or_else(|| BlockError::BlockNotFound(id.clone()))?;
        Ok(self.blocks.remove(pos))
    }

    /// Move a block so it ends up at `to_index` (0..len).
    pub fn move_block(&mut self, id: &BlockId, to_index: usize) -> Result<(), BlockError> {
        let from = self
            .position(id)
            .ok_or_else(|| BlockError::BlockNotFound(id.clone()))?;
        if to_index >= self.blocks.len() {
            return Err(BlockError::PositionOutOfBounds {
                index: to_index,
                len: self.blocks.len(),
            });
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to_index, block);
        Ok(())
    }

    /// Change a block's kind in place; the payload is rebuilt from defaults.
    pub fn change_kind(&mut self, id: &BlockId, kind: BlockKind) -> Result<(), BlockError> {
        let block = self
            .get_mut(id)
            .ok_or_else(|| BlockError::BlockNotFound(id.clone()))?;
        block.change_kind(kind);
        Ok(())
    }

    /// Rebuild every block with its strings passed through `f`.
    ///
    /// Returns a new document; `self` is untouched.
    pub fn map_strings(
        &self,
        mut f: impl FnMut(&str) -> Option<String>,
    ) -> Result<Document, BlockError> {
        let blocks = self
            .blocks
            .iter()
            .map(|b| b.map_strings(&mut f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Document { blocks })
    }

    /// Visit every string in every block payload.
    pub fn for_each_string(&self, mut f: impl FnMut(&str)) -> Result<(), BlockError> {
        for block in &self.blocks {
            block.for_each_string(&mut f)?;
        }
        Ok(())
    }

    /// Blocks this build does not understand.
    pub fn unrecognized(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.data().is_unrecognized())
    }

    /// Poll blocks, mutably (used to assign poll ids on save).
    pub fn polls_mut(&mut self) -> impl Iterator<Item = &mut crate::block::PollData> {
        self.blocks.iter_mut().filter_map(|b| match b.data_mut() {
            BlockData::Poll(p) => Some(p),
            _ => None,
        })
    }

    /// Compare ids, order, and payloads.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.blocks.len() == other.blocks.len()
            && self
                .blocks
                .iter()
                .zip(&other.blocks)
                .all(|(a, b)| a.content_eq(b))
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::TextData;
    use crate::factory::create;
    use serde_json::json;

    fn text(s: &str) -> Block {
        Block::new(TextData { content: s.into() })
    }

    fn ids(doc: &Document) -> Vec<BlockId> {
        doc.iter().map(|b| b.id().clone()).collect()
    }

    #[test]
    fn test_insert_remove_reorder_keep_ids() {
        let mut doc = Document::new();
        let a = text("a");
        let b = text("b");
        let c = text("c");
        let (ia, ib, ic) = (a.id().clone(), b.id().clone(), c.id().clone());

        doc.push(a).unwrap();
        doc.push(c).unwrap();
        doc.insert_after(&ia, b).unwrap();
        assert_eq!(ids(&doc), vec![ia.clone(), ib.clone(), ic.clone()]);

        doc.move_block(&ic, 0).unwrap();
        assert_eq!(ids(&doc), vec![ic.clone(), ia.clone(), ib.clone()]);

        let removed = doc.remove(&ia).unwrap();
        assert_eq!(removed.id(), &ia);
        assert_eq!(ids(&doc), vec![ic, ib]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut doc = Document::new();
        let a = text("a");
        let dup = Block::from_parts(a.id().clone(), BlockData::default_for(BlockKind::Divider));
        doc.push(a).unwrap();
        assert!(matches!(doc.push(dup), Err(BlockError::DuplicateBlock(_))));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.insert(1, text("x")),
            Err(BlockError::PositionOutOfBounds { index: 1, len: 0 })
        ));
        let a = text("a");
        let ia = a.id().clone();
        doc.push(a).unwrap();
        assert!(doc.move_block(&ia, 1).is_err());
        assert!(matches!(
            doc.remove(&BlockId::from("missing")),
            Err(BlockError::BlockNotFound(_))
        ));
    }

    #[test]
    fn test_change_kind_in_document() {
        let mut doc = Document::new();
        let a = text("a");
        let ia = a.id().clone();
        doc.push(a).unwrap();
        doc.change_kind(&ia, BlockKind::Faq).unwrap();
        assert_eq!(doc.get(&ia).unwrap().kind(), Some(BlockKind::Faq));
    }

    #[test]
    fn test_serializes_as_array_and_back() {
        let json = json!([
            { "id": "1", "type": "heading", "data": { "level": 1, "text": "Title" } },
            { "id": "2", "type": "text", "data": { "content": "Body" } },
            { "id": "3", "type": "sparkle-wall", "data": { "density": 9 } }
        ]);
        let doc: Document = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.unrecognized().count(), 1);
        assert_eq!(serde_json::to_value(&doc).unwrap(), json);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_ids() {
        let json = json!([
            { "id": "1", "type": "divider" },
            { "id": "1", "type": "divider" }
        ]);
        assert!(serde_json::from_value::<Document>(json).is_err());
    }

    #[test]
    fn test_map_strings_leaves_original_untouched() {
        let doc = Document::from_blocks(vec![text("old"), create(BlockKind::Divider)]).unwrap();
        let mapped = doc.map_strings(|s| (s == "old").then(|| "new".to_string())).unwrap();
        assert!(!doc.content_eq(&mapped));
        assert_eq!(ids(&doc), ids(&mapped));
        match doc.blocks()[0].data() {
            BlockData::Text(t) => assert_eq!(t.content, "old"),
            other => panic!("unexpected payload {other:?}"),
        }
        match mapped.blocks()[0].data() {
            BlockData::Text(t) => assert_eq!(t.content, "new"),
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
