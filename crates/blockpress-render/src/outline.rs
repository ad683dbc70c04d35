//! Heading anchors and the document outline.
//!
//! Anchors are computed once per render, before any node is built, so the
//! table-of-contents node can point at headings that come after it.

use std::collections::HashMap;

use blockpress_types::{BlockData, BlockId, Document};

use crate::icons::strip_icons;
use crate::tree::TocEntry;

/// Lowercase ASCII slug: alphanumerics kept, every other run becomes one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in strip_icons(text).chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

/// One heading in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineEntry {
    pub block_id: BlockId,
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

/// All headings of a document with unique anchors.
#[derive(Clone, Debug, Default)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
    by_block: HashMap<BlockId, usize>,
}

impl Outline {
    pub fn build(doc: &Document) -> Self {
        let mut outline = Outline::default();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for block in doc {
            let BlockData::Heading(h) = block.data() else {
                continue;
            };
            let base = slugify(&h.text);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let anchor = if *count == 1 {
                base
            } else {
                format!("{base}-{count}")
            };
            outline.by_block.insert(block.id().clone(), outline.entries.len());
            outline.entries.push(OutlineEntry {
                block_id: block.id().clone(),
                level: clamp_level(h.level),
                text: strip_icons(&h.text).trim().to_string(),
                anchor,
            });
        }
        outline
    }

    pub fn anchor_for(&self, id: &BlockId) -> Option<&str> {
        self.by_block
            .get(id)
            .map(|&i| self.entries[i].anchor.as_str())
    }

    /// Table-of-contents lines down to `max_level` (inclusive).
    pub fn toc(&self, max_level: u8) -> Vec<TocEntry> {
        let max_level = clamp_level(max_level);
        self.entries
            .iter()
            .filter(|e| e.level <= max_level)
            .map(|e| TocEntry {
                level: e.level,
                text: e.text.clone(),
                anchor: e.anchor.clone(),
            })
            .collect()
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }
}

/// Heading levels outside 1..=6 are clamped.
pub fn clamp_level(level: u8) -> u8 {
    level.clamp(1, 6)
}
