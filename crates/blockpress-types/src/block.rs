//! Block types: the closed set of content variants and their payloads.
//!
//! ## Design: one tag, one payload
//!
//! [`BlockData`] is a tagged union. Each variant carries exactly one payload
//! struct, so a block's `type` and `data` can never disagree: changing the
//! type means building a fresh payload with that variant's defaults
//! ([`Block::change_kind`]).
//!
//! Every variant is declared once, in the `block_variants!` invocation below.
//! The macro generates [`BlockKind`], [`BlockData`], and the dispatch between
//! them, so adding a variant is a single-point change that the compiler then
//! checks in every exhaustive `match` (renderer, editors, tests).
//!
//! ## Wire format
//!
//! ```text
//! { "id": "0190f3…", "type": "callout", "data": { "tone": "warning", … } }
//! ```
//!
//! Payload fields are camelCase and all optional on input; missing fields take
//! the variant defaults. A block whose `type` is unknown to this build (or whose
//! payload does not fit its type) loads as [`BlockData::Unrecognized`] with the
//! raw JSON preserved, so older and newer documents round-trip untouched.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use strum::{EnumIter, EnumString};

use crate::ids::{BlockId, PollId};
use crate::poll::PollChoice;

// ============================================================================
// Payload enums
// ============================================================================

/// Visual tone shared by callouts and notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Info,
    Success,
    Warning,
    Danger,
    Tip,
}

/// Button emphasis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Outline,
    Link,
}

/// Source language of a diagram block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramSyntax {
    #[default]
    Mermaid,
    Graphviz,
}

// ============================================================================
// Payload structs
// ============================================================================

/// Markdown body text. May embed `[icon:name]` tokens and inline images.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextData {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadingData {
    /// 1..=6. Out-of-range values are clamped at render time.
    pub level: u8,
    pub text: String,
}

impl Default for HeadingData {
    fn default() -> Self {
        Self {
            level: 2,
            text: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageData {
    /// Display source: a permanent URL, or a staged data URI while editing.
    pub src: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Optional click-through target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ButtonData {
    pub label: String,
    pub url: String,
    pub style: ButtonStyle,
    pub open_in_new_tab: bool,
}

impl Default for ButtonData {
    fn default() -> Self {
        Self {
            label: "Learn more".to_string(),
            url: String::new(),
            style: ButtonStyle::Primary,
            open_in_new_tab: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalloutData {
    pub tone: Tone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Markdown.
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteData {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividerData {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoData {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// A table. Starts with a minimal two-column header row and no body rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Default for TableData {
    fn default() -> Self {
        Self {
            headers: vec!["Column 1".to_string(), "Column 2".to_string()],
            rows: Vec::new(),
            caption: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineItem {
    pub date: String,
    pub title: String,
    /// Markdown.
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineData {
    pub items: Vec<TimelineItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatItem {
    /// Display value, kept as text ("12k", "99.9%").
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsData {
    pub items: Vec<StatItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparisonRow {
    pub feature: String,
    /// One cell per column. May contain `[icon:name]` tokens.
    pub values: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparisonData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<ComparisonRow>,
    /// Column index to emphasise (e.g. the recommended tool).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_column: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaqItem {
    pub question: String,
    /// Markdown.
    pub answer: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaqData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<FaqItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileDownloadData {
    pub url: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Reference to another post, rendered as a card by the consumer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlogCardData {
    pub post_slug: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlogsGridData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub post_slugs: Vec<String>,
    pub columns: u8,
}

impl Default for BlogsGridData {
    fn default() -> Self {
        Self {
            title: None,
            post_slugs: Vec::new(),
            columns: 3,
        }
    }
}

/// A poll as authored in the editor. Vote counts live in the poll store,
/// keyed by `poll_id`, which is assigned on first save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_id: Option<PollId>,
    pub question: String,
    pub options: Vec<PollChoice>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedditPostData {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableOfContentsData {
    pub title: String,
    /// Deepest heading level listed (inclusive).
    pub max_level: u8,
}

impl Default for TableOfContentsData {
    fn default() -> Self {
        Self {
            title: "Table of Contents".to_string(),
            max_level: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsletterData {
    pub title: String,
    pub description: String,
    pub button_label: String,
    pub placeholder: String,
}

impl Default for NewsletterData {
    fn default() -> Self {
        Self {
            title: "Subscribe to our newsletter".to_string(),
            description: String::new(),
            button_label: "Subscribe".to_string(),
            placeholder: "you@example.com".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MathData {
    /// TeX source.
    pub expression: String,
    /// Block (display) math vs inline.
    pub display: bool,
}

impl Default for MathData {
    fn default() -> Self {
        Self {
            expression: String::new(),
            display: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramData {
    pub syntax: DiagramSyntax,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GistData {
    pub url: String,
    /// Show a single file from a multi-file gist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationData {
    pub tone: Tone,
    pub message: String,
    pub dismissible: bool,
}

impl Default for NotificationData {
    fn default() -> Self {
        Self {
            tone: Tone::Info,
            message: String::new(),
            dismissible: true,
        }
    }
}

// ============================================================================
// BlockKind + BlockData
// ============================================================================

macro_rules! block_variants {
    ($( $(#[$doc:meta])* $variant:ident($payload:ident) => $tag:literal, )+) => {
        /// What a block *is*. Closed set; the wire tag is kebab-case.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter)]
        pub enum BlockKind {
            $(
                $(#[$doc])*
                #[serde(rename = $tag)]
                #[strum(serialize = $tag)]
                $variant,
            )+
        }

        impl BlockKind {
            /// Wire tag for this kind.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(BlockKind::$variant => $tag,)+
                }
            }
        }

        /// Variant-specific payload. The variant *is* the block type.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum BlockData {
            $($variant($payload),)+
            /// A block this build does not understand. Kept verbatim so it
            /// survives a load/save cycle; renders as a fallback node.
            Unrecognized {
                kind: String,
                data: Value,
            },
        }

        impl BlockData {
            /// Fresh default payload for `kind`.
            pub fn default_for(kind: BlockKind) -> Self {
                match kind {
                    $(BlockKind::$variant => BlockData::$variant($payload::default()),)+
                }
            }

            /// The kind, or `None` for unrecognized blocks.
            pub fn kind(&self) -> Option<BlockKind> {
                match self {
                    $(BlockData::$variant(_) => Some(BlockKind::$variant),)+
                    BlockData::Unrecognized { .. } => None,
                }
            }

            /// Wire tag, including the original tag of unrecognized blocks.
            pub fn type_tag(&self) -> &str {
                match self {
                    $(BlockData::$variant(_) => $tag,)+
                    BlockData::Unrecognized { kind, .. } => kind,
                }
            }

            /// Serialize just the payload (the `data` field on the wire).
            pub fn payload_value(&self) -> Result<Value, serde_json::Error> {
                match self {
                    $(BlockData::$variant(p) => serde_json::to_value(p),)+
                    BlockData::Unrecognized { data, .. } => Ok(data.clone()),
                }
            }

            /// Rebuild a typed payload from a wire tag and raw payload.
            ///
            /// Unknown tags become [`BlockData::Unrecognized`]; a known tag with
            /// a payload that does not fit is an error.
            pub fn from_tagged(tag: &str, data: Value) -> Result<Self, serde_json::Error> {
                let data = match data {
                    Value::Null => Value::Object(Default::default()),
                    other => other,
                };
                match tag {
                    $($tag => serde_json::from_value(data).map(BlockData::$variant),)+
                    _ => Ok(BlockData::Unrecognized {
                        kind: tag.to_string(),
                        data,
                    }),
                }
            }
        }

        $(
            impl From<$payload> for BlockData {
                fn from(p: $payload) -> Self {
                    BlockData::$variant(p)
                }
            }
        )+
    };
}

block_variants! {
    /// Markdown paragraph(s).
    Text(TextData) => "text",
    /// Section heading; feeds the table of contents.
    Heading(HeadingData) => "heading",
    Image(ImageData) => "image",
    /// Call-to-action link styled as a button.
    Button(ButtonData) => "button",
    Callout(CalloutData) => "callout",
    Quote(QuoteData) => "quote",
    Code(CodeData) => "code",
    Divider(DividerData) => "divider",
    Video(VideoData) => "video",
    Table(TableData) => "table",
    Timeline(TimelineData) => "timeline",
    Stats(StatsData) => "stats",
    /// Feature matrix across tools.
    Comparison(ComparisonData) => "comparison",
    Faq(FaqData) => "faq",
    FileDownload(FileDownloadData) => "file-download",
    BlogCard(BlogCardData) => "blog-card",
    BlogsGrid(BlogsGridData) => "blogs-grid",
    /// Visitor poll; counts live in the poll store.
    Poll(PollData) => "poll",
    RedditPost(RedditPostData) => "reddit-post",
    TableOfContents(TableOfContentsData) => "table-of-contents",
    Newsletter(NewsletterData) => "newsletter",
    Math(MathData) => "math",
    Diagram(DiagramData) => "diagram",
    Gist(GistData) => "gist",
    Notification(NotificationData) => "notification",
}

impl BlockKind {
    /// Parse a wire tag. Tags match exactly, as they do when loading blocks.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as std::str::FromStr>::from_str(s).ok()
    }

    /// Iterate every kind in declaration order.
    pub fn all() -> impl Iterator<Item = BlockKind> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl BlockData {
    /// Check if this payload is a block this build does not understand.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, BlockData::Unrecognized { .. })
    }
}

// ============================================================================
// Block
// ============================================================================

/// One unit of content: a stable id plus a typed payload.
///
/// Identity is the id: two blocks with identical payloads but different ids
/// are different blocks, and `==` compares ids only. Use [`Block::content_eq`]
/// to compare payloads as well.
#[derive(Clone, Debug)]
pub struct Block {
    id: BlockId,
    data: BlockData,
}

impl Block {
    /// Wrap a payload in a block with a freshly minted id.
    pub fn new(data: impl Into<BlockData>) -> Self {
        Self {
            id: BlockId::new(),
            data: data.into(),
        }
    }

    /// Rebuild a block from stored parts (keeps the stored id).
    pub fn from_parts(id: BlockId, data: BlockData) -> Self {
        Self { id, data }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    /// The block's kind, or `None` for unrecognized blocks.
    pub fn kind(&self) -> Option<BlockKind> {
        self.data.kind()
    }

    pub fn type_tag(&self) -> &str {
        self.data.type_tag()
    }

    pub fn data(&self) -> &BlockData {
        &self.data
    }

    /// Mutable access to the payload. Replacing the whole `BlockData` is the
    /// only way to change variant; fields of one variant cannot leak into another.
    pub fn data_mut(&mut self) -> &mut BlockData {
        &mut self.data
    }

    pub fn into_data(self) -> BlockData {
        self.data
    }

    /// Switch to another kind, discarding the old payload for `kind`'s defaults.
    /// The id is preserved. Switching to the current kind is a no-op.
    pub fn change_kind(&mut self, kind: BlockKind) {
        if self.kind() != Some(kind) {
            self.data = BlockData::default_for(kind);
        }
    }

    /// Compare id and payload.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.id == other.id && self.data == other.data
    }

    /// Visit every string in the payload (field values, list entries).
    pub fn for_each_string(&self, mut f: impl FnMut(&str)) -> Result<(), serde_json::Error> {
        let value = self.data.payload_value()?;
        walk_strings(&value, &mut f);
        Ok(())
    }

    /// Rebuild the payload with every string passed through `f`.
    ///
    /// `f` returns `Some(new)` to replace a string and `None` to keep it.
    /// The variant is preserved; the result is re-validated against it.
    pub fn map_strings(
        &self,
        mut f: impl FnMut(&str) -> Option<String>,
    ) -> Result<Block, serde_json::Error> {
        let mut value = self.data.payload_value()?;
        let changed = rewrite_strings(&mut value, &mut f);
        if !changed {
            return Ok(self.clone());
        }
        let data = match &self.data {
            BlockData::Unrecognized { kind, .. } => BlockData::Unrecognized {
                kind: kind.clone(),
                data: value,
            },
            known => BlockData::from_tagged(known.type_tag(), value)?,
        };
        Ok(Block {
            id: self.id.clone(),
            data,
        })
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Block {}

impl std::hash::Hash for Block {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn walk_strings(value: &Value, f: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|v| walk_strings(v, f)),
        Value::Object(map) => map.values().for_each(|v| walk_strings(v, f)),
        _ => {}
    }
}

fn rewrite_strings(value: &mut Value, f: &mut impl FnMut(&str) -> Option<String>) -> bool {
    match value {
        Value::String(s) => match f(s) {
            Some(new) => {
                *s = new;
                true
            }
            None => false,
        },
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |acc, v| rewrite_strings(v, f) | acc),
        Value::Object(map) => map
            .values_mut()
            .fold(false, |acc, v| rewrite_strings(v, f) | acc),
        _ => false,
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = self
            .data
            .payload_value()
            .map_err(serde::ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("type", self.data.type_tag())?;
        map.serialize_entry("data", &payload)?;
        map.end()
    }
}

/// Raw wire shape, before the payload is checked against its tag.
#[derive(Deserialize)]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBlock::deserialize(deserializer)?;
        if raw.id.is_empty() {
            return Err(D::Error::custom("block id must not be empty"));
        }
        let data = match BlockData::from_tagged(&raw.kind, raw.data.clone()) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    block = %raw.id,
                    kind = %raw.kind,
                    "payload does not match block type, keeping as unrecognized: {}",
                    e
                );
                BlockData::Unrecognized {
                    kind: raw.kind,
                    data: raw.data,
                }
            }
        };
        Ok(Block { id: raw.id, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── BlockKind ───────────────────────────────────────────────────────

    #[test]
    fn test_block_kind_parsing() {
        assert_eq!(BlockKind::from_str("text"), Some(BlockKind::Text));
        assert_eq!(BlockKind::from_str("faq"), Some(BlockKind::Faq));
        assert_eq!(BlockKind::from_str("FAQ"), None);
        assert_eq!(BlockKind::from_str("file-download"), Some(BlockKind::FileDownload));
        assert_eq!(
            BlockKind::from_str("table-of-contents"),
            Some(BlockKind::TableOfContents)
        );
        assert_eq!(BlockKind::from_str("carousel"), None);
    }

    #[test]
    fn test_block_kind_as_str_roundtrips_for_all() {
        for kind in BlockKind::all() {
            assert_eq!(BlockKind::from_str(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_default_payload_matches_kind_for_all() {
        for kind in BlockKind::all() {
            let data = BlockData::default_for(kind);
            assert_eq!(data.kind(), Some(kind));
            assert_eq!(data.type_tag(), kind.as_str());
        }
    }

    // ── Block identity ──────────────────────────────────────────────────

    #[test]
    fn test_equality_is_by_id() {
        let a = Block::new(TextData { content: "same".into() });
        let b = Block::new(TextData { content: "same".into() });
        assert_ne!(a, b);

        let mut a2 = a.clone();
        *a2.data_mut() = BlockData::Text(TextData { content: "changed".into() });
        assert_eq!(a, a2);
        assert!(!a.content_eq(&a2));
    }

    #[test]
    fn test_change_kind_resets_payload_keeps_id() {
        let mut block = Block::new(TextData { content: "hello".into() });
        let id = block.id().clone();

        block.change_kind(BlockKind::Table);
        assert_eq!(block.id(), &id);
        assert_eq!(block.data(), &BlockData::Table(TableData::default()));

        // Same kind is a no-op
        if let BlockData::Table(t) = block.data_mut() {
            t.caption = Some("kept".into());
        }
        block.change_kind(BlockKind::Table);
        match block.data() {
            BlockData::Table(t) => assert_eq!(t.caption.as_deref(), Some("kept")),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    // ── Wire format ─────────────────────────────────────────────────────

    #[test]
    fn test_serialize_shape() {
        let block = Block::from_parts(
            BlockId::from("b1"),
            BlockData::Callout(CalloutData {
                tone: Tone::Warning,
                title: None,
                content: "Careful".into(),
            }),
        );
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "b1",
                "type": "callout",
                "data": { "tone": "warning", "content": "Careful" }
            })
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let block: Block =
            serde_json::from_value(json!({ "id": "b1", "type": "newsletter", "data": { "title": "Hi" } }))
                .unwrap();
        match block.data() {
            BlockData::Newsletter(n) => {
                assert_eq!(n.title, "Hi");
                assert_eq!(n.button_label, "Subscribe");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_null_or_missing_data_is_default() {
        let block: Block = serde_json::from_value(json!({ "id": "b1", "type": "divider" })).unwrap();
        assert_eq!(block.kind(), Some(BlockKind::Divider));

        let block: Block =
            serde_json::from_value(json!({ "id": "b2", "type": "stats", "data": null })).unwrap();
        assert_eq!(block.data(), &BlockData::Stats(StatsData::default()));
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let raw = json!({ "id": "legacy", "type": "carousel", "data": { "slides": [1, 2] } });
        let block: Block = serde_json::from_value(raw.clone()).unwrap();
        assert!(block.data().is_unrecognized());
        assert_eq!(block.kind(), None);
        assert_eq!(block.type_tag(), "carousel");
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn test_tag_case_agrees_with_factory() {
        let raw = json!({ "id": "b1", "type": "FAQ", "data": {} });
        let block: Block = serde_json::from_value(raw).unwrap();
        assert!(block.data().is_unrecognized());
        assert!(crate::factory::create_from_tag("FAQ").is_err());

        let raw = json!({ "id": "b2", "type": "faq", "data": {} });
        let block: Block = serde_json::from_value(raw).unwrap();
        assert_eq!(block.kind(), BlockKind::from_str("faq"));
    }

    #[test]
    fn test_mismatched_payload_is_unrecognized() {
        let raw = json!({ "id": "b1", "type": "heading", "data": { "level": "big" } });
        let block: Block = serde_json::from_value(raw.clone()).unwrap();
        assert!(block.data().is_unrecognized());
        assert_eq!(block.type_tag(), "heading");
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn test_empty_id_rejected() {
        let result: Result<Block, _> =
            serde_json::from_value(json!({ "id": "", "type": "text", "data": {} }));
        assert!(result.is_err());
    }

    // ── String walking ──────────────────────────────────────────────────

    #[test]
    fn test_for_each_string_reaches_nested_fields() {
        let block = Block::new(FaqData {
            title: Some("FAQ".into()),
            items: vec![FaqItem {
                question: "Why?".into(),
                answer: "Because.".into(),
            }],
        });
        let mut seen = Vec::new();
        block.for_each_string(|s| seen.push(s.to_string())).unwrap();
        seen.sort();
        assert_eq!(seen, vec!["Because.", "FAQ", "Why?"]);
    }

    #[test]
    fn test_map_strings_preserves_variant_and_id() {
        let block = Block::new(TableData {
            headers: vec!["Tool".into(), "Price".into()],
            rows: vec![vec!["A".into(), "$5".into()]],
            caption: None,
        });
        let mapped = block
            .map_strings(|s| (s == "$5").then(|| "$6".to_string()))
            .unwrap();
        assert_eq!(mapped.id(), block.id());
        match mapped.data() {
            BlockData::Table(t) => assert_eq!(t.rows[0][1], "$6"),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_map_strings_on_unrecognized() {
        let block = Block::from_parts(
            BlockId::from("x"),
            BlockData::Unrecognized {
                kind: "carousel".into(),
                data: json!({ "slides": ["old"] }),
            },
        );
        let mapped = block.map_strings(|_| Some("new".into())).unwrap();
        assert_eq!(
            mapped.data(),
            &BlockData::Unrecognized {
                kind: "carousel".into(),
                data: json!({ "slides": ["new"] }),
            }
        );
    }
}
