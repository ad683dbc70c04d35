//! Render tree: one typed node per block, no styling decisions.
//!
//! The presentation layer owns layout, colours, and markup. Nodes carry
//! content already resolved (markdown parsed, icons substituted, embeds
//! normalised) so consumers never re-interpret raw payloads.

use serde::Serialize;

use blockpress_types::block::{ButtonStyle, DiagramSyntax};
use blockpress_types::{BlockId, PollChoice, PollId, Tone};

use crate::inline::Inline;

/// The rendered form of a whole document, in document order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RenderTree {
    pub nodes: Vec<RenderedBlock>,
}

impl RenderTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of fallback nodes (blocks this build could not render).
    pub fn fallback_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.node, RenderNode::Fallback { .. }))
            .count()
    }
}

/// A node tagged with the block it came from (for reconciliation).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedBlock {
    pub block_id: BlockId,
    pub node: RenderNode,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub date: String,
    pub title: Vec<Inline>,
    pub description: Vec<Inline>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatEntry {
    pub value: String,
    pub label: Vec<Inline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<Inline>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonColumn {
    pub name: String,
    pub highlighted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonLine {
    pub feature: Vec<Inline>,
    /// Always one cell per column; short rows are padded with empty cells.
    pub cells: Vec<Vec<Inline>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaqEntry {
    pub question: Vec<Inline>,
    pub answer: Vec<Inline>,
}

/// One table-of-contents line, pointing at a heading node's anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

/// Recognised video hosts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum VideoEmbed {
    Youtube { video_id: String, embed_url: String },
    Vimeo { video_id: String, embed_url: String },
    /// Anything else is handed to the consumer as a plain link.
    Link { url: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum RenderNode {
    Text {
        content: Vec<Inline>,
    },
    Heading {
        level: u8,
        anchor: String,
        text: Vec<Inline>,
    },
    Image {
        src: String,
        alt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<Vec<Inline>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        link: Option<String>,
    },
    Button {
        label: Vec<Inline>,
        url: String,
        style: ButtonStyle,
        open_in_new_tab: bool,
    },
    Callout {
        tone: Tone,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<Vec<Inline>>,
        content: Vec<Inline>,
    },
    Quote {
        text: Vec<Inline>,
        #[serde(skip_serializing_if = "Option::is_none")]
        attribution: Option<String>,
    },
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        code: String,
    },
    Divider,
    Video {
        embed: VideoEmbed,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<Vec<Inline>>,
    },
    Table {
        headers: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<Vec<Inline>>,
    },
    Timeline {
        items: Vec<TimelineEntry>,
    },
    Stats {
        items: Vec<StatEntry>,
    },
    Comparison {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<Vec<Inline>>,
        columns: Vec<ComparisonColumn>,
        rows: Vec<ComparisonLine>,
    },
    Faq {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<Vec<Inline>>,
        items: Vec<FaqEntry>,
    },
    FileDownload {
        url: String,
        file_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        size_label: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<Vec<Inline>>,
    },
    /// Reference only; the consumer fetches the post.
    BlogCard {
        post_slug: String,
    },
    BlogsGrid {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<Vec<Inline>>,
        post_slugs: Vec<String>,
        columns: u8,
    },
    /// Counts are fetched from the poll engine by `poll_id`.
    Poll {
        #[serde(skip_serializing_if = "Option::is_none")]
        poll_id: Option<PollId>,
        question: Vec<Inline>,
        options: Vec<PollChoice>,
    },
    RedditPost {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        subreddit: Option<String>,
    },
    TableOfContents {
        title: String,
        entries: Vec<TocEntry>,
    },
    Newsletter {
        title: Vec<Inline>,
        description: Vec<Inline>,
        button_label: String,
        placeholder: String,
    },
    Math {
        expression: String,
        display: bool,
    },
    Diagram {
        syntax: DiagramSyntax,
        source: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<Vec<Inline>>,
    },
    Gist {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        gist_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Notification {
        tone: Tone,
        message: Vec<Inline>,
        dismissible: bool,
    },
    /// A block this build does not know how to render.
    Fallback {
        type_tag: String,
    },
}
