//! Block renderer for blockpress.
//!
//! [`render`] is a pure function from a [`Document`] to a [`RenderTree`]:
//! one typed node per block, in document order, with no I/O and no styling.
//! The presentation layer turns nodes into markup.
//!
//! ```text
//! Document ──► Outline::build (anchors, TOC)
//!          └─► per block: render_block ──► RenderNode
//!                 text fields → parse_inlines (markdown + icons)
//!                 plain fields → resolve_icons
//!                 unknown type → Fallback + warn!
//! ```

pub mod embed;
pub mod icons;
pub mod inline;
pub mod markdown;
pub mod outline;
pub mod tree;

pub use icons::{icon_glyph, resolve_icons};
pub use inline::{Inline, RichSpan};
pub use markdown::parse_inlines;
pub use outline::{Outline, slugify};
pub use tree::{RenderNode, RenderTree, RenderedBlock, TocEntry, VideoEmbed};

use blockpress_types::{Block, BlockData, Document};

use crate::tree::{ComparisonColumn, ComparisonLine, FaqEntry, StatEntry, TimelineEntry};

/// Render a whole document.
pub fn render(doc: &Document) -> RenderTree {
    let outline = Outline::build(doc);
    let nodes = doc
        .iter()
        .map(|block| RenderedBlock {
            block_id: block.id().clone(),
            node: render_block(block, &outline),
        })
        .collect();
    RenderTree { nodes }
}

fn markdown_opt(text: &Option<String>) -> Option<Vec<Inline>> {
    text.as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(parse_inlines)
}

fn plain_opt(text: &Option<String>) -> Option<Vec<Inline>> {
    text.as_deref()
        .filter(|t| !t.is_empty())
        .map(resolve_icons)
}

fn render_block(block: &Block, outline: &Outline) -> RenderNode {
    match block.data() {
        BlockData::Text(d) => RenderNode::Text {
            content: parse_inlines(&d.content),
        },
        BlockData::Heading(d) => RenderNode::Heading {
            level: outline::clamp_level(d.level),
            anchor: outline
                .anchor_for(block.id())
                .map(str::to_string)
                .unwrap_or_else(|| slugify(&d.text)),
            text: resolve_icons(&d.text),
        },
        BlockData::Image(d) => RenderNode::Image {
            src: d.src.clone(),
            alt: d.alt.clone(),
            caption: markdown_opt(&d.caption),
            link: d.link.clone().filter(|l| !l.is_empty()),
        },
        BlockData::Button(d) => RenderNode::Button {
            label: resolve_icons(&d.label),
            url: d.url.clone(),
            style: d.style,
            open_in_new_tab: d.open_in_new_tab,
        },
        BlockData::Callout(d) => RenderNode::Callout {
            tone: d.tone,
            title: plain_opt(&d.title),
            content: parse_inlines(&d.content),
        },
        BlockData::Quote(d) => RenderNode::Quote {
            text: parse_inlines(&d.text),
            attribution: d.attribution.clone().filter(|a| !a.is_empty()),
        },
        BlockData::Code(d) => RenderNode::Code {
            language: d.language.clone().filter(|l| !l.is_empty()),
            code: d.code.clone(),
        },
        BlockData::Divider(_) => RenderNode::Divider,
        BlockData::Video(d) => RenderNode::Video {
            embed: embed::video_embed(&d.url),
            caption: markdown_opt(&d.caption),
        },
        BlockData::Table(d) => {
            let width = d.headers.len();
            RenderNode::Table {
                headers: d.headers.iter().map(|h| resolve_icons(h)).collect(),
                rows: d
                    .rows
                    .iter()
                    .map(|row| {
                        let mut cells: Vec<_> = row.iter().map(|c| parse_inlines(c)).collect();
                        if cells.len() < width {
                            cells.resize(width, Vec::new());
                        }
                        cells
                    })
                    .collect(),
                caption: markdown_opt(&d.caption),
            }
        }
        BlockData::Timeline(d) => RenderNode::Timeline {
            items: d
                .items
                .iter()
                .map(|item| TimelineEntry {
                    date: item.date.clone(),
                    title: resolve_icons(&item.title),
                    description: parse_inlines(&item.description),
                })
                .collect(),
        },
        BlockData::Stats(d) => RenderNode::Stats {
            items: d
                .items
                .iter()
                .map(|item| StatEntry {
                    value: item.value.clone(),
                    label: resolve_icons(&item.label),
                    description: markdown_opt(&item.description),
                })
                .collect(),
        },
        BlockData::Comparison(d) => {
            let columns: Vec<_> = d
                .columns
                .iter()
                .enumerate()
                .map(|(i, name)| ComparisonColumn {
                    name: name.clone(),
                    highlighted: d.highlight_column == Some(i),
                })
                .collect();
            let rows = d
                .rows
                .iter()
                .map(|row| {
                    let mut cells: Vec<_> = row
                        .values
                        .iter()
                        .take(columns.len())
                        .map(|v| resolve_icons(v))
                        .collect();
                    cells.resize(columns.len(), Vec::new());
                    ComparisonLine {
                        feature: resolve_icons(&row.feature),
                        cells,
                    }
                })
                .collect();
            RenderNode::Comparison {
                title: plain_opt(&d.title),
                columns,
                rows,
            }
        }
        BlockData::Faq(d) => RenderNode::Faq {
            title: plain_opt(&d.title),
            items: d
                .items
                .iter()
                .map(|item| FaqEntry {
                    question: resolve_icons(&item.question),
                    answer: parse_inlines(&item.answer),
                })
                .collect(),
        },
        BlockData::FileDownload(d) => {
            let file_name = if d.file_name.is_empty() {
                d.url
                    .rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty())
                    .unwrap_or("download")
                    .to_string()
            } else {
                d.file_name.clone()
            };
            RenderNode::FileDownload {
                url: d.url.clone(),
                file_name,
                size_label: d.size_bytes.map(embed::size_label),
                description: markdown_opt(&d.description),
            }
        }
        BlockData::BlogCard(d) => RenderNode::BlogCard {
            post_slug: d.post_slug.clone(),
        },
        BlockData::BlogsGrid(d) => RenderNode::BlogsGrid {
            title: plain_opt(&d.title),
            post_slugs: d.post_slugs.clone(),
            columns: d.columns.clamp(1, 4),
        },
        BlockData::Poll(d) => RenderNode::Poll {
            poll_id: d.poll_id.clone(),
            question: resolve_icons(&d.question),
            options: d.options.clone(),
        },
        BlockData::RedditPost(d) => RenderNode::RedditPost {
            url: d.url.clone(),
            title: d.title.clone().filter(|t| !t.is_empty()),
            subreddit: d
                .subreddit
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| embed::subreddit_from_url(&d.url)),
        },
        BlockData::TableOfContents(d) => RenderNode::TableOfContents {
            title: d.title.clone(),
            entries: outline.toc(d.max_level),
        },
        BlockData::Newsletter(d) => RenderNode::Newsletter {
            title: resolve_icons(&d.title),
            description: parse_inlines(&d.description),
            button_label: d.button_label.clone(),
            placeholder: d.placeholder.clone(),
        },
        BlockData::Math(d) => RenderNode::Math {
            expression: d.expression.clone(),
            display: d.display,
        },
        BlockData::Diagram(d) => RenderNode::Diagram {
            syntax: d.syntax,
            source: d.source.clone(),
            caption: markdown_opt(&d.caption),
        },
        BlockData::Gist(d) => RenderNode::Gist {
            url: d.url.clone(),
            gist_id: embed::gist_id(&d.url),
            file: d.file.clone().filter(|f| !f.is_empty()),
        },
        BlockData::Notification(d) => RenderNode::Notification {
            tone: d.tone,
            message: parse_inlines(&d.message),
            dismissible: d.dismissible,
        },
        BlockData::Unrecognized { kind, .. } => {
            tracing::warn!(
                block = %block.id(),
                kind = %kind,
                "no renderer for block type, emitting fallback"
            );
            RenderNode::Fallback {
                type_tag: kind.clone(),
            }
        }
    }
}
