//! Markdown → inline nodes.
//!
//! Uses pulldown-cmark to walk markdown events, tracking a style stack:
//!
//! ```text
//! "**Fast** [icon:rocket] ![shot](https://cdn/x.png)"
//!     ↓ pulldown-cmark events
//! [Text { bold, "Fast" }, Text { " " }, Icon { rocket }, Text { " " },
//!  Image { src: "https://cdn/x.png", alt: "shot" }]
//! ```
//!
//! Adjacent runs with identical style are merged before icon tokens are
//! resolved, because the parser splits text around `[` and `]`.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::icons::split_icons;
use crate::inline::{Inline, RichSpan};

/// Parse markdown text into inline nodes.
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH);
    let mut items: Vec<Inline> = Vec::new();

    // Style stack: depth counters for nested formatting
    let mut bold_depth: u32 = 0;
    let mut italic_depth: u32 = 0;
    let mut strike_depth: u32 = 0;
    let mut heading_level: Option<u8> = None;
    let mut code_block = false;
    let mut links: Vec<String> = Vec::new();
    // Image being collected: (src, alt so far)
    let mut image: Option<(String, String)> = None;
    let mut list_depth: u32 = 0;
    let mut item_index: Vec<Option<u64>> = Vec::new(); // None = unordered, Some(n) = ordered
    let mut need_item_prefix = false;

    for event in parser {
        // Alt text of an image is collected, not emitted.
        if let Some((_, alt)) = image.as_mut() {
            match &event {
                Event::Text(cow) | Event::Code(cow) => {
                    alt.push_str(cow);
                    continue;
                }
                Event::End(TagEnd::Image) => {}
                _ => continue,
            }
        }

        match event {
            // ── Block-level tags ──
            Event::Start(Tag::Heading { level, .. }) => {
                heading_level = Some(heading_level_to_u8(level));
                bold_depth += 1;
            }
            Event::End(TagEnd::Heading(_)) => {
                heading_level = None;
                bold_depth = bold_depth.saturating_sub(1);
                items.push(Inline::Break);
            }

            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => items.push(Inline::Break),

            Event::Start(Tag::CodeBlock(_)) => code_block = true,
            Event::End(TagEnd::CodeBlock) => {
                code_block = false;
                items.push(Inline::Break);
            }

            Event::Start(Tag::List(first_item)) => {
                list_depth += 1;
                item_index.push(first_item);
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                item_index.pop();
            }

            Event::Start(Tag::Item) => need_item_prefix = true,
            Event::End(TagEnd::Item) => {
                if !matches!(items.last(), Some(Inline::Break)) {
                    items.push(Inline::Break);
                }
                if let Some(Some(n)) = item_index.last_mut() {
                    *n += 1;
                }
            }

            // ── Inline tags ──
            Event::Start(Tag::Strong) => bold_depth += 1,
            Event::End(TagEnd::Strong) => bold_depth = bold_depth.saturating_sub(1),

            Event::Start(Tag::Emphasis) => italic_depth += 1,
            Event::End(TagEnd::Emphasis) => italic_depth = italic_depth.saturating_sub(1),

            Event::Start(Tag::Strikethrough) => strike_depth += 1,
            Event::End(TagEnd::Strikethrough) => strike_depth = strike_depth.saturating_sub(1),

            Event::Start(Tag::Link { dest_url, .. }) => links.push(dest_url.to_string()),
            Event::End(TagEnd::Link) => {
                links.pop();
            }

            Event::Start(Tag::Image { dest_url, .. }) => {
                image = Some((dest_url.to_string(), String::new()));
            }
            Event::End(TagEnd::Image) => {
                if let Some((src, alt)) = image.take() {
                    items.push(Inline::Image { src, alt });
                }
            }

            // ── Text content ──
            Event::Text(cow) | Event::Code(cow) | Event::Html(cow) | Event::InlineHtml(cow)
                if need_item_prefix =>
            {
                let indent = "  ".repeat(list_depth.saturating_sub(1) as usize);
                let prefix = match item_index.last() {
                    Some(Some(n)) => format!("{indent}{n}. "),
                    _ => format!("{indent}• "),
                };
                push_text(&mut items, RichSpan::plain(prefix));
                need_item_prefix = false;
                let span = RichSpan {
                    text: cow.to_string(),
                    bold: bold_depth > 0,
                    italic: italic_depth > 0,
                    strikethrough: strike_depth > 0,
                    heading_level,
                    link: links.last().cloned(),
                    ..Default::default()
                };
                push_text(&mut items, span);
            }

            Event::Text(cow) => {
                let span = RichSpan {
                    text: cow.to_string(),
                    bold: bold_depth > 0,
                    italic: italic_depth > 0,
                    strikethrough: strike_depth > 0,
                    code_block,
                    heading_level,
                    link: links.last().cloned(),
                    ..Default::default()
                };
                push_text(&mut items, span);
            }

            Event::Code(cow) => {
                let span = RichSpan {
                    text: cow.to_string(),
                    bold: bold_depth > 0,
                    italic: italic_depth > 0,
                    code: true,
                    link: links.last().cloned(),
                    ..Default::default()
                };
                push_text(&mut items, span);
            }

            Event::SoftBreak => push_text(&mut items, RichSpan::plain(" ")),
            Event::HardBreak => items.push(Inline::Break),
            Event::Rule => items.push(Inline::Break),

            // Raw HTML is shown as text, never interpreted
            Event::Html(cow) | Event::InlineHtml(cow) => {
                push_text(&mut items, RichSpan::plain(cow.to_string()));
            }

            _ => {}
        }
    }

    // Trailing breaks carry no content
    while matches!(items.last(), Some(Inline::Break)) {
        items.pop();
    }

    items
        .into_iter()
        .flat_map(|item| match item {
            // Code keeps `[icon:x]` literally
            Inline::Text(span) if !span.code && !span.code_block => split_icons(span),
            other => vec![other],
        })
        .collect()
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Append a run, merging with the previous one when the style matches.
fn push_text(items: &mut Vec<Inline>, span: RichSpan) {
    if span.text.is_empty() {
        return;
    }
    if let Some(Inline::Text(prev)) = items.last_mut() {
        if prev.same_style(&span) {
            prev.text.push_str(&span.text);
            return;
        }
    }
    items.push(Inline::Text(span));
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[Inline]) -> Vec<&RichSpan> {
        items
            .iter()
            .filter_map(|i| match i {
                Inline::Text(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_text_passthrough() {
        let items = parse_inlines("hello world");
        assert_eq!(items, vec![Inline::Text(RichSpan::plain("hello world"))]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_inlines("").is_empty());
        assert!(parse_inlines("   \n").is_empty());
    }

    #[test]
    fn test_bold_and_italic() {
        let items = parse_inlines("normal **bold** *italic* `code`");
        let spans = texts(&items);
        assert!(spans.iter().any(|s| s.text == "bold" && s.bold));
        assert!(spans.iter().any(|s| s.text == "italic" && s.italic));
        assert!(spans.iter().any(|s| s.text == "code" && s.code));
    }

    #[test]
    fn test_paragraphs_are_separated_by_breaks() {
        let items = parse_inlines("one\n\ntwo");
        assert_eq!(
            items,
            vec![
                Inline::Text(RichSpan::plain("one")),
                Inline::Break,
                Inline::Text(RichSpan::plain("two")),
            ]
        );
    }

    #[test]
    fn test_links_carry_target() {
        let items = parse_inlines("see [docs](https://example.com/docs)");
        let spans = texts(&items);
        let link = spans.iter().find(|s| s.text == "docs").unwrap();
        assert_eq!(link.link.as_deref(), Some("https://example.com/docs"));
    }

    #[test]
    fn test_images_become_image_nodes() {
        let items = parse_inlines("before ![a **cat**](https://cdn.example/cat.png) after");
        assert!(items.contains(&Inline::Image {
            src: "https://cdn.example/cat.png".into(),
            alt: "a cat".into(),
        }));
    }

    #[test]
    fn test_data_uri_images_pass_through() {
        let uri = "data:image/png;base64,iVBORw0KGgo=";
        let items = parse_inlines(&format!("![shot]({uri})"));
        assert_eq!(items, vec![Inline::Image { src: uri.into(), alt: "shot".into() }]);
    }

    #[test]
    fn test_icons_resolved_inside_markdown() {
        let items = parse_inlines("Launch [icon:rocket] now");
        assert!(items.contains(&Inline::Icon { name: "rocket".into(), glyph: "🚀".into() }));
        let plain = Inline::plain_text(&items);
        assert_eq!(plain, "Launch 🚀 now");
    }

    #[test]
    fn test_unknown_icons_stay_literal() {
        let items = parse_inlines("Hi [icon:nonexistent]");
        assert_eq!(Inline::plain_text(&items), "Hi [icon:nonexistent]");
    }

    #[test]
    fn test_icons_in_code_not_resolved() {
        let items = parse_inlines("`[icon:check]`");
        assert_eq!(items.len(), 1);
        match &items[0] {
            Inline::Text(s) => {
                assert!(s.code);
                assert_eq!(s.text, "[icon:check]");
            }
            other => panic!("unexpected inline {other:?}"),
        }
    }

    #[test]
    fn test_list_items() {
        let items = parse_inlines("- one\n- two");
        let text = Inline::plain_text(&items);
        assert!(text.contains("• one"));
        assert!(text.contains("• two"));
    }

    #[test]
    fn test_ordered_list() {
        let items = parse_inlines("1. first\n2. second");
        let text = Inline::plain_text(&items);
        assert!(text.contains("1. first"));
        assert!(text.contains("2. second"));
    }

    #[test]
    fn test_heading_inside_text() {
        let items = parse_inlines("# Title");
        let spans = texts(&items);
        assert_eq!(spans[0].heading_level, Some(1));
        assert!(spans[0].bold);
    }

    #[test]
    fn test_raw_html_is_text() {
        let items = parse_inlines("a <b>b</b>");
        assert_eq!(Inline::plain_text(&items), "a <b>b</b>");
    }
}
