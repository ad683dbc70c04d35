//! Inline content nodes shared by every text-bearing render node.

use serde::Serialize;

/// A styled run of text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RichSpan {
    pub text: String,
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub code_block: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    /// Link target when this run sits inside a link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl RichSpan {
    /// Unstyled text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Same style, different text.
    pub fn restyle(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Check if two spans can be merged into one run.
    pub fn same_style(&self, other: &Self) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.strikethrough == other.strikethrough
            && self.code == other.code
            && self.code_block == other.code_block
            && self.heading_level == other.heading_level
            && self.link == other.link
    }
}

/// One inline item in rendered text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "inline", rename_all = "snake_case")]
pub enum Inline {
    Text(RichSpan),
    Image {
        src: String,
        alt: String,
    },
    /// A resolved `[icon:name]` token.
    Icon {
        name: String,
        glyph: String,
    },
    /// Paragraph or hard line break.
    Break,
}

impl Inline {
    /// Plain-text projection (icons as glyphs, images as alt text).
    pub fn plain_text(items: &[Inline]) -> String {
        let mut out = String::new();
        for item in items {
            match item {
                Inline::Text(span) => out.push_str(&span.text),
                Inline::Image { alt, .. } => out.push_str(alt),
                Inline::Icon { glyph, .. } => out.push_str(glyph),
                Inline::Break => out.push('\n'),
            }
        }
        out
    }
}

fn is_false(v: &bool) -> bool {
    !v
}
