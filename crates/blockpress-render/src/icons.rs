//! `[icon:name]` shorthand → inline glyphs.
//!
//! Unknown names are left in place as literal text.

use std::sync::LazyLock;

use regex::Regex;

use crate::inline::{Inline, RichSpan};

static ICON_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[icon:([A-Za-z0-9_-]+)\]").expect("icon token pattern is valid")
});

/// Glyph for an icon name, if known. Names are case-insensitive.
pub fn icon_glyph(name: &str) -> Option<&'static str> {
    let glyph = match name.to_ascii_lowercase().as_str() {
        "check" | "yes" => "✅",
        "x" | "cross" | "no" => "❌",
        "warning" => "⚠️",
        "info" => "ℹ️",
        "star" => "⭐",
        "fire" => "🔥",
        "rocket" => "🚀",
        "bulb" | "idea" => "💡",
        "heart" => "❤️",
        "sparkles" => "✨",
        "thumbs-up" | "thumbsup" => "👍",
        "thumbs-down" | "thumbsdown" => "👎",
        "arrow-right" => "➡️",
        "link" => "🔗",
        "lock" => "🔒",
        "money" => "💰",
        "chart" => "📈",
        "calendar" => "📅",
        "clock" => "⏰",
        "tools" => "🛠️",
        "question" => "❓",
        "book" => "📚",
        "pin" => "📌",
        "gift" => "🎁",
        "trophy" => "🏆",
        _ => return None,
    };
    Some(glyph)
}

/// Split a styled span around icon tokens.
///
/// Known tokens become [`Inline::Icon`]; the text between them keeps the
/// span's style. Unknown tokens stay as part of the text.
pub fn split_icons(span: RichSpan) -> Vec<Inline> {
    if !span.text.contains("[icon:") {
        return vec![Inline::Text(span)];
    }

    let mut out = Vec::new();
    let mut pending = String::new();
    let mut last = 0;

    for caps in ICON_TOKEN.captures_iter(&span.text) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[1];
        pending.push_str(&span.text[last..whole.start()]);
        match icon_glyph(name) {
            Some(glyph) => {
                if !pending.is_empty() {
                    out.push(Inline::Text(span.restyle(std::mem::take(&mut pending))));
                }
                out.push(Inline::Icon {
                    name: name.to_ascii_lowercase(),
                    glyph: glyph.to_string(),
                });
            }
            None => pending.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    pending.push_str(&span.text[last..]);
    if !pending.is_empty() {
        out.push(Inline::Text(span.restyle(pending)));
    }
    out
}

/// Resolve icons in plain (non-markdown) text.
pub fn resolve_icons(text: &str) -> Vec<Inline> {
    if text.is_empty() {
        return Vec::new();
    }
    split_icons(RichSpan::plain(text))
}

/// Remove icon tokens entirely (used for anchors and labels).
pub fn strip_icons(text: &str) -> String {
    ICON_TOKEN.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_icon_resolves() {
        let out = resolve_icons("Fast [icon:rocket] launch");
        assert_eq!(
            out,
            vec![
                Inline::Text(RichSpan::plain("Fast ")),
                Inline::Icon { name: "rocket".into(), glyph: "🚀".into() },
                Inline::Text(RichSpan::plain(" launch")),
            ]
        );
    }

    #[test]
    fn test_unknown_icon_left_literal() {
        let out = resolve_icons("Hello [icon:unicorn-dance] there");
        assert_eq!(out, vec![Inline::Text(RichSpan::plain("Hello [icon:unicorn-dance] there"))]);
    }

    #[test]
    fn test_mixed_known_and_unknown() {
        let out = resolve_icons("[icon:check][icon:nope]");
        assert_eq!(
            out,
            vec![
                Inline::Icon { name: "check".into(), glyph: "✅".into() },
                Inline::Text(RichSpan::plain("[icon:nope]")),
            ]
        );
    }

    #[test]
    fn test_case_insensitive_names() {
        assert_eq!(icon_glyph("STAR"), Some("⭐"));
        assert_eq!(icon_glyph("not-an-icon"), None);
    }

    #[test]
    fn test_style_is_kept_around_icons() {
        let mut span = RichSpan::plain("**[icon:fire] hot");
        span.bold = true;
        let out = split_icons(span);
        match &out[0] {
            Inline::Text(s) => {
                assert!(s.bold);
                assert_eq!(s.text, "**");
            }
            other => panic!("unexpected inline {other:?}"),
        }
        match &out[2] {
            Inline::Text(s) => assert!(s.bold),
            other => panic!("unexpected inline {other:?}"),
        }
    }

    #[test]
    fn test_strip_removes_tokens() {
        assert_eq!(strip_icons("[icon:star] Top picks"), " Top picks");
    }

    #[test]
    fn test_empty_text_is_empty() {
        assert!(resolve_icons("").is_empty());
    }
}
