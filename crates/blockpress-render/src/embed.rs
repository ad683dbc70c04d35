//! Embed normalisation: video hosts, gists, reddit links, file sizes.

use crate::tree::VideoEmbed;

/// Classify a video URL and derive the embeddable address.
pub fn video_embed(url: &str) -> VideoEmbed {
    if let Some(id) = youtube_id(url) {
        return VideoEmbed::Youtube {
            embed_url: format!("https://www.youtube.com/embed/{id}"),
            video_id: id,
        };
    }
    if let Some(id) = vimeo_id(url) {
        return VideoEmbed::Vimeo {
            embed_url: format!("https://player.vimeo.com/video/{id}"),
            video_id: id,
        };
    }
    VideoEmbed::Link {
        url: url.to_string(),
    }
}

/// Strip scheme and `www.` and split into (host, rest-after-slash).
fn host_and_path(url: &str) -> Option<(&str, &str)> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    if host.is_empty() { None } else { Some((host, path)) }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn take_id(s: &str) -> Option<String> {
    let id: String = s.chars().take_while(|c| is_id_char(*c)).collect();
    if id.is_empty() { None } else { Some(id) }
}

fn youtube_id(url: &str) -> Option<String> {
    let (host, path) = host_and_path(url)?;
    match host {
        "youtu.be" => take_id(path),
        "youtube.com" | "m.youtube.com" | "youtube-nocookie.com" => {
            if let Some(rest) = path.strip_prefix("embed/") {
                return take_id(rest);
            }
            if let Some(rest) = path.strip_prefix("shorts/") {
                return take_id(rest);
            }
            let query = path.strip_prefix("watch?")?;
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("v="))
                .and_then(take_id)
        }
        _ => None,
    }
}

fn vimeo_id(url: &str) -> Option<String> {
    let (host, path) = host_and_path(url)?;
    if host != "vimeo.com" && host != "player.vimeo.com" {
        return None;
    }
    let path = path.strip_prefix("video/").unwrap_or(path);
    let id: String = path.chars().take_while(|c| c.is_ascii_digit()).collect();
    if id.is_empty() { None } else { Some(id) }
}

/// Gist id from `https://gist.github.com/<user>/<id>` (or `/<id>`).
pub fn gist_id(url: &str) -> Option<String> {
    let (host, path) = host_and_path(url)?;
    if host != "gist.github.com" {
        return None;
    }
    let last = path.trim_end_matches('/').rsplit('/').next()?;
    let last = last.strip_suffix(".js").unwrap_or(last);
    let id: String = last.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
    if id.is_empty() { None } else { Some(id) }
}

/// Subreddit name from a reddit permalink (`/r/<name>/comments/…`).
pub fn subreddit_from_url(url: &str) -> Option<String> {
    let (host, path) = host_and_path(url)?;
    if !host.ends_with("reddit.com") {
        return None;
    }
    let rest = path.strip_prefix("r/")?;
    take_id(rest)
}

/// Human-readable size: "512 B", "1.5 KB", "3.2 MB".
pub fn size_label(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
