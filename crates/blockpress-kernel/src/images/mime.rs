//! Image formats accepted by staging, identified by content.

use serde::{Deserialize, Serialize};

/// A supported raster image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Gif => "image/gif",
            ImageMime::Webp => "image/webp",
        }
    }

    /// File extension used by permanent storage.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "jpg",
            ImageMime::Png => "png",
            ImageMime::Gif => "gif",
            ImageMime::Webp => "webp",
        }
    }

    /// Parse a declared MIME type. `image/jpg` is accepted as an alias.
    pub fn from_mime(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            "image/gif" => Some(ImageMime::Gif),
            "image/webp" => Some(ImageMime::Webp),
            _ => None,
        }
    }

    /// Guess from a file extension (used when the caller declares nothing).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageMime::Jpeg),
            "png" => Some(ImageMime::Png),
            "gif" => Some(ImageMime::Gif),
            "webp" => Some(ImageMime::Webp),
            _ => None,
        }
    }

    /// Identify the format from its leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageMime::Jpeg),
            [0x89, b'P', b'N', b'G', ..] => Some(ImageMime::Png),
            [b'G', b'I', b'F', b'8', ..] => Some(ImageMime::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(ImageMime::Webp)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(ImageMime::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageMime::Jpeg));
        assert_eq!(
            ImageMime::sniff(b"\x89PNG\r\n\x1a\n"),
            Some(ImageMime::Png)
        );
        assert_eq!(ImageMime::sniff(b"GIF89a"), Some(ImageMime::Gif));
        assert_eq!(ImageMime::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageMime::Webp));
    }

    #[test]
    fn test_sniff_rejects_other_content() {
        assert_eq!(ImageMime::sniff(b"<svg xmlns="), None);
        assert_eq!(ImageMime::sniff(b"RIFF\0\0\0\0WAVE"), None);
        assert_eq!(ImageMime::sniff(&[]), None);
    }

    #[test]
    fn test_declared_types() {
        assert_eq!(ImageMime::from_mime("IMAGE/JPG"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_mime("image/svg+xml"), None);
        assert_eq!(ImageMime::from_extension("JPEG"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::Webp.extension(), "webp");
    }
}
