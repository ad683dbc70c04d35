//! Image staging: hold attached images in memory until the document is saved.
//!
//! ```text
//! attach ──► stage(file) ──► "data:image/png;base64,…"  (display source, in blocks)
//!                                   │
//! save ────► resolve_all(doc) ──────┤ upload each distinct image once
//!                                   ▼
//!                        "https://…/blog/<blake3>.png" (swapped into blocks)
//! cancel ──► discard_all()
//! ```
//!
//! One [`ImageStager`] belongs to one editing session. Nothing reaches the
//! [`ImageStore`] until `resolve_all`; a failed upload aborts the whole
//! resolution and leaves the caller's document untouched.
//!
//! Uploads use the BLAKE3 hash of the content as the desired id, so
//! identical bytes always land at the same permanent address. Resolved
//! representations are remembered, which makes `resolve_all` idempotent
//! without re-uploading.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::{Match, Regex};
use thiserror::Error;

use blockpress_types::{Block, BlockData, BlockError, Document, ErrorKind};

use crate::config::StagingConfig;
use crate::images::{ImageMime, ImageStore, ImageStoreError};

/// A self-contained `data:image/…;base64,…` representation.
static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/]+={0,2}")
        .expect("data uri pattern is valid")
});

// ============================================================================
// Errors
// ============================================================================

/// One image that could not be uploaded during `resolve_all`.
#[derive(Debug)]
pub struct UploadFailure {
    pub placeholder: String,
    pub content_id: String,
    pub error: ImageStoreError,
}

impl std::fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image {}: {}", self.placeholder, self.error)
    }
}

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("image file is empty")]
    Empty,

    #[error("image is {size} bytes, the limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),

    #[error("declared type {declared} does not match content ({detected})")]
    MimeMismatch {
        declared: String,
        detected: ImageMime,
    },

    #[error("{} image upload(s) failed: {}", .0.len(), join_failures(.0))]
    UploadFailed(Vec<UploadFailure>),

    /// The document holds data URIs this session never staged.
    #[error("document references {count} image(s) that were never staged")]
    Unresolved { count: usize },

    #[error(transparent)]
    Document(#[from] BlockError),
}

fn join_failures(failures: &[UploadFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl StagingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StagingError::Empty
            | StagingError::TooLarge { .. }
            | StagingError::UnsupportedType(_)
            | StagingError::MimeMismatch { .. }
            | StagingError::Unresolved { .. } => ErrorKind::Validation,
            StagingError::UploadFailed(_) => ErrorKind::Storage,
            StagingError::Document(e) => e.kind(),
        }
    }
}

// ============================================================================
// Files and pending images
// ============================================================================

/// Raw image bytes as attached by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFile {
    pub name: Option<String>,
    /// Declared MIME type, checked against the content on staging.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            name: None,
            mime_type: Some(mime_type.into()),
            bytes: bytes.into(),
        }
    }

    /// Bytes with no declared type; the type is taken from the content.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: None,
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Read a file from disk, declaring the type its extension implies.
    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageMime::from_extension)
            .map(|m| m.as_str().to_string());
        Ok(Self {
            name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            mime_type,
            bytes,
        })
    }
}

/// An image held in memory, not yet uploaded.
#[derive(Clone, Debug)]
pub struct PendingImage {
    /// Token minted when the image was first staged.
    pub placeholder: String,
    pub file: ImageFile,
    pub mime: ImageMime,
    /// BLAKE3 of the bytes; the desired id on upload.
    pub content_id: String,
    pub temp_representation: String,
}

/// BLAKE3 content hash, hex-encoded.
pub fn content_id(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Byte ranges of inline code spans and code blocks in markdown text.
fn code_ranges(s: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut in_block = false;
    for (event, range) in Parser::new(s).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_block = true;
                ranges.push(range);
            }
            Event::End(TagEnd::CodeBlock) => in_block = false,
            Event::Code(_) => ranges.push(range),
            Event::Text(_) if in_block => ranges.push(range),
            _ => {}
        }
    }
    ranges
}

/// Data URIs in `s`, except those written as markdown code.
fn image_uris(s: &str) -> Vec<Match<'_>> {
    let found: Vec<Match<'_>> = DATA_URI.find_iter(s).collect();
    if found.is_empty() {
        return found;
    }
    let code = code_ranges(s);
    found
        .into_iter()
        .filter(|m| !code.iter().any(|r| r.contains(&m.start())))
        .collect()
}

/// Code blocks show their text verbatim and never hold staged images.
fn holds_images(block: &Block) -> bool {
    !matches!(block.data(), BlockData::Code(_))
}

/// Swap every resolved data URI in `s` for its permanent URL.
fn substitute(s: &str, resolved: &HashMap<String, String>) -> Option<String> {
    let uris = image_uris(s);
    if uris.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for m in uris {
        out.push_str(&s[last..m.start()]);
        out.push_str(resolved.get(m.as_str()).map_or(m.as_str(), String::as_str));
        last = m.end();
    }
    out.push_str(&s[last..]);
    Some(out)
}

/// Check if any string in the document carries a staged (data URI) image.
///
/// Code blocks and markdown code are not scanned.
pub fn contains_ephemeral(doc: &Document) -> bool {
    let mut found = false;
    for block in doc.iter().filter(|b| holds_images(b)) {
        // An unserializable payload cannot be shown clean.
        if block
            .for_each_string(|s| found |= !image_uris(s).is_empty())
            .is_err()
        {
            return true;
        }
    }
    found
}

/// Every distinct data URI in the document, in first-seen order.
pub fn ephemeral_references(doc: &Document) -> Result<Vec<String>, BlockError> {
    let mut seen = Vec::new();
    for block in doc.iter().filter(|b| holds_images(b)) {
        block.for_each_string(|s| {
            for m in image_uris(s) {
                if !seen.iter().any(|x: &String| x == m.as_str()) {
                    seen.push(m.as_str().to_string());
                }
            }
        })?;
    }
    Ok(seen)
}

// ============================================================================
// ImageStager
// ============================================================================

/// Per-session registry of staged images.
pub struct ImageStager {
    store: Arc<dyn ImageStore>,
    config: StagingConfig,
    /// Keyed by temp representation.
    pending: HashMap<String, PendingImage>,
    /// Temp representation → permanent URL, for already-resolved images.
    resolved: HashMap<String, String>,
}

impl ImageStager {
    pub fn new(store: Arc<dyn ImageStore>, config: StagingConfig) -> Self {
        Self {
            store,
            config,
            pending: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Number of staged, unresolved images.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self, representation: &str) -> Option<&PendingImage> {
        self.pending.get(representation)
    }

    /// Permanent URL of an already-resolved representation.
    pub fn resolved_url(&self, representation: &str) -> Option<&str> {
        self.resolved.get(representation).map(String::as_str)
    }

    fn validate(&self, file: &ImageFile) -> Result<ImageMime, StagingError> {
        if file.bytes.is_empty() {
            return Err(StagingError::Empty);
        }
        if file.bytes.len() > self.config.max_bytes {
            return Err(StagingError::TooLarge {
                size: file.bytes.len(),
                max: self.config.max_bytes,
            });
        }

        let declared = match file.mime_type.as_deref() {
            Some(d) => {
                let mime = ImageMime::from_mime(d)
                    .ok_or_else(|| StagingError::UnsupportedType(d.to_string()))?;
                if !self.config.allows(mime.as_str()) {
                    return Err(StagingError::UnsupportedType(d.to_string()));
                }
                Some(mime)
            }
            None => None,
        };

        let detected = ImageMime::sniff(&file.bytes).ok_or_else(|| {
            StagingError::UnsupportedType(
                file.mime_type
                    .clone()
                    .unwrap_or_else(|| "unrecognized content".to_string()),
            )
        })?;

        match declared {
            Some(d) if d != detected => Err(StagingError::MimeMismatch {
                declared: d.as_str().to_string(),
                detected,
            }),
            _ if !self.config.allows(detected.as_str()) => {
                Err(StagingError::UnsupportedType(detected.as_str().to_string()))
            }
            _ => Ok(detected),
        }
    }

    /// Validate and stage a file, returning its display representation.
    ///
    /// Staging byte-identical content again returns the existing entry.
    #[tracing::instrument(skip(self, file), fields(len = file.bytes.len()), name = "staging.stage")]
    pub fn stage(&mut self, file: ImageFile) -> Result<String, StagingError> {
        let mime = self.validate(&file)?;
        let representation = format!("data:{};base64,{}", mime, BASE64.encode(&file.bytes));

        if self.pending.contains_key(&representation) {
            tracing::debug!("content already staged");
            return Ok(representation);
        }

        let pending = PendingImage {
            placeholder: uuid::Uuid::now_v7().simple().to_string(),
            content_id: content_id(&file.bytes),
            mime,
            file,
            temp_representation: representation.clone(),
        };
        tracing::debug!(placeholder = %pending.placeholder, %mime, "image staged");
        self.pending.insert(representation.clone(), pending);
        Ok(representation)
    }

    /// Swap a staged image for a new file.
    ///
    /// The new file is validated first; on error the old entry is kept.
    #[tracing::instrument(skip(self, old_representation, file), name = "staging.replace")]
    pub fn replace(
        &mut self,
        old_representation: &str,
        file: ImageFile,
    ) -> Result<String, StagingError> {
        self.validate(&file)?;
        self.pending.remove(old_representation);
        self.stage(file)
    }

    /// Drop every staged image and forget resolved ones.
    #[tracing::instrument(skip(self), name = "staging.discard_all")]
    pub fn discard_all(&mut self) {
        let dropped = self.pending.len();
        self.pending.clear();
        self.resolved.clear();
        tracing::debug!(dropped, "staged images discarded");
    }

    /// Upload every staged image the document references and return a copy
    /// with each representation replaced by its permanent URL.
    ///
    /// Each distinct image is uploaded at most once, concurrently. If any
    /// upload fails the error lists every failure and no document is
    /// returned; images that did upload are remembered so a retry only
    /// uploads the rest.
    #[tracing::instrument(skip(self, doc), fields(blocks = doc.len()), name = "staging.resolve_all")]
    pub async fn resolve_all(&mut self, doc: &Document) -> Result<Document, StagingError> {
        let references = ephemeral_references(doc)?;
        if references.is_empty() {
            return Ok(doc.clone());
        }

        let mut to_upload = Vec::new();
        let mut unresolved = 0;
        for repr in &references {
            if self.resolved.contains_key(repr) {
                continue;
            }
            match self.pending.get(repr) {
                Some(p) => to_upload.push(p.clone()),
                None => unresolved += 1,
            }
        }
        if unresolved > 0 {
            tracing::warn!(unresolved, "document references unstaged images");
            return Err(StagingError::Unresolved { count: unresolved });
        }

        if !to_upload.is_empty() {
            let folder = self.config.folder.clone();
            let results = futures::future::join_all(to_upload.iter().map(|p| {
                let store = Arc::clone(&self.store);
                let folder = folder.as_str();
                async move {
                    store
                        .upload(&p.file.bytes, p.mime, folder, Some(&p.content_id))
                        .await
                }
            }))
            .await;

            let mut failures = Vec::new();
            for (pending, result) in to_upload.into_iter().zip(results) {
                match result {
                    Ok(url) => {
                        tracing::info!(placeholder = %pending.placeholder, %url, "image uploaded");
                        self.pending.remove(&pending.temp_representation);
                        self.resolved.insert(pending.temp_representation, url);
                    }
                    Err(error) => {
                        tracing::warn!(placeholder = %pending.placeholder, "upload failed: {}", error);
                        failures.push(UploadFailure {
                            placeholder: pending.placeholder,
                            content_id: pending.content_id,
                            error,
                        });
                    }
                }
            }
            if !failures.is_empty() {
                return Err(StagingError::UploadFailed(failures));
            }
        }

        let resolved = &self.resolved;
        let blocks = doc
            .iter()
            .map(|block| {
                if holds_images(block) {
                    block.map_strings(|s| substitute(s, resolved))
                } else {
                    Ok(block.clone())
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(BlockError::from)?;
        let out = Document::from_blocks(blocks)?;

        // A store may hand back another data URI as its "permanent" URL
        let left = ephemeral_references(&out)?.len();
        if left > 0 {
            tracing::warn!(left, "image store returned data URIs");
            return Err(StagingError::Unresolved { count: left });
        }
        Ok(out)
    }
}

impl std::fmt::Debug for ImageStager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStager")
            .field("pending", &self.pending.len())
            .field("resolved", &self.resolved.len())
            .field("config", &self.config)
            .finish()
    }
}
