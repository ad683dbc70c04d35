//! Permanent image storage.
//!
//! Staging validates and holds images in memory; an [`ImageStore`] is where
//! they go when a document is saved. Uploads carry an optional desired id so
//! that re-uploading the same content lands at the same address.

mod local;
mod memory;
mod mime;

pub use local::LocalImageStore;
pub use memory::MemoryImageStore;
pub use mime::ImageMime;

use async_trait::async_trait;
use thiserror::Error;

use blockpress_types::ErrorKind;

#[derive(Error, Debug)]
pub enum ImageStoreError {
    /// Folder or id would escape the storage root or is otherwise unusable.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload rejected: {0}")]
    Rejected(String),
}

impl ImageStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImageStoreError::InvalidKey(_) => ErrorKind::Validation,
            ImageStoreError::Io(_) | ImageStoreError::Rejected(_) => ErrorKind::Storage,
        }
    }
}

pub type ImageStoreResult<T> = Result<T, ImageStoreError>;

/// Permanent storage for validated images.
///
/// `upload` with an explicit `desired_id` overwrites whatever is stored at
/// that id, so callers can replace an asset at a stable address.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the bytes and return the permanent URL.
    async fn upload(
        &self,
        bytes: &[u8],
        mime: ImageMime,
        folder: &str,
        desired_id: Option<&str>,
    ) -> ImageStoreResult<String>;
}

/// Reject keys that could escape a folder or form odd filenames.
pub(crate) fn check_key(part: &str, what: &str) -> ImageStoreResult<()> {
    let ok = !part.is_empty()
        && !part.contains("..")
        && !part.starts_with('/')
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    if ok {
        Ok(())
    } else {
        Err(ImageStoreError::InvalidKey(format!("{what} '{part}'")))
    }
}

/// Fresh id for uploads that do not ask for one.
pub(crate) fn generated_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}
