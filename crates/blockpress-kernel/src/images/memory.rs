//! In-memory image store.
//!
//! Used for tests and dry runs. Counts every upload call and can be told to
//! fail specific ids, so save-path failure handling is testable.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ImageMime, ImageStore, ImageStoreError, ImageStoreResult, check_key, generated_id};

#[derive(Debug, Clone)]
struct StoredImage {
    bytes: Vec<u8>,
    mime: ImageMime,
}

#[derive(Debug, Default)]
struct Inner {
    images: HashMap<String, StoredImage>,
    uploads: usize,
    failing_ids: HashSet<String>,
    fail_all: bool,
}

/// Thread-safe image store backed by a `HashMap`. All data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    inner: Mutex<Inner>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upload` calls so far, failed ones included.
    pub fn upload_count(&self) -> usize {
        self.inner.lock().uploads
    }

    /// Number of distinct stored images.
    pub fn len(&self) -> usize {
        self.inner.lock().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().images.is_empty()
    }

    /// Bytes stored at a URL returned by `upload`.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.inner.lock().images.get(url).map(|img| img.bytes.clone())
    }

    pub fn mime_of(&self, url: &str) -> Option<ImageMime> {
        self.inner.lock().images.get(url).map(|img| img.mime)
    }

    /// Make uploads with this desired id fail.
    pub fn fail_id(&self, id: impl Into<String>) {
        self.inner.lock().failing_ids.insert(id.into());
    }

    /// Make every upload fail (or succeed again).
    pub fn set_fail_all(&self, fail: bool) {
        self.inner.lock().fail_all = fail;
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock();
        inner.failing_ids.clear();
        inner.fail_all = false;
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(
        &self,
        bytes: &[u8],
        mime: ImageMime,
        folder: &str,
        desired_id: Option<&str>,
    ) -> ImageStoreResult<String> {
        check_key(folder, "folder")?;
        let id = match desired_id {
            Some(id) => {
                check_key(id, "id")?;
                id.to_string()
            }
            None => generated_id(),
        };

        let mut inner = self.inner.lock();
        inner.uploads += 1;
        if inner.fail_all || inner.failing_ids.contains(&id) {
            return Err(ImageStoreError::Rejected(format!(
                "injected failure for {id}"
            )));
        }

        let url = format!("memory://{folder}/{id}.{}", mime.extension());
        inner.images.insert(
            url.clone(),
            StoredImage {
                bytes: bytes.to_vec(),
                mime,
            },
        );
        Ok(url)
    }
}
