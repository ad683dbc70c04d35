//! Filesystem image store.
//!
//! Files land at `<root>/<folder>/<id>.<ext>` and are served from
//! `<base_url>/<folder>/<id>.<ext>`.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{ImageMime, ImageStore, ImageStoreResult, check_key, generated_id};
use crate::config::ImagesConfig;

#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ImagesConfig) -> Self {
        Self::new(config.root.clone(), config.base_url.clone())
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()), name = "images.local_upload")]
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

        let file_name = format!("{id}.{}", mime.extension());
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        // Write beside the target then rename, so readers never see a torn file
        let final_path = dir.join(&file_name);
        let tmp_path = dir.join(format!(".{file_name}.tmp"));
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        tracing::info!(path = %final_path.display(), "image stored");
        Ok(format!("{}/{folder}/{file_name}", self.base_url))
    }
}
