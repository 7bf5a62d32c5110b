//! Uploaded post images on the local filesystem.
//!
//! Images live under the configured uploads directory and are referenced from
//! the database by their path relative to it, e.g. `posts_images/<id>.jpg`.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::forms::UploadedImage;

const POST_IMAGES_DIR: &str = "posts_images";

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a stored relative path onto the uploads directory.
    /// Returns None for anything that could escape it.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        if relative.is_empty() {
            return None;
        }
        let path = Path::new(relative);
        let all_normal = path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        all_normal.then(|| self.root.join(path))
    }

    /// Write an upload under a fresh name and return its relative path.
    pub async fn save_post_image(&self, image: &UploadedImage) -> io::Result<String> {
        let ext = image.extension().unwrap_or("bin");
        let relative = format!("{}/{}.{}", POST_IMAGES_DIR, uuid::Uuid::now_v7(), ext);

        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &image.bytes).await?;

        tracing::debug!(path = %relative, size = image.bytes.len(), "image stored");
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(relative) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove a stored image. A missing file is not an error.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %relative, "image removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %relative, "image not found for removal")
            }
            Err(e) => tracing::error!("Failed to remove image {}: {}", relative, e),
        }
    }
}
