use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::try_join_all;

use crate::models::video::{ClaimCheckManifest, UploadedFile, UploadedFiles};
use crate::services::storage::{ObjectStore, StorageError};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Swaps a submission's attachments for object-store keys before the job
/// crosses the queue boundary.
pub struct ClaimCheckBuilder {
    storage: Arc<dyn ObjectStore>,
    max_images: usize,
}

impl ClaimCheckBuilder {
    pub fn new(storage: Arc<dyn ObjectStore>, max_images: usize) -> Self {
        Self {
            storage,
            max_images,
        }
    }

    /// Upload every attachment and return the manifest of keys.
    ///
    /// Attachments are validated before anything is written. An upload failure
    /// aborts the build; objects already written are left in place.
    pub async fn build(&self, files: UploadedFiles) -> Result<ClaimCheckManifest, ClaimCheckError> {
        self.check(&files)?;

        let start = Instant::now();
        let mut keys = KeyAllocator::default();

        let speech_key = files.speech.as_ref().map(|f| keys.allocate(&f.file_name));
        let music_key = files.music.as_ref().map(|f| keys.allocate(&f.file_name));
        let image_keys: Vec<String> = files
            .images
            .iter()
            .map(|f| keys.allocate(&f.file_name))
            .collect();

        if let (Some(file), Some(key)) = (&files.speech, &speech_key) {
            self.upload(key, file).await?;
        }
        if let (Some(file), Some(key)) = (&files.music, &music_key) {
            self.upload(key, file).await?;
        }
        try_join_all(
            files
                .images
                .iter()
                .zip(&image_keys)
                .map(|(file, key)| self.upload(key, file)),
        )
        .await?;

        metrics::histogram!("claim_check_upload_seconds").record(start.elapsed().as_secs_f64());

        Ok(ClaimCheckManifest {
            speech_file: speech_key,
            music_file: music_key,
            image_files: image_keys,
        })
    }

    fn check(&self, files: &UploadedFiles) -> Result<(), ClaimCheckError> {
        if files.images.is_empty() {
            return Err(ClaimCheckError::NoImages);
        }
        if files.images.len() > self.max_images {
            return Err(ClaimCheckError::TooManyImages {
                count: files.images.len(),
                max: self.max_images,
            });
        }
        for image in &files.images {
            image::guess_format(&image.data)
                .map_err(|_| ClaimCheckError::UnsupportedImage(image.file_name.clone()))?;
        }
        Ok(())
    }

    async fn upload(&self, key: &str, file: &UploadedFile) -> Result<(), ClaimCheckError> {
        let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
        self.storage
            .upload(key, file.data.clone(), content_type)
            .await
            .map_err(|source| ClaimCheckError::Upload {
                key: key.to_string(),
                source,
            })?;
        tracing::debug!(key, bytes = file.data.len(), "Attachment uploaded");
        Ok(())
    }
}

/// Hands out `<6 hex>-<name>` keys, never repeating one within a manifest.
#[derive(Default)]
struct KeyAllocator {
    issued: HashSet<String>,
}

impl KeyAllocator {
    fn allocate(&mut self, original_name: &str) -> String {
        let name = sanitize_file_name(original_name);
        loop {
            let prefix = hex::encode(rand::random::<[u8; 3]>());
            let key = format!("{prefix}-{name}");
            if self.issued.insert(key.clone()) {
                return key;
            }
        }
    }
}

/// Keep only the final path component of a client-supplied file name.
fn sanitize_file_name(original: &str) -> String {
    let normalized = original.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("upload")
        .to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimCheckError {
    #[error("At least one image file is required")]
    NoImages,

    #[error("Too many image files: {count} (maximum {max})")]
    TooManyImages { count: usize, max: usize },

    #[error("Unsupported image format: {0}")]
    UnsupportedImage(String),

    #[error("Failed to upload '{key}': {source}")]
    Upload {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl ClaimCheckError {
    /// Whether the request itself was at fault (as opposed to the object store).
    pub fn is_validation(&self) -> bool {
        !matches!(self, ClaimCheckError::Upload { .. })
    }
}
