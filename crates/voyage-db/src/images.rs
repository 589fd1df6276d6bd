//! Image asset manager: stores vacation images and cleans up the ones a
//! vacation no longer references.
//!
//! Storing is strict (type and size are checked before anything is written).
//! Deleting is best-effort: a file that cannot be removed is logged and
//! skipped, never surfaced to the caller, so a missing file can't block a
//! record mutation that has already committed.

use uuid::Uuid;
use voyage_common::config::{StorageBackend, StorageConfig};
use voyage_common::error::{VoyageError, VoyageResult};

use crate::storage::{is_safe_key, LocalStore, ObjectStore, S3Config, S3Store};

/// Prefix of every image key.
const KEY_PREFIX: &str = "vacations";

/// Accepted image types and the extension their keys get.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Whether `image_ref` has the shape of a key [`ImageAssetManager::store`]
/// hands out: `vacations/<uuid>.<jpg|png|gif>`.
pub fn is_image_ref(image_ref: &str) -> bool {
    let Some(name) = image_ref
        .strip_prefix(KEY_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return false;
    };
    let Some((stem, ext)) = name.split_once('.') else {
        return false;
    };
    matches!(ext, "jpg" | "png" | "gif") && stem.len() == 36 && Uuid::try_parse(stem).is_ok()
}

/// `"Image/PNG; charset=binary"` → `"image/png"`
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Clone)]
pub struct ImageAssetManager {
    store: ObjectStore,
    max_bytes: usize,
    public_base_url: String,
}

impl ImageAssetManager {
    pub fn new(store: ObjectStore, max_bytes: usize, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            max_bytes,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the manager for the configured backend.
    pub async fn from_config(cfg: &StorageConfig, max_bytes: u64) -> anyhow::Result<Self> {
        let store = match cfg.backend {
            StorageBackend::Local => {
                tokio::fs::create_dir_all(&cfg.data_dir).await?;
                tracing::info!(dir = %cfg.data_dir, "Using local image storage");
                ObjectStore::Local(LocalStore::new(&cfg.data_dir))
            }
            StorageBackend::S3 => {
                let s3 = S3Store::new(&S3Config {
                    endpoint: cfg.endpoint.clone(),
                    access_key: cfg.access_key.clone(),
                    secret_key: cfg.secret_key.clone(),
                    bucket: cfg.bucket.clone(),
                    region: cfg.region.clone(),
                });
                s3.ensure_bucket().await?;
                tracing::info!(bucket = %cfg.bucket, "Using S3 image storage");
                ObjectStore::S3(s3)
            }
        };
        let max_bytes = usize::try_from(max_bytes).unwrap_or(usize::MAX);
        Ok(Self::new(store, max_bytes, cfg.public_base_url.clone()))
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and store one image, returning its storage reference.
    pub async fn store(&self, bytes: Vec<u8>, content_type: &str) -> VoyageResult<String> {
        let content_type = normalize_content_type(content_type);
        let ext = extension_for(&content_type).ok_or_else(|| VoyageError::UnsupportedMediaType {
            content_type: content_type.clone(),
        })?;

        if bytes.len() > self.max_bytes {
            return Err(VoyageError::PayloadTooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }

        let key = format!("{KEY_PREFIX}/{}.{ext}", Uuid::now_v7());
        let size = bytes.len();
        self.store.put(&key, bytes, &content_type).await?;
        tracing::debug!(image_ref = %key, size, "Stored vacation image");
        Ok(key)
    }

    /// Delete one image. Failures are logged, never returned.
    pub async fn delete(&self, image_ref: &str) {
        match self.store.delete(image_ref).await {
            Ok(true) => tracing::debug!(image_ref, "Deleted vacation image"),
            Ok(false) => tracing::debug!(image_ref, "Vacation image already absent"),
            Err(e) => tracing::warn!(image_ref, error = %format!("{e:#}"), "Failed to delete vacation image"),
        }
    }

    /// Delete every image in `refs`, best-effort.
    pub async fn delete_all(&self, refs: &[String]) {
        for image_ref in refs {
            self.delete(image_ref).await;
        }
    }

    /// Read an image back with its content type; `None` if absent or the
    /// reference is not one we could have issued.
    pub async fn read(&self, image_ref: &str) -> VoyageResult<Option<(Vec<u8>, String)>> {
        if !is_safe_key(image_ref) {
            return Ok(None);
        }
        let Some(bytes) = self.store.get(image_ref).await? else {
            return Ok(None);
        };
        let content_type = mime_guess::from_path(image_ref)
            .first_or_octet_stream()
            .to_string();
        Ok(Some((bytes, content_type)))
    }

    /// Client-facing URL of an image.
    pub fn url_for(&self, image_ref: &str) -> String {
        format!("{}/{}", self.public_base_url, image_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn manager(max_bytes: usize) -> (ImageAssetManager, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::Local(LocalStore::new(dir.path()));
        (ImageAssetManager::new(store, max_bytes, "/images/"), dir)
    }

    #[tokio::test]
    async fn stored_keys_are_recognized_as_image_refs() {
        let (images, _dir) = manager(1024);
        let key = images.store(PNG.to_vec(), "image/png").await.unwrap();
        assert!(is_image_ref(&key));

        for other in [
            "unrelated.txt",
            "vacations/abc.png",
            "vacations/../x.png",
            "photos/0191e3a0-0000-7000-8000-000000000000.png",
            "vacations/0191e3a0-0000-7000-8000-000000000000.exe",
        ] {
            assert!(!is_image_ref(other), "{other}");
        }
    }

    #[tokio::test]
    async fn stores_supported_images_under_prefix() {
        let (images, dir) = manager(1024);
        let image_ref = images.store(PNG.to_vec(), "image/png").await.unwrap();

        assert!(image_ref.starts_with("vacations/"));
        assert!(image_ref.ends_with(".png"));
        assert!(dir.path().join(&image_ref).exists());
        assert_eq!(images.url_for(&image_ref), format!("/images/{image_ref}"));
    }

    #[tokio::test]
    async fn content_type_parameters_and_case_are_ignored() {
        let (images, _dir) = manager(1024);
        let image_ref = images.store(vec![0xFF, 0xD8], "Image/JPEG; q=1").await.unwrap();
        assert!(image_ref.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn rejects_unsupported_media_type() {
        let (images, _dir) = manager(1024);
        let err = images.store(vec![0; 4], "image/webp").await.unwrap_err();
        assert!(matches!(err, VoyageError::UnsupportedMediaType { .. }));
    }

    #[tokio::test]
    async fn rejects_oversized_payload() {
        let (images, dir) = manager(4);
        let err = images.store(vec![0; 5], "image/gif").await.unwrap_err();
        assert!(matches!(err, VoyageError::PayloadTooLarge { size: 5, max: 4 }));
        assert!(!dir.path().join(KEY_PREFIX).exists());
    }

    #[tokio::test]
    async fn accepts_payload_at_exact_limit() {
        let (images, _dir) = manager(4);
        assert!(images.store(vec![0; 4], "image/gif").await.is_ok());
    }

    #[tokio::test]
    async fn delete_is_best_effort() {
        let (images, dir) = manager(1024);
        let image_ref = images.store(PNG.to_vec(), "image/png").await.unwrap();

        images.delete(&image_ref).await;
        assert!(!dir.path().join(&image_ref).exists());

        // Already gone, and a path that can't be removed as a file: neither panics.
        images.delete(&image_ref).await;
        std::fs::create_dir_all(dir.path().join("vacations/stuck.png")).unwrap();
        images.delete("vacations/stuck.png").await;
        images.delete("../outside.png").await;
    }

    #[tokio::test]
    async fn read_returns_bytes_and_guessed_type() {
        let (images, _dir) = manager(1024);
        let image_ref = images.store(PNG.to_vec(), "image/png").await.unwrap();

        let (bytes, content_type) = images.read(&image_ref).await.unwrap().unwrap();
        assert_eq!(bytes, PNG);
        assert_eq!(content_type, "image/png");
        assert!(images.read("vacations/missing.png").await.unwrap().is_none());
        assert!(images.read("../etc/passwd").await.unwrap().is_none());
    }
}
