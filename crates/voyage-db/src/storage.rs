//! Object storage backends for vacation images.
//!
//! Two interchangeable backends behind [`ObjectStore`]:
//! - **Local**: files under a data directory, served by the API itself
//! - **S3**: MinIO / S3-compatible bucket via `aws-sdk-s3`

use anyhow::{Context, Result};
use aws_sdk_s3::{
    config::{Builder as S3Builder, Credentials, Region},
    error::SdkError,
    operation::get_object::GetObjectError,
    primitives::ByteStream,
    Client,
};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Reject keys that could escape the storage root.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && !key.contains('\0')
        && key.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}

// ------------------------------------------------------------------
// Local directory
// ------------------------------------------------------------------

/// Files stored under a root directory, one file per key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        anyhow::ensure!(is_safe_key(key), "invalid storage key {key:?}");
        Ok(self.root.join(key))
    }

    pub async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory for {key}"))?;
        }
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {key} to {}", path.display()))?;
        Ok(())
    }

    pub async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {key}")),
        }
    }

    /// Returns false if the file was already gone.
    pub async fn delete_object(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {key}")),
        }
    }
}

// ------------------------------------------------------------------
// S3 / MinIO
// ------------------------------------------------------------------

/// S3 connection settings.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// MinIO / S3 endpoint URL (e.g. `http://localhost:9000`)
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Region (use `us-east-1` for MinIO)
    pub region: String,
}

/// S3/MinIO storage client: wraps the AWS SDK.
#[derive(Debug, Clone)]
pub struct S3Store {
    inner: Client,
    bucket: String,
}

impl S3Store {
    /// Initialise client from config.
    pub fn new(cfg: &S3Config) -> Self {
        let creds = Credentials::new(
            &cfg.access_key,
            &cfg.secret_key,
            None, // session token
            None, // expiry
            "voyage-storage",
        );

        let s3_cfg = S3Builder::new()
            .endpoint_url(&cfg.endpoint)
            .credentials_provider(creds)
            .region(Region::new(cfg.region.clone()))
            // Force path-style URLs (required for MinIO)
            .force_path_style(true)
            .build();

        Self {
            inner: Client::from_conf(s3_cfg),
            bucket: cfg.bucket.clone(),
        }
    }

    pub async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .with_context(|| format!("Failed to upload {key} to object storage"))?;
        Ok(())
    }

    pub async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let output = match self.inner.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(SdkError::ServiceError(e)) if matches!(e.err(), GetObjectError::NoSuchKey(_)) => {
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to fetch {key} from object storage"));
            }
        };
        let bytes = output
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read body of {key}"))?;
        Ok(Some(bytes.into_bytes().to_vec()))
    }

    /// S3 deletes are idempotent; a missing key is reported as deleted.
    pub async fn delete_object(&self, key: &str) -> Result<bool> {
        self.inner
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete {key} from object storage"))?;
        Ok(true)
    }

    /// Ensure the bucket exists; create it if absent.
    pub async fn ensure_bucket(&self) -> Result<()> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::debug!(bucket = %self.bucket, "Bucket already exists");
                Ok(())
            }
            Err(_) => {
                tracing::info!(bucket = %self.bucket, "Bucket does not exist, creating");
                self.inner
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .context("Failed to create object storage bucket")?;
                Ok(())
            }
        }
    }
}

// ------------------------------------------------------------------
// Dispatch
// ------------------------------------------------------------------

/// The configured image backend.
#[derive(Debug, Clone)]
pub enum ObjectStore {
    Local(LocalStore),
    S3(S3Store),
}

impl ObjectStore {
    pub async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        match self {
            Self::Local(store) => store.put_object(key, data).await,
            Self::S3(store) => store.put_object(key, data, content_type).await,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Local(store) => store.get_object(key).await,
            Self::S3(store) => store.get_object(key).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        match self {
            Self::Local(store) => store.delete_object(key).await,
            Self::S3(store) => store.delete_object(key).await,
        }
    }
}
