//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement,
//! and the BucketProvider trait that hands out per-bucket Storage handles.

use crate::{ObjectKey, StorageBackend};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Metadata operation failed: {0}")]
    MetadataFailed(String),

    #[error("Move failed: {0}")]
    MoveFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid bucket: {0}")]
    InvalidBucket(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reading or writing the caller's local file failed; the store itself
    /// was not at fault.
    #[error("Local file {path}: {source}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// User-defined object metadata. Values are strings on every backend.
pub type ObjectMetadata = BTreeMap<String, String>;

/// Options applied to an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    /// Store the body gzip-encoded with `Content-Encoding: gzip`. Backends
    /// that cannot serve transcoded content store it as-is.
    pub gzip: bool,
}

/// Storage abstraction trait
///
/// One instance is scoped to a single bucket. The processor only ever needs
/// whole-object operations, so there is no streaming or ranged access here.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the user metadata of an object.
    ///
    /// Returns `Ok(None)` when the object does not exist and an empty map when
    /// it exists without user metadata.
    async fn get_metadata(&self, key: &ObjectKey) -> StorageResult<Option<ObjectMetadata>>;

    /// Download an object's bytes, undoing any gzip transport encoding.
    async fn download(&self, key: &ObjectKey) -> StorageResult<Vec<u8>>;

    /// Upload bytes to a key, replacing the object and its metadata.
    async fn upload(
        &self,
        key: &ObjectKey,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<()>;

    /// Merge `metadata` into the object's user metadata.
    async fn set_metadata(&self, key: &ObjectKey, metadata: &ObjectMetadata)
        -> StorageResult<()>;

    /// Move an object, replacing whatever exists at `to`. Metadata moves with it.
    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &ObjectKey) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Download an object into a local file, returning the number of bytes
    /// written. Failures writing `destination` are [`StorageError::LocalFile`].
    async fn download_to_file(&self, key: &ObjectKey, destination: &Path) -> StorageResult<u64> {
        let data = self.download(key).await?;
        let size = data.len() as u64;
        fs::write(destination, data)
            .await
            .map_err(|source| StorageError::LocalFile {
                path: destination.to_path_buf(),
                source,
            })?;
        Ok(size)
    }

    /// Upload the contents of a local file, returning the number of bytes
    /// read. Failures reading `source` are [`StorageError::LocalFile`].
    async fn upload_file(
        &self,
        source: &Path,
        key: &ObjectKey,
        options: &UploadOptions,
    ) -> StorageResult<u64> {
        let data = fs::read(source)
            .await
            .map_err(|e| StorageError::LocalFile {
                path: source.to_path_buf(),
                source: e,
            })?;
        let size = data.len() as u64;
        self.upload(key, data, options).await?;
        Ok(size)
    }
}

/// Resolves bucket names into bucket-scoped storage handles.
#[async_trait]
pub trait BucketProvider: Send + Sync {
    async fn bucket(&self, name: &str) -> StorageResult<Arc<dyn Storage>>;
}

/// Bucket names end up in filesystem paths and URLs; keep them to one segment.
pub(crate) fn validate_bucket_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(StorageError::InvalidBucket(format!("{:?}", name)));
    }
    Ok(())
}
