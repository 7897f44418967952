use crate::traits::{
    validate_bucket_name, BucketProvider, ObjectMetadata, Storage, StorageError, StorageResult,
    UploadOptions,
};
use crate::{ObjectKey, StorageBackend};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Directory (relative to the bucket root) holding metadata sidecars.
const METADATA_DIR: &str = ".metadata";

/// Local filesystem storage for a single bucket.
///
/// Object bytes live at `<base>/<key>`, user metadata at
/// `<base>/.metadata/<key>.json`. Keys whose first segment is `.metadata`
/// are rejected so objects and sidecars never collide.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert an object key to a filesystem path.
    ///
    /// `ObjectKey` already rules out `..`, empty segments and absolute keys, so
    /// the joined path always stays under `base_path`.
    fn key_to_path(&self, key: &ObjectKey) -> StorageResult<PathBuf> {
        if key.first_segment() == METADATA_DIR {
            return Err(StorageError::InvalidKey(format!(
                "{} is reserved for metadata",
                key
            )));
        }
        Ok(self.base_path.join(key.as_str()))
    }

    fn sidecar_path(&self, key: &ObjectKey) -> PathBuf {
        self.base_path
            .join(METADATA_DIR)
            .join(format!("{}.json", key.as_str()))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read_sidecar(&self, key: &ObjectKey) -> StorageResult<ObjectMetadata> {
        let path = self.sidecar_path(key);
        match fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                StorageError::MetadataFailed(format!(
                    "Corrupt metadata file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ObjectMetadata::new()),
            Err(e) => Err(StorageError::MetadataFailed(format!(
                "Failed to read metadata file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_sidecar(&self, key: &ObjectKey, metadata: &ObjectMetadata) -> StorageResult<()> {
        let path = self.sidecar_path(key);
        self.ensure_parent_dir(&path).await?;

        let raw = serde_json::to_vec(metadata)
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;

        write_atomically(&path, &raw).await.map_err(|e| {
            StorageError::MetadataFailed(format!(
                "Failed to write metadata file {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn remove_if_present(path: &Path) -> std::io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Write to a uniquely named sibling, then rename over the target so readers
/// never observe a partially written file.
async fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let partial = path.with_file_name(format!(
        "{}.{}.partial",
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        Uuid::new_v4()
    ));

    let result = async {
        let mut file = fs::File::create(&partial).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&partial, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&partial).await;
    }
    result
}

#[async_trait]
impl Storage for LocalStorage {
    async fn get_metadata(&self, key: &ObjectKey) -> StorageResult<Option<ObjectMetadata>> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        self.read_sidecar(key).await.map(Some)
    }

    async fn download(&self, key: &ObjectKey) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn upload(
        &self,
        key: &ObjectKey,
        data: Vec<u8>,
        _options: &UploadOptions,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        write_atomically(&path, &data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        // A fresh upload starts without user metadata.
        Self::remove_if_present(&self.sidecar_path(key))
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn set_metadata(
        &self,
        key: &ObjectKey,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let mut merged = self.read_sidecar(key).await?;
        merged.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write_sidecar(key, &merged).await?;

        tracing::debug!(key = %key, fields = metadata.len(), "Local storage metadata updated");

        Ok(())
    }

    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StorageResult<()> {
        let from_path = self.key_to_path(from)?;
        let to_path = self.key_to_path(to)?;

        if !fs::try_exists(&from_path).await? {
            return Err(StorageError::NotFound(from.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            StorageError::MoveFailed(format!(
                "Failed to move {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        let from_sidecar = self.sidecar_path(from);
        let to_sidecar = self.sidecar_path(to);
        if fs::try_exists(&from_sidecar).await? {
            self.ensure_parent_dir(&to_sidecar).await?;
            fs::rename(&from_sidecar, &to_sidecar)
                .await
                .map_err(|e| StorageError::MoveFailed(e.to_string()))?;
        } else {
            Self::remove_if_present(&to_sidecar)
                .await
                .map_err(|e| StorageError::MoveFailed(e.to_string()))?;
        }

        tracing::info!(
            from_key = %from,
            to_key = %to,
            from_path = %from_path.display(),
            to_path = %to_path.display(),
            "Local storage move successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &ObjectKey) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Maps bucket `name` to the directory `<root>/<name>`.
#[derive(Clone)]
pub struct LocalBucketProvider {
    root: PathBuf,
}

impl LocalBucketProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BucketProvider for LocalBucketProvider {
    async fn bucket(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        validate_bucket_name(name)?;
        let storage = LocalStorage::new(self.root.join(name)).await?;
        Ok(Arc::new(storage))
    }
}
