use crate::encoding::{gunzip, gzip, GZIP};
use crate::traits::{
    validate_bucket_name, BucketProvider, ObjectMetadata, Storage, StorageError, StorageResult,
    UploadOptions,
};
use crate::{ObjectKey, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    content_encoding: Option<String>,
    metadata: ObjectMetadata,
}

/// In-memory bucket. Used by tests and by `STORAGE_BACKEND=memory` for dry runs.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<ObjectKey, StoredObject>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object with explicit metadata.
    pub fn insert(
        &self,
        key: &ObjectKey,
        data: impl Into<Bytes>,
        content_type: Option<&str>,
        metadata: ObjectMetadata,
    ) -> StorageResult<()> {
        let mut objects = self.write()?;
        objects.insert(
            key.clone(),
            StoredObject {
                data: data.into(),
                content_type: content_type.map(str::to_string),
                content_encoding: None,
                metadata,
            },
        );
        Ok(())
    }

    /// Stored bytes as written, without undoing transport encoding.
    pub fn raw(&self, key: &ObjectKey) -> Option<Bytes> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).map(|o| o.data.clone()))
    }

    pub fn content_type(&self, key: &ObjectKey) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).and_then(|o| o.content_type.clone()))
    }

    pub fn content_encoding(&self, key: &ObjectKey) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).and_then(|o| o.content_encoding.clone()))
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self
            .objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn read(
        &self,
    ) -> StorageResult<std::sync::RwLockReadGuard<'_, HashMap<ObjectKey, StoredObject>>> {
        self.objects
            .read()
            .map_err(|_| StorageError::BackendError("memory storage lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> StorageResult<std::sync::RwLockWriteGuard<'_, HashMap<ObjectKey, StoredObject>>> {
        self.objects
            .write()
            .map_err(|_| StorageError::BackendError("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_metadata(&self, key: &ObjectKey) -> StorageResult<Option<ObjectMetadata>> {
        Ok(self.read()?.get(key).map(|o| o.metadata.clone()))
    }

    async fn download(&self, key: &ObjectKey) -> StorageResult<Vec<u8>> {
        let object = self
            .read()?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        match object.content_encoding.as_deref() {
            Some(GZIP) => {
                gunzip(&object.data).map_err(|e| StorageError::DownloadFailed(e.to_string()))
            }
            _ => Ok(object.data.to_vec()),
        }
    }

    async fn upload(
        &self,
        key: &ObjectKey,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<()> {
        let (data, content_encoding) = if options.gzip {
            let encoded = gzip(&data).map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            (encoded, Some(GZIP.to_string()))
        } else {
            (data, None)
        };

        self.write()?.insert(
            key.clone(),
            StoredObject {
                data: Bytes::from(data),
                content_type: options.content_type.clone(),
                content_encoding,
                metadata: ObjectMetadata::new(),
            },
        );

        tracing::debug!(key = %key, "Memory storage upload successful");
        Ok(())
    }

    async fn set_metadata(
        &self,
        key: &ObjectKey,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let mut objects = self.write()?;
        let object = objects
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        object
            .metadata
            .extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StorageResult<()> {
        let mut objects = self.write()?;
        let object = objects
            .remove(from)
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        objects.insert(to.clone(), object);

        tracing::debug!(from_key = %from, to_key = %to, "Memory storage move successful");
        Ok(())
    }

    async fn exists(&self, key: &ObjectKey) -> StorageResult<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Named in-memory buckets, created on first use.
#[derive(Clone, Default)]
pub struct MemoryBucketProvider {
    buckets: Arc<RwLock<HashMap<String, MemoryStorage>>>,
}

impl MemoryBucketProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the bucket `name` with its concrete type, for seeding and
    /// inspecting in tests.
    pub fn memory_bucket(&self, name: &str) -> StorageResult<MemoryStorage> {
        validate_bucket_name(name)?;
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| StorageError::BackendError("memory storage lock poisoned".to_string()))?;
        Ok(buckets.entry(name.to_string()).or_default().clone())
    }
}

#[async_trait]
impl BucketProvider for MemoryBucketProvider {
    async fn bucket(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        Ok(Arc::new(self.memory_bucket(name)?))
    }
}
