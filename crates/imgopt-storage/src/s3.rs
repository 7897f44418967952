use crate::encoding::{gunzip, gzip, GZIP};
use crate::traits::{
    validate_bucket_name, BucketProvider, ObjectMetadata, Storage, StorageError, StorageResult,
    UploadOptions,
};
use crate::{ObjectKey, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder, Checksum};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectStore, ObjectStoreExt, PutOptions,
    PutPayload, Result as ObjectResult,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// S3 storage for a single bucket.
///
/// User metadata travels as `x-amz-meta-*` headers, which object_store exposes
/// as [`Attribute::Metadata`]. S3 cannot edit metadata in place, so
/// [`Storage::set_metadata`] rewrites the object with merged attributes.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `validate_checksums` - Send SHA-256 checksums with every write
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        validate_checksums: bool,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        if validate_checksums {
            builder = builder.with_checksum_algorithm(Checksum::SHA256);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage { store, bucket })
    }

    fn location(key: &ObjectKey) -> StorageResult<Path> {
        Path::parse(key.as_str()).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    fn user_metadata(attributes: &Attributes) -> ObjectMetadata {
        attributes
            .iter()
            .filter_map(|(attribute, value)| match attribute {
                Attribute::Metadata(name) => Some((name.to_string(), String::from(&**value))),
                _ => None,
            })
            .collect()
    }

    fn is_gzip(attributes: &Attributes) -> bool {
        attributes
            .get(&Attribute::ContentEncoding)
            .map(|value| value.eq_ignore_ascii_case(GZIP))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn get_metadata(&self, key: &ObjectKey) -> StorageResult<Option<ObjectMetadata>> {
        let location = Self::location(key)?;
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        match self.store.get_opts(&location, options).await {
            Ok(result) => Ok(Some(Self::user_metadata(&result.attributes))),
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 metadata lookup failed"
                );
                Err(StorageError::MetadataFailed(e.to_string()))
            }
        }
    }

    async fn download(&self, key: &ObjectKey) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let location = Self::location(key)?;

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let gzipped = Self::is_gzip(&result.attributes);
        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        let data = if gzipped {
            gunzip(&bytes).map_err(|e| StorageError::DownloadFailed(e.to_string()))?
        } else {
            bytes.to_vec()
        };

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(data)
    }

    async fn upload(
        &self,
        key: &ObjectKey,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<()> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        if let Some(content_type) = &options.content_type {
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.clone()),
            );
        }

        let data = if options.gzip {
            attributes.insert(Attribute::ContentEncoding, AttributeValue::from(GZIP));
            gzip(&data).map_err(|e| StorageError::UploadFailed(e.to_string()))?
        } else {
            data
        };
        let size = data.len() as u64;

        let put_options = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(Bytes::from(data)), put_options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            gzip = options.gzip,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn set_metadata(
        &self,
        key: &ObjectKey,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let current = self
            .store
            .get_opts(&location, GetOptions::default())
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
                other => StorageError::MetadataFailed(other.to_string()),
            })?;

        let mut attributes = current.attributes.clone();
        for (name, value) in metadata {
            attributes.insert(
                Attribute::Metadata(Cow::Owned(name.clone())),
                AttributeValue::from(value.clone()),
            );
        }

        let body = current
            .bytes()
            .await
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;

        let put_options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(body), put_options)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 metadata rewrite failed"
                );
                StorageError::MetadataFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            fields = metadata.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 metadata updated"
        );

        Ok(())
    }

    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let from_location = Self::location(from)?;
        let to_location = Self::location(to)?;

        let copy_result: ObjectResult<_> = self.store.copy(&from_location, &to_location).await;
        copy_result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(from.to_string()),
            other => StorageError::MoveFailed(other.to_string()),
        })?;

        let delete_result: ObjectResult<_> = self.store.delete(&from_location).await;
        delete_result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                from_key = %from,
                to_key = %to,
                "S3 move copied the object but failed to delete the source"
            );
            StorageError::MoveFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            from_key = %from,
            to_key = %to,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 move successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &ObjectKey) -> StorageResult<bool> {
        let location = Self::location(key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Hands out one cached [`S3Storage`] per bucket name.
pub struct S3BucketProvider {
    region: String,
    endpoint_url: Option<String>,
    validate_checksums: bool,
    buckets: Mutex<HashMap<String, Arc<S3Storage>>>,
}

impl S3BucketProvider {
    pub fn new(region: String, endpoint_url: Option<String>, validate_checksums: bool) -> Self {
        Self {
            region,
            endpoint_url,
            validate_checksums,
            buckets: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BucketProvider for S3BucketProvider {
    async fn bucket(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        validate_bucket_name(name)?;

        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| StorageError::BackendError("S3 bucket cache poisoned".to_string()))?;

        if let Some(storage) = buckets.get(name) {
            return Ok(storage.clone());
        }

        let storage = Arc::new(S3Storage::new(
            name.to_string(),
            self.region.clone(),
            self.endpoint_url.clone(),
            self.validate_checksums,
        )?);
        buckets.insert(name.to_string(), storage.clone());

        tracing::debug!(bucket = %name, region = %self.region, "S3 bucket client created");

        Ok(storage)
    }
}
