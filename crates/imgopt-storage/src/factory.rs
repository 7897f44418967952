#[cfg(feature = "storage-local")]
use crate::LocalBucketProvider;
#[cfg(feature = "storage-memory")]
use crate::MemoryBucketProvider;
#[cfg(feature = "storage-s3")]
use crate::S3BucketProvider;
use crate::{BucketProvider, StorageBackend, StorageError, StorageResult};
use imgopt_core::StorageConfig;
use std::sync::Arc;

/// Create a bucket provider based on configuration
pub fn create_bucket_provider(config: &StorageConfig) -> StorageResult<Arc<dyn BucketProvider>> {
    match config.backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            Ok(Arc::new(S3BucketProvider::new(
                region,
                config.s3_endpoint.clone(),
                config.validate_checksums,
            )))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            Ok(Arc::new(LocalBucketProvider::new(base_path)))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => Ok(Arc::new(MemoryBucketProvider::new())),

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)".to_string(),
        )),
    }
}
