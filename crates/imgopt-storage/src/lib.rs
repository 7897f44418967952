//! imgopt Storage Library
//!
//! This crate provides the object-store abstraction used by the processor and
//! its S3, local filesystem and in-memory implementations.
//!
//! # Keys and buckets
//!
//! A [`BucketProvider`] resolves a bucket name into a [`Storage`] handle scoped
//! to that bucket. Object keys inside a bucket are validated [`ObjectKey`]s:
//! non-empty, `/`-separated, no leading `/`, no empty or `.`/`..` segments.
//!
//! # Metadata
//!
//! Every backend keeps a string-to-string user-metadata map per object.
//! Uploading an object replaces its metadata, moving it carries the metadata
//! along.

pub(crate) mod encoding;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_bucket_provider;
pub use imgopt_core::StorageBackend;
pub use keys::ObjectKey;
#[cfg(feature = "storage-local")]
pub use local::{LocalBucketProvider, LocalStorage};
#[cfg(feature = "storage-memory")]
pub use memory::{MemoryBucketProvider, MemoryStorage};
#[cfg(feature = "storage-s3")]
pub use s3::{S3BucketProvider, S3Storage};
pub use traits::{
    BucketProvider, ObjectMetadata, Storage, StorageError, StorageResult, UploadOptions,
};
