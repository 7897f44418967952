//! Processed-marker guard

use crate::retry::{retry, RetryPolicy};
use imgopt_storage::{ObjectKey, ObjectMetadata, Storage, StorageResult};

/// Whether `metadata` carries the processed marker under `marker_key`.
///
/// Metadata values are strings on every backend, so `"true"` (any case) and
/// `"1"` both count.
pub fn marker_is_set(metadata: &ObjectMetadata, marker_key: &str) -> bool {
    metadata
        .get(marker_key)
        .map(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("true") || value == "1"
        })
        .unwrap_or(false)
}

/// Check whether the object at `canonical` has already been optimized.
///
/// A missing object or an object without metadata counts as not processed.
/// Fetch failures are retried per `policy`; the last error is returned once
/// the policy is exhausted.
pub async fn check_processed(
    storage: &dyn Storage,
    canonical: &ObjectKey,
    marker_key: &str,
    policy: &RetryPolicy,
) -> StorageResult<bool> {
    let metadata = retry(policy, "get_metadata", move || storage.get_metadata(canonical)).await?;

    Ok(metadata
        .map(|metadata| marker_is_set(&metadata, marker_key))
        .unwrap_or(false))
}
