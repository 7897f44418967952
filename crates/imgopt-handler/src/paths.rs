use imgopt_core::ProcessorConfig;
use imgopt_storage::{ObjectKey, StorageResult};
use std::path::PathBuf;
use uuid::Uuid;

/// Every location one invocation touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPaths {
    /// Where the object lives and where the optimized copy ends up.
    pub canonical: ObjectKey,
    /// Working copy under the reserved directory.
    pub working: ObjectKey,
    /// Local scratch file, unique to the invocation.
    pub scratch: PathBuf,
}

/// Canonical object path for an event id.
///
/// Removes the first `<bucket>/`, then one trailing `/<digits>` generation
/// suffix, then surrounding whitespace. Other numeric segments stay.
pub fn canonical_path(raw_id: &str, bucket: &str) -> String {
    let without_bucket = if bucket.is_empty() {
        raw_id.to_string()
    } else {
        raw_id.replacen(&format!("{}/", bucket), "", 1)
    };

    let without_generation = match without_bucket.rfind('/') {
        Some(idx) => {
            let tail = &without_bucket[idx + 1..];
            if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                &without_bucket[..idx]
            } else {
                without_bucket.as_str()
            }
        }
        None => without_bucket.as_str(),
    };

    without_generation.trim().to_string()
}

/// Derive the canonical, working and scratch paths for one invocation.
///
/// Fails with `StorageError::InvalidKey` when the canonical path is not a
/// usable object key.
pub fn derive_paths(
    raw_id: &str,
    bucket: &str,
    invocation_id: Uuid,
    config: &ProcessorConfig,
) -> StorageResult<ObjectPaths> {
    let canonical = ObjectKey::parse(canonical_path(raw_id, bucket))?;
    let working = ObjectKey::parse(format!("{}/{}", config.temp_dir, canonical))?;
    let scratch = config
        .scratch_dir
        .join(format!("{}-{}", invocation_id, canonical.basename()));

    Ok(ObjectPaths {
        canonical,
        working,
        scratch,
    })
}
