use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{StorageError, StorageResult};

/// Validated object key inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Parse a key, rejecting anything that could escape the bucket or that
    /// backends would silently normalise (empty segments, `.` and `..`).
    pub fn parse(key: impl Into<String>) -> StorageResult<Self> {
        let key = key.into();

        if key.is_empty() {
            return Err(StorageError::InvalidKey("key is empty".to_string()));
        }

        if key.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "{key} has a leading '/'"
            )));
        }

        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(StorageError::InvalidKey(format!(
                "{key} contains an empty, '.' or '..' segment"
            )));
        }

        Ok(ObjectKey(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// First path segment.
    pub fn first_segment(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
