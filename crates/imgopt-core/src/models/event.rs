use serde::{Deserialize, Serialize};

/// Storage-change notification for a single object.
///
/// `id` encodes `<bucket>/<object path>/<generation>`. The declared
/// `content_type` comes from whoever uploaded the object and is trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEvent {
    pub id: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl ObjectEvent {
    pub fn new(
        id: impl Into<String>,
        bucket: impl Into<String>,
        content_type: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            bucket: bucket.into(),
            content_type: content_type.map(String::from),
        }
    }
}
