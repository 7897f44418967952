use thiserror::Error;

/// Errors raised while optimizing an image
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to carry image metadata: {0}")]
    Metadata(String),
}

#[cfg(feature = "image")]
impl From<image::ImageError> for OptimizeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => OptimizeError::UnsupportedFormat(e.to_string()),
            image::ImageError::Encoding(e) => OptimizeError::Encode(e.to_string()),
            other => OptimizeError::Decode(other.to_string()),
        }
    }
}
