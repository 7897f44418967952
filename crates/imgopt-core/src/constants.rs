//! Exit codes and processing defaults.
//!
//! Exit codes are bit flags so that a supervisor can mask whole groups of
//! outcomes (e.g. every skip) with one comparison.

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_TEMPORARY: u8 = 1 << 0;
pub const EXIT_CONTENT_TYPE: u8 = 1 << 1;
pub const EXIT_FILE_ERROR: u8 = 1 << 2;
pub const EXIT_ALREADY_PROCESSED: u8 = 1 << 3;
pub const EXIT_DOWNLOAD_ERROR: u8 = 1 << 4;
pub const EXIT_METADATA_ERROR: u8 = 1 << 5;
pub const EXIT_TRANSFORM_ERROR: u8 = 1 << 6;
pub const EXIT_UPLOAD_ERROR: u8 = 1 << 7;

/// Content types the optimizer accepts. Matched exactly, case-sensitive.
pub const DEFAULT_SUPPORTED_CONTENT_TYPES: [&str; 4] =
    ["image/bmp", "image/jpeg", "image/tiff", "image/png"];

/// Reserved bucket directory holding in-flight working copies.
pub const DEFAULT_BUCKET_TEMP_DIR: &str = "tmp-sharp";

/// User-metadata key recording that an object has been optimized.
pub const DEFAULT_MARKER_KEY: &str = "sharped";

/// Value written for the processed marker.
pub const MARKER_VALUE: &str = "true";

pub const DEFAULT_METADATA_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_ERROR_FLUSH_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
