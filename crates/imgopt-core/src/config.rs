//! Configuration module
//!
//! Everything is read once at process start. The handler only ever sees the
//! immutable [`ProcessorConfig`]; the remaining sections configure the storage
//! backend, error reporting and the HTTP front end.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BUCKET_TEMP_DIR, DEFAULT_ERROR_FLUSH_TIMEOUT_MS, DEFAULT_JPEG_QUALITY,
    DEFAULT_MARKER_KEY, DEFAULT_METADATA_RETRY_ATTEMPTS, DEFAULT_SUPPORTED_CONTENT_TYPES,
};
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 8080;

/// Settings consumed by the object processor.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// Exact, case-sensitive content-type allow-list.
    pub supported_content_types: Vec<String>,
    /// Reserved bucket directory for working copies.
    pub temp_dir: String,
    pub marker_key: String,
    pub metadata_retry_attempts: u32,
    pub metadata_retry_delay_ms: u64,
    /// Local directory that holds per-invocation scratch files.
    pub scratch_dir: PathBuf,
    pub upload_gzip: bool,
    pub jpeg_quality: u8,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            supported_content_types: DEFAULT_SUPPORTED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            temp_dir: DEFAULT_BUCKET_TEMP_DIR.to_string(),
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            metadata_retry_attempts: DEFAULT_METADATA_RETRY_ATTEMPTS,
            metadata_retry_delay_ms: 0,
            scratch_dir: env::temp_dir(),
            upload_gzip: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ProcessorConfig {
    pub fn metadata_retry_delay(&self) -> Duration {
        Duration::from_millis(self.metadata_retry_delay_ms)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.supported_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "SUPPORTED_CONTENT_TYPES must list at least one content type"
            ));
        }

        if self.temp_dir.is_empty() || self.temp_dir.contains('/') {
            return Err(anyhow::anyhow!(
                "BUCKET_TEMP_DIR must be a single non-empty path segment"
            ));
        }

        if self.marker_key.is_empty() {
            return Err(anyhow::anyhow!("PROCESSED_MARKER_KEY must not be empty"));
        }

        if self.metadata_retry_attempts == 0 {
            return Err(anyhow::anyhow!(
                "METADATA_RETRY_ATTEMPTS must be at least 1"
            ));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow::anyhow!("JPEG_QUALITY must be between 1 and 100"));
        }

        Ok(())
    }
}

/// Storage backend configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub validate_checksums: bool,
    pub local_storage_path: Option<String>,
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            s3_region: None,
            s3_endpoint: None,
            validate_checksums: true,
            local_storage_path: None,
        }
    }
}

/// Error reporting configuration. Reporting is enabled iff a DSN is set.
#[derive(Clone, Debug)]
pub struct ReportingConfig {
    pub release: String,
    pub dsn: Option<String>,
    /// Descriptive bucket tag attached to every report.
    pub bucket_tag: Option<String>,
    pub flush_timeout_ms: u64,
}

impl ReportingConfig {
    pub fn enabled(&self) -> bool {
        self.dsn.is_some()
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

/// HTTP front end and logging configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Per-invocation deadline; `0` disables it.
    pub invocation_timeout_secs: u64,
    pub log_json: bool,
}

impl ServerConfig {
    pub fn invocation_timeout(&self) -> Option<Duration> {
        (self.invocation_timeout_secs > 0)
            .then(|| Duration::from_secs(self.invocation_timeout_secs))
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub processor: ProcessorConfig,
    pub storage: StorageConfig,
    pub reporting: ReportingConfig,
    pub server: ServerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ProcessorConfig::default();

        let supported_content_types = lookup("SUPPORTED_CONTENT_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.supported_content_types);

        let processor = ProcessorConfig {
            supported_content_types,
            temp_dir: lookup("BUCKET_TEMP_DIR")
                .map(|s| s.trim().trim_matches('/').to_string())
                .unwrap_or(defaults.temp_dir),
            marker_key: lookup("PROCESSED_MARKER_KEY").unwrap_or(defaults.marker_key),
            metadata_retry_attempts: lookup("METADATA_RETRY_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.metadata_retry_attempts),
            metadata_retry_delay_ms: lookup("METADATA_RETRY_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.metadata_retry_delay_ms),
            scratch_dir: lookup("SCRATCH_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            upload_gzip: parse_bool(lookup("UPLOAD_GZIP"), defaults.upload_gzip),
            jpeg_quality: lookup("JPEG_QUALITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jpeg_quality),
        };

        let backend = match lookup("STORAGE_BACKEND") {
            Some(s) => s.parse()?,
            None => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            s3_region: lookup("S3_REGION").or_else(|| lookup("AWS_REGION")),
            s3_endpoint: lookup("S3_ENDPOINT").filter(|s| !s.is_empty()),
            validate_checksums: parse_bool(lookup("VALIDATE_CHECKSUMS"), true),
            local_storage_path: lookup("LOCAL_STORAGE_PATH").filter(|s| !s.is_empty()),
        };

        let reporting = ReportingConfig {
            release: lookup("RELEASE").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            dsn: lookup("ERROR_REPORTER_DSN").filter(|s| !s.is_empty()),
            bucket_tag: lookup("BUCKET").filter(|s| !s.is_empty()),
            flush_timeout_ms: lookup("ERROR_FLUSH_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ERROR_FLUSH_TIMEOUT_MS),
        };

        let server = ServerConfig {
            port: match lookup("PORT") {
                Some(s) => s
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                None => DEFAULT_PORT,
            },
            invocation_timeout_secs: lookup("INVOCATION_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            log_json: lookup("LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        let config = Config {
            processor,
            storage,
            reporting,
            server,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.processor.validate()?;

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|s| s.trim().to_lowercase())
        .and_then(|s| match s.as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("STORAGE_BACKEND", "memory")]).unwrap();

        assert_eq!(
            config.processor.supported_content_types,
            vec!["image/bmp", "image/jpeg", "image/tiff", "image/png"]
        );
        assert_eq!(config.processor.temp_dir, "tmp-sharp");
        assert_eq!(config.processor.marker_key, "sharped");
        assert_eq!(config.processor.metadata_retry_attempts, 5);
        assert_eq!(config.processor.metadata_retry_delay(), Duration::ZERO);
        assert!(!config.processor.upload_gzip);
        assert!(config.storage.validate_checksums);
        assert_eq!(config.reporting.flush_timeout(), Duration::from_millis(2000));
        assert!(!config.reporting.enabled());
        assert_eq!(config.server.port, 8080);
        assert!(config.server.invocation_timeout().is_none());
    }

    #[test]
    fn test_content_types_keep_case() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("SUPPORTED_CONTENT_TYPES", "image/png, Image/JPEG"),
        ])
        .unwrap();

        assert_eq!(
            config.processor.supported_content_types,
            vec!["image/png", "Image/JPEG"]
        );
    }

    #[test]
    fn test_s3_requires_region() {
        assert!(config_from(&[]).is_err());

        let config = config_from(&[("AWS_REGION", "eu-west-1")]).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.s3_region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_local_requires_path() {
        assert!(config_from(&[("STORAGE_BACKEND", "local")]).is_err());
        assert!(config_from(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/var/lib/imgopt")
        ])
        .is_ok());
    }

    #[test]
    fn test_reporting_enabled_by_dsn() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("ERROR_REPORTER_DSN", "https://errors.example.com/api/1/store"),
            ("RELEASE", "2024.03.1"),
            ("BUCKET", "cdn.example.com"),
        ])
        .unwrap();

        assert!(config.reporting.enabled());
        assert_eq!(config.reporting.release, "2024.03.1");
        assert_eq!(config.reporting.bucket_tag.as_deref(), Some("cdn.example.com"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("METADATA_RETRY_ATTEMPTS", "0")
        ])
        .is_err());
        assert!(config_from(&[("STORAGE_BACKEND", "memory"), ("BUCKET_TEMP_DIR", "a/b")]).is_err());
        assert!(config_from(&[("STORAGE_BACKEND", "memory"), ("JPEG_QUALITY", "0")]).is_err());
        assert!(config_from(&[("STORAGE_BACKEND", "memory"), ("PORT", "http")]).is_err());
        assert!(config_from(&[("STORAGE_BACKEND", "nfs")]).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(Some("TRUE".to_string()), false));
        assert!(!parse_bool(Some("0".to_string()), true));
        assert!(parse_bool(Some("maybe".to_string()), true));
        assert!(!parse_bool(None, false));
    }
}
