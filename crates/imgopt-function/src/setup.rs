//! Processor construction from configuration

use anyhow::{Context, Result};
use imgopt_core::Config;
use imgopt_handler::ObjectProcessor;
use imgopt_infra::create_error_reporter;
use imgopt_processing::Optimizer;
use imgopt_storage::create_bucket_provider;
use std::sync::Arc;

/// Build the processor with the configured storage backend, optimizer and
/// (when a DSN is set) error reporter.
pub fn build_processor(config: &Config) -> Result<ObjectProcessor> {
    let buckets = create_bucket_provider(&config.storage)
        .context("Failed to initialize storage backend")?;
    let optimizer = Arc::new(Optimizer::new(config.processor.jpeg_quality));

    let mut processor =
        ObjectProcessor::new(Arc::new(config.processor.clone()), buckets, optimizer);

    match create_error_reporter(&config.reporting).context("Failed to initialize error reporter")? {
        Some(reporter) => {
            processor = processor.with_reporter(reporter, config.reporting.flush_timeout());
            tracing::info!(release = %config.reporting.release, "Error reporting enabled");
        }
        None => tracing::info!("Error reporting disabled (no DSN configured)"),
    }

    tracing::info!(
        backend = %config.storage.backend,
        content_types = %config.processor.supported_content_types.join(","),
        temp_dir = %config.processor.temp_dir,
        marker = %config.processor.marker_key,
        jpeg_quality = config.processor.jpeg_quality,
        "Processor initialized"
    );

    Ok(processor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgopt_core::{ProcessorConfig, ReportingConfig, ServerConfig, StorageConfig};

    fn memory_config() -> Config {
        Config {
            processor: ProcessorConfig::default(),
            storage: StorageConfig::memory(),
            reporting: ReportingConfig {
                release: "test".to_string(),
                dsn: None,
                bucket_tag: None,
                flush_timeout_ms: 2000,
            },
            server: ServerConfig {
                port: 0,
                invocation_timeout_secs: 0,
                log_json: false,
            },
        }
    }

    #[test]
    fn test_build_with_memory_backend() {
        let config = memory_config();
        let processor = build_processor(&config).unwrap();
        assert_eq!(processor.config().marker_key, "sharped");
    }

    #[test]
    fn test_build_fails_without_s3_region() {
        let mut config = memory_config();
        config.storage = StorageConfig {
            backend: imgopt_core::StorageBackend::S3,
            ..StorageConfig::memory()
        };
        assert!(build_processor(&config).is_err());
    }

    #[test]
    fn test_build_with_reporting_enabled() {
        let mut config = memory_config();
        config.reporting.dsn = Some("http://127.0.0.1:9/report".to_string());
        assert!(build_processor(&config).is_ok());
    }
}
