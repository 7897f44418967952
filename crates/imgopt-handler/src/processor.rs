use crate::error::{HandlerError, Stage};
use crate::filter::{is_eligible, Eligibility};
use crate::guard::check_processed;
use crate::paths::derive_paths;
use crate::pipeline::{Interrupt, Pipeline};
use crate::retry::RetryPolicy;
use crate::scratch::ScratchFile;
use imgopt_core::constants::DEFAULT_ERROR_FLUSH_TIMEOUT_MS;
use imgopt_core::{FailureKind, ObjectEvent, Outcome, ProcessorConfig, SkipReason};
use imgopt_infra::{ErrorReporter, FaultReport};
use imgopt_processing::ImageOptimizer;
use imgopt_storage::{BucketProvider, UploadOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::Instrument;
use uuid::Uuid;

/// Runs the optimization workflow for one storage event at a time.
///
/// The processor holds no per-object state; concurrent calls to
/// [`ObjectProcessor::handle`] share only the immutable configuration and
/// the injected collaborators.
#[derive(Clone)]
pub struct ObjectProcessor {
    config: Arc<ProcessorConfig>,
    buckets: Arc<dyn BucketProvider>,
    optimizer: Arc<dyn ImageOptimizer>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    flush_timeout: Duration,
}

impl ObjectProcessor {
    pub fn new(
        config: Arc<ProcessorConfig>,
        buckets: Arc<dyn BucketProvider>,
        optimizer: Arc<dyn ImageOptimizer>,
    ) -> Self {
        Self {
            config,
            buckets,
            optimizer,
            reporter: None,
            flush_timeout: Duration::from_millis(DEFAULT_ERROR_FLUSH_TIMEOUT_MS),
        }
    }

    /// Report faults to `reporter`, waiting at most `flush_timeout` for delivery.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>, flush_timeout: Duration) -> Self {
        self.reporter = Some(reporter);
        self.flush_timeout = flush_timeout;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Handle one event.
    ///
    /// Skips and modelled failures come back as `Ok(outcome)`. Faults are
    /// reported and flushed before being returned as `Err`, which tells the
    /// transport to redeliver.
    pub async fn handle(&self, event: &ObjectEvent) -> Result<Outcome, HandlerError> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "invocation",
            event_id = %event.id,
            invocation_id = %invocation_id,
        );

        async {
            let result = self.process(event, invocation_id).await;
            if let Err(fault) = &result {
                tracing::error!(
                    error = %fault,
                    stage = %fault.stage(),
                    path = %fault.path(),
                    "Object processing faulted"
                );
                self.report(event, invocation_id, fault).await;
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        event: &ObjectEvent,
        invocation_id: Uuid,
    ) -> Result<Outcome, HandlerError> {
        let start = Instant::now();

        if let Eligibility::Rejected(reason) = is_eligible(event, &self.config) {
            match reason {
                SkipReason::TemporaryPath => tracing::info!(
                    id = %event.id,
                    temp_dir = %self.config.temp_dir,
                    "Skipping object under the working directory"
                ),
                _ => tracing::info!(
                    id = %event.id,
                    content_type = ?event.content_type,
                    "Skipping unsupported content type"
                ),
            }
            return Ok(Outcome::Skipped(reason));
        }

        let paths = match derive_paths(&event.id, &event.bucket, invocation_id, &self.config) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(id = %event.id, error = %e, "Cannot derive object path");
                return Ok(Outcome::Failed(FailureKind::FileLookup));
            }
        };

        let storage = match self.buckets.bucket(&event.bucket).await {
            Ok(storage) => storage,
            Err(e) => {
                tracing::warn!(
                    path = %paths.canonical,
                    bucket = %event.bucket,
                    error = %e,
                    "Cannot resolve bucket"
                );
                return Ok(Outcome::Failed(FailureKind::FileLookup));
            }
        };

        let policy = RetryPolicy::new(
            self.config.metadata_retry_attempts,
            self.config.metadata_retry_delay(),
        );
        match check_processed(
            storage.as_ref(),
            &paths.canonical,
            &self.config.marker_key,
            &policy,
        )
        .await
        {
            Ok(true) => {
                tracing::info!(
                    path = %paths.canonical,
                    marker = %self.config.marker_key,
                    "Skipping object that is already optimized"
                );
                return Ok(Outcome::Skipped(SkipReason::AlreadyProcessed));
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    path = %paths.canonical,
                    error = %e,
                    attempts = policy.attempts,
                    "Cannot read object metadata"
                );
                return Ok(Outcome::Failed(FailureKind::Metadata));
            }
        }

        fs::create_dir_all(&self.config.scratch_dir)
            .await
            .map_err(|source| HandlerError::Io {
                stage: Stage::Scratch,
                path: paths.canonical.to_string(),
                source,
            })?;
        let scratch = ScratchFile::new(&paths.scratch);

        let pipeline = Pipeline {
            storage: storage.as_ref(),
            paths: &paths,
            optimizer: self.optimizer.clone(),
            upload_options: UploadOptions {
                content_type: event.content_type.clone(),
                gzip: self.config.upload_gzip,
            },
            marker_key: &self.config.marker_key,
        };

        let steps = async {
            let downloaded = pipeline.fetch().await?;
            tracing::debug!(path = %paths.canonical, size_bytes = downloaded, "Object fetched");

            let (input_bytes, output_bytes) = pipeline.transform().await?;
            tracing::debug!(
                path = %paths.canonical,
                input_bytes,
                output_bytes,
                "Object transformed"
            );

            pipeline.publish().await?;
            Ok::<_, Interrupt>((input_bytes, output_bytes))
        };

        let result = steps.await;
        scratch.remove().await;

        match result {
            Ok((input_bytes, output_bytes)) => {
                tracing::info!(
                    path = %paths.canonical,
                    input_bytes,
                    output_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object optimized"
                );
                Ok(Outcome::Success)
            }
            Err(Interrupt::Failed(kind, reason)) => {
                tracing::warn!(
                    path = %paths.canonical,
                    failure = %kind,
                    reason = %reason,
                    "Object processing failed"
                );
                Ok(Outcome::Failed(kind))
            }
            Err(Interrupt::Fault(fault)) => Err(fault),
        }
    }

    async fn report(&self, event: &ObjectEvent, invocation_id: Uuid, fault: &HandlerError) {
        let Some(reporter) = &self.reporter else {
            return;
        };

        let report = FaultReport::from_error(fault)
            .with_tag("stage", fault.stage().as_str())
            .with_tag("bucket", event.bucket.clone())
            .with_extra("event_id", event.id.clone())
            .with_extra("invocation_id", invocation_id.to_string())
            .with_extra("path", fault.path());

        reporter.capture(report).await;
        if !reporter.flush(self.flush_timeout).await {
            tracing::warn!(
                timeout_ms = self.flush_timeout.as_millis() as u64,
                "Fault report was not delivered"
            );
        }
    }
}
