use super::{ErrorReporter, FaultReport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use imgopt_core::ReportingConfig;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Posts fault reports as JSON to a DSN URL.
///
/// Reports are buffered by [`ErrorReporter::capture`] and only sent on
/// [`ErrorReporter::flush`], so the caller decides how long delivery may take.
pub struct HttpErrorReporter {
    http_client: Client,
    dsn: String,
    release: String,
    bucket_tag: Option<String>,
    server_name: Option<String>,
    pending: Mutex<Vec<FaultReport>>,
}

impl HttpErrorReporter {
    pub fn new(dsn: String, release: String, bucket_tag: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for error reporting")?;

        let server_name = hostname::get()
            .ok()
            .map(|name| name.to_string_lossy().into_owned());

        Ok(Self {
            http_client,
            dsn,
            release,
            bucket_tag,
            server_name,
            pending: Mutex::new(Vec::new()),
        })
    }

    fn decorate(&self, mut report: FaultReport) -> FaultReport {
        report
            .tags
            .entry("release".to_string())
            .or_insert_with(|| self.release.clone());
        if let Some(bucket) = &self.bucket_tag {
            report
                .tags
                .entry("bucket".to_string())
                .or_insert_with(|| bucket.clone());
        }
        if let Some(server_name) = &self.server_name {
            report
                .tags
                .entry("server_name".to_string())
                .or_insert_with(|| server_name.clone());
        }
        report
    }

    async fn send(&self, report: &FaultReport) -> Result<()> {
        self.http_client
            .post(&self.dsn)
            .json(report)
            .send()
            .await
            .context("Failed to send fault report")?
            .error_for_status()
            .context("Error sink rejected fault report")?;
        Ok(())
    }

    async fn deliver_pending(&self) -> bool {
        let reports: Vec<FaultReport> = std::mem::take(&mut *self.pending.lock().await);
        let mut delivered = true;

        for report in reports {
            if let Err(e) = self.send(&report).await {
                tracing::warn!(
                    error = %e,
                    report_id = %report.event_id,
                    "Fault report delivery failed"
                );
                delivered = false;
            }
        }

        delivered
    }
}

#[async_trait]
impl ErrorReporter for HttpErrorReporter {
    async fn capture(&self, report: FaultReport) {
        let report = self.decorate(report);
        tracing::debug!(report_id = %report.event_id, message = %report.message, "Fault captured");
        self.pending.lock().await.push(report);
    }

    async fn flush(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.deliver_pending()).await {
            Ok(delivered) => delivered,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Fault report flush timed out"
                );
                false
            }
        }
    }
}

/// Build the reporter described by `config`; `None` when no DSN is configured.
pub fn create_error_reporter(config: &ReportingConfig) -> Result<Option<Arc<dyn ErrorReporter>>> {
    let Some(dsn) = config.dsn.clone() else {
        return Ok(None);
    };

    let reporter = HttpErrorReporter::new(dsn, config.release.clone(), config.bucket_tag.clone())?;
    Ok(Some(Arc::new(reporter)))
}
