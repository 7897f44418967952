//! Fault reporting
//!
//! Faults the processor cannot express as an outcome are captured as
//! [`FaultReport`]s and handed to an [`ErrorReporter`], which must be flushed
//! before the fault propagates to the caller.

#[cfg(feature = "reporting")]
mod http;

#[cfg(feature = "reporting")]
pub use http::{create_error_reporter, HttpErrorReporter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Sink for fault reports.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Queue a report for delivery.
    async fn capture(&self, report: FaultReport);

    /// Deliver queued reports, giving up after `timeout`. Returns `true` when
    /// everything queued was delivered.
    async fn flush(&self, timeout: Duration) -> bool;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
}

/// A single captured fault
#[derive(Debug, Clone, Serialize)]
pub struct FaultReport {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// `Display` of the error followed by each of its sources.
    pub chain: Vec<String>,
    pub tags: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FaultReport {
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = vec![error.to_string()];
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level: Level::Error,
            message: error.to_string(),
            chain,
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
