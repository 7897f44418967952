use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::*;

/// Why an event was deliberately not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The object lives under the reserved working directory.
    TemporaryPath,
    /// The declared content type is not in the allow-list.
    UnsupportedContentType,
    /// The object already carries the processed marker.
    AlreadyProcessed,
}

/// Pipeline stage that failed in a modelled way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FileLookup,
    Metadata,
    Download,
    Transform,
    Upload,
}

/// Terminal result of one invocation.
///
/// Unmodelled faults are not outcomes; they surface as errors from the
/// handler so the delivering transport can retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Skipped(SkipReason),
    Failed(FailureKind),
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Success => EXIT_SUCCESS,
            Outcome::Skipped(SkipReason::TemporaryPath) => EXIT_TEMPORARY,
            Outcome::Skipped(SkipReason::UnsupportedContentType) => EXIT_CONTENT_TYPE,
            Outcome::Skipped(SkipReason::AlreadyProcessed) => EXIT_ALREADY_PROCESSED,
            Outcome::Failed(FailureKind::FileLookup) => EXIT_FILE_ERROR,
            Outcome::Failed(FailureKind::Download) => EXIT_DOWNLOAD_ERROR,
            Outcome::Failed(FailureKind::Metadata) => EXIT_METADATA_ERROR,
            Outcome::Failed(FailureKind::Transform) => EXIT_TRANSFORM_ERROR,
            Outcome::Failed(FailureKind::Upload) => EXIT_UPLOAD_ERROR,
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SkipReason::TemporaryPath => write!(f, "temporary path"),
            SkipReason::UnsupportedContentType => write!(f, "unsupported content type"),
            SkipReason::AlreadyProcessed => write!(f, "already processed"),
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FailureKind::FileLookup => write!(f, "file lookup error"),
            FailureKind::Metadata => write!(f, "metadata error"),
            FailureKind::Download => write!(f, "download error"),
            FailureKind::Transform => write!(f, "transform error"),
            FailureKind::Upload => write!(f, "upload error"),
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            Outcome::Failed(kind) => write!(f, "failed ({})", kind),
        }
    }
}
