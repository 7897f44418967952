use imgopt_storage::StorageError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Step in which an unmodelled fault happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scratch,
    Transform,
    Marker,
    Move,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Scratch => "scratch",
            Stage::Transform => "transform",
            Stage::Marker => "marker",
            Stage::Move => "move",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A fault: something went wrong that is not one of the modelled outcomes.
///
/// Faults are reported to the error sink and returned to the caller so the
/// event is redelivered.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{stage} step failed for {path}")]
    Storage {
        stage: Stage,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("{stage} step failed for {path}")]
    Io {
        stage: Stage,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} task failed for {path}")]
    Task {
        stage: Stage,
        path: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl HandlerError {
    pub fn stage(&self) -> Stage {
        match self {
            HandlerError::Storage { stage, .. }
            | HandlerError::Io { stage, .. }
            | HandlerError::Task { stage, .. } => *stage,
        }
    }

    /// Canonical path of the object being processed.
    pub fn path(&self) -> &str {
        match self {
            HandlerError::Storage { path, .. }
            | HandlerError::Io { path, .. }
            | HandlerError::Task { path, .. } => path,
        }
    }
}
