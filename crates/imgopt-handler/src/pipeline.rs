//! Fetch, transform and publish steps

use crate::error::{HandlerError, Stage};
use crate::paths::ObjectPaths;
use imgopt_core::constants::MARKER_VALUE;
use imgopt_core::FailureKind;
use imgopt_processing::ImageOptimizer;
use imgopt_storage::{ObjectMetadata, Storage, StorageError, UploadOptions};
use std::sync::Arc;
use tokio::fs;

/// Why the pipeline stopped early
#[derive(Debug)]
pub(crate) enum Interrupt {
    /// A modelled failure, with a human-readable reason.
    Failed(FailureKind, String),
    Fault(HandlerError),
}

pub(crate) struct Pipeline<'a> {
    pub storage: &'a dyn Storage,
    pub paths: &'a ObjectPaths,
    pub optimizer: Arc<dyn ImageOptimizer>,
    pub upload_options: UploadOptions,
    pub marker_key: &'a str,
}

impl Pipeline<'_> {
    fn canonical(&self) -> String {
        self.paths.canonical.to_string()
    }

    fn scratch_fault(&self, source: std::io::Error) -> Interrupt {
        Interrupt::Fault(HandlerError::Io {
            stage: Stage::Scratch,
            path: self.canonical(),
            source,
        })
    }

    /// Remote errors are modelled failures; the scratch file side of a
    /// transfer is local I/O and faults.
    fn storage_failure(&self, kind: FailureKind, error: StorageError) -> Interrupt {
        match error {
            StorageError::LocalFile { source, .. } => self.scratch_fault(source),
            other => Interrupt::Failed(kind, other.to_string()),
        }
    }

    /// Download the canonical object into the scratch file.
    pub async fn fetch(&self) -> Result<u64, Interrupt> {
        self.storage
            .download_to_file(&self.paths.canonical, &self.paths.scratch)
            .await
            .map_err(|e| self.storage_failure(FailureKind::Download, e))
    }

    /// Optimize the scratch file in place, on the blocking pool.
    pub async fn transform(&self) -> Result<(u64, u64), Interrupt> {
        let data = fs::read(&self.paths.scratch)
            .await
            .map_err(|e| self.scratch_fault(e))?;
        let input_size = data.len() as u64;

        let optimizer = self.optimizer.clone();
        let optimized = tokio::task::spawn_blocking(move || optimizer.optimize(&data, true))
            .await
            .map_err(|source| {
                Interrupt::Fault(HandlerError::Task {
                    stage: Stage::Transform,
                    path: self.canonical(),
                    source,
                })
            })?
            .map_err(|e| Interrupt::Failed(FailureKind::Transform, e.to_string()))?;
        let output_size = optimized.len() as u64;

        fs::write(&self.paths.scratch, optimized)
            .await
            .map_err(|e| self.scratch_fault(e))?;

        Ok((input_size, output_size))
    }

    /// Upload to the working path, mark it, then move it over the canonical
    /// object. The move is the commit point.
    pub async fn publish(&self) -> Result<(), Interrupt> {
        self.storage
            .upload_file(&self.paths.scratch, &self.paths.working, &self.upload_options)
            .await
            .map_err(|e| self.storage_failure(FailureKind::Upload, e))?;

        let marker =
            ObjectMetadata::from([(self.marker_key.to_string(), MARKER_VALUE.to_string())]);
        self.storage
            .set_metadata(&self.paths.working, &marker)
            .await
            .map_err(|source| {
                Interrupt::Fault(HandlerError::Storage {
                    stage: Stage::Marker,
                    path: self.canonical(),
                    source,
                })
            })?;

        self.storage
            .rename(&self.paths.working, &self.paths.canonical)
            .await
            .map_err(|source| {
                Interrupt::Fault(HandlerError::Storage {
                    stage: Stage::Move,
                    path: self.canonical(),
                    source,
                })
            })?;

        Ok(())
    }
}
