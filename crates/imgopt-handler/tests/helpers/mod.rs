//! Test helpers: a recording, fault-injecting storage wrapper, a bucket
//! provider around it, and generated image fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, Rgb, RgbImage};
use imgopt_core::ProcessorConfig;
use imgopt_handler::ObjectProcessor;
use imgopt_infra::{ErrorReporter, FaultReport};
use imgopt_processing::{ImageOptimizer, OptimizeError, Optimizer};
use imgopt_storage::{
    BucketProvider, MemoryStorage, ObjectKey, ObjectMetadata, Storage, StorageBackend,
    StorageError, StorageResult, UploadOptions,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BUCKET: &str = "cdn.example.com";

pub fn key(s: &str) -> ObjectKey {
    ObjectKey::parse(s).unwrap()
}

/// Storage call as observed by [`RecordingStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetMetadata(String),
    Download(String),
    Upload(String),
    SetMetadata(String),
    Rename(String, String),
}

/// Failures to inject into [`RecordingStorage`]
#[derive(Debug, Default)]
pub struct Faults {
    /// Number of leading `get_metadata` calls that fail.
    pub get_metadata: u32,
    pub download: bool,
    pub upload: bool,
    pub set_metadata: bool,
    pub rename: bool,
}

/// Memory storage that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingStorage {
    pub inner: MemoryStorage,
    calls: Mutex<Vec<Call>>,
    faults: Mutex<Faults>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock().unwrap() = faults;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// Snapshot of every object: key, stored bytes and metadata.
    pub async fn snapshot(&self) -> Vec<(String, Vec<u8>, ObjectMetadata)> {
        let mut objects = Vec::new();
        for k in self.inner.keys() {
            let data = self.inner.raw(&k).unwrap().to_vec();
            let metadata = self.inner.get_metadata(&k).await.unwrap().unwrap_or_default();
            objects.push((k.to_string(), data, metadata));
        }
        objects
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get_metadata(&self, key: &ObjectKey) -> StorageResult<Option<ObjectMetadata>> {
        self.record(Call::GetMetadata(key.to_string()));
        {
            let mut faults = self.faults.lock().unwrap();
            if faults.get_metadata > 0 {
                faults.get_metadata -= 1;
                return Err(StorageError::MetadataFailed("injected".to_string()));
            }
        }
        self.inner.get_metadata(key).await
    }

    async fn download(&self, key: &ObjectKey) -> StorageResult<Vec<u8>> {
        self.record(Call::Download(key.to_string()));
        if self.faults.lock().unwrap().download {
            return Err(StorageError::DownloadFailed("injected".to_string()));
        }
        self.inner.download(key).await
    }

    async fn upload(
        &self,
        key: &ObjectKey,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<()> {
        self.record(Call::Upload(key.to_string()));
        if self.faults.lock().unwrap().upload {
            return Err(StorageError::UploadFailed("injected".to_string()));
        }
        self.inner.upload(key, data, options).await
    }

    async fn set_metadata(
        &self,
        key: &ObjectKey,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        self.record(Call::SetMetadata(key.to_string()));
        if self.faults.lock().unwrap().set_metadata {
            return Err(StorageError::MetadataFailed("injected".to_string()));
        }
        self.inner.set_metadata(key, metadata).await
    }

    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> StorageResult<()> {
        self.record(Call::Rename(from.to_string(), to.to_string()));
        if self.faults.lock().unwrap().rename {
            return Err(StorageError::MoveFailed("injected".to_string()));
        }
        self.inner.rename(from, to).await
    }

    async fn exists(&self, key: &ObjectKey) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Serves a single bucket and counts lookups.
pub struct SingleBucket {
    pub name: String,
    pub storage: Arc<RecordingStorage>,
    pub lookups: AtomicUsize,
}

impl SingleBucket {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            storage: Arc::new(RecordingStorage::new()),
            lookups: AtomicUsize::new(0),
        })
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BucketProvider for SingleBucket {
    async fn bucket(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if name == self.name {
            Ok(self.storage.clone())
        } else {
            Err(StorageError::NotFound(format!("bucket {name}")))
        }
    }
}

/// Default optimizer that counts invocations.
#[derive(Default)]
pub struct CountingOptimizer {
    inner: Optimizer,
    pub calls: AtomicUsize,
}

impl CountingOptimizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageOptimizer for CountingOptimizer {
    fn optimize(&self, data: &[u8], preserve_metadata: bool) -> Result<Vec<u8>, OptimizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.optimize(data, preserve_metadata)
    }
}

/// Reporter that keeps captured reports in memory.
#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<FaultReport>>,
    pub flushes: AtomicUsize,
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn capture(&self, report: FaultReport) {
        self.reports.lock().unwrap().push(report);
    }

    async fn flush(&self, _timeout: Duration) -> bool {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// Everything a processor test needs
pub struct Harness {
    pub bucket: Arc<SingleBucket>,
    pub optimizer: Arc<CountingOptimizer>,
    pub reporter: Arc<RecordingReporter>,
    pub processor: ObjectProcessor,
    pub scratch: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let config = ProcessorConfig {
            scratch_dir: scratch.path().to_path_buf(),
            ..config
        };
        Self::build(config, scratch)
    }

    /// Harness whose scratch files go to `dir` instead of a fresh temp dir.
    pub fn with_scratch_dir(dir: &Path) -> Self {
        let config = ProcessorConfig {
            scratch_dir: dir.to_path_buf(),
            ..ProcessorConfig::default()
        };
        Self::build(config, tempfile::tempdir().unwrap())
    }

    fn build(config: ProcessorConfig, scratch: tempfile::TempDir) -> Self {
        let bucket = SingleBucket::new(BUCKET);
        let optimizer = Arc::new(CountingOptimizer::default());
        let reporter = Arc::new(RecordingReporter::default());
        let processor = ObjectProcessor::new(Arc::new(config), bucket.clone(), optimizer.clone())
            .with_reporter(reporter.clone(), Duration::from_millis(2000));

        Self {
            bucket,
            optimizer,
            reporter,
            processor,
            scratch,
        }
    }

    pub fn storage(&self) -> &RecordingStorage {
        &self.bucket.storage
    }

    /// Seed an object at `path` with its declared content type.
    pub fn seed(&self, path: &str, data: Vec<u8>, content_type: &str) {
        self.storage()
            .inner
            .insert(&key(path), data, Some(content_type), ObjectMetadata::new())
            .unwrap();
    }

    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path()).unwrap().next().is_none()
    }
}

/// A PNG written with the fastest, least-compressed settings so the
/// optimizer always finds something to save.
pub fn png_fixture() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(96, 64, |x, y| {
        Rgb([(x * 2) as u8, (y * 3) as u8, 90])
    }));
    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Fast, FilterType::NoFilter);
    img.write_with_encoder(encoder).unwrap();
    buffer
}
