use crate::OptimizeError;

/// An image optimization pass.
///
/// Implementations are synchronous and CPU-bound; async callers should run
/// them on the blocking pool.
pub trait ImageOptimizer: Send + Sync {
    /// Re-encode `data`, returning bytes in the same format. When
    /// `preserve_metadata` is set, embedded EXIF and colour profiles survive.
    fn optimize(&self, data: &[u8], preserve_metadata: bool) -> Result<Vec<u8>, OptimizeError>;
}
