//! imgopt Processing Library
//!
//! Lossless-leaning re-encoding of the image formats the processor accepts
//! (JPEG, PNG, BMP, TIFF), keeping embedded EXIF and ICC data intact.

pub mod error;
#[cfg(feature = "image")]
pub mod compression;
#[cfg(feature = "image")]
pub mod metadata;
#[cfg(feature = "image")]
pub mod optimizer;
pub mod traits;

pub use error::OptimizeError;
#[cfg(feature = "image")]
pub use optimizer::Optimizer;
pub use traits::ImageOptimizer;
