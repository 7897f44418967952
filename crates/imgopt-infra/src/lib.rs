//! imgopt Infrastructure Library
//!
//! This crate provides shared infrastructure used by the imgopt binary:
//! - Telemetry initialization
//! - Fault reporting to an external error sink

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod reporting;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::init_telemetry;

#[cfg(feature = "reporting")]
pub use reporting::{create_error_reporter, HttpErrorReporter};
pub use reporting::{ErrorReporter, FaultReport};
