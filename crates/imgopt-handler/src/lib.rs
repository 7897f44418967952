//! imgopt Handler Library
//!
//! The idempotent per-object workflow: eligibility filtering, path
//! derivation, the processed-marker guard and the
//! fetch / transform / publish pipeline, driven by [`ObjectProcessor`].

pub mod error;
pub mod filter;
pub mod guard;
pub mod paths;
mod pipeline;
pub mod processor;
pub mod retry;
pub mod scratch;

pub use error::{HandlerError, Stage};
pub use filter::{is_eligible, Eligibility};
pub use guard::{check_processed, marker_is_set};
pub use paths::{canonical_path, derive_paths, ObjectPaths};
pub use processor::ObjectProcessor;
pub use retry::{retry, RetryPolicy};
pub use scratch::ScratchFile;
