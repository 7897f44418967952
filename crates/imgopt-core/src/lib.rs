//! imgopt Core Library
//!
//! This crate provides the domain models, exit-code taxonomy and configuration
//! shared across all imgopt components.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ProcessorConfig, ReportingConfig, ServerConfig, StorageConfig};
pub use models::{FailureKind, ObjectEvent, Outcome, SkipReason};
pub use storage_types::StorageBackend;
