//! Domain models

pub mod event;
pub mod outcome;

pub use event::ObjectEvent;
pub use outcome::{FailureKind, Outcome, SkipReason};
