//! imgopt function front ends
//!
//! Wires configuration, storage, the optimizer and error reporting into an
//! [`imgopt_handler::ObjectProcessor`], and exposes it over HTTP.

pub mod error;
pub mod routes;
pub mod server;
pub mod setup;

pub use routes::{router, AppState, EventResponse};
pub use setup::build_processor;
