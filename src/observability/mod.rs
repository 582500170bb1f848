//! # Observability
//!
//! Structured JSON logging for the access layer. Logging is synchronous,
//! one line per event, with deterministic key ordering, and it never
//! fails the caller.

mod logger;

pub use logger::{Logger, Severity};
