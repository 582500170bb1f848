//! # Document Store Abstraction
//!
//! The seam between the access layer and whatever remote document
//! database backs it: an async trait covering CRUD, queries, atomic
//! batches, push-based watches, and network toggling, plus an in-memory
//! reference implementation used as the test double and local backend.

mod backend;
mod errors;
mod memory;

pub use backend::{BatchOp, DocumentStore, DocumentWatch, QueryWatch};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
