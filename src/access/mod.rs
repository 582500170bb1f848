//! # Data Access Layer
//!
//! The single choke point for reads and writes against the document
//! store: transparent TTL caching, consistent timestamp stamping,
//! soft-delete semantics, batch writes, live subscriptions, and
//! best-effort audit logging.

mod audit;
mod errors;
mod listeners;
mod manager;
mod pagination;

pub use errors::{AccessError, AccessResult};
pub use listeners::Listener;
pub use manager::{AccessConfig, DataAccess, WriteOp};
pub use pagination::{Page, PageInfo, PageMeta};
