//! doccache - A cache-augmented client access layer for remote document stores
//!
//! One choke point for CRUD, queries, pagination, atomic batches, and
//! live subscriptions against a collection/document database, with a
//! TTL cache, soft-delete semantics, server-timestamp stamping, and
//! best-effort audit logging.

pub mod access;
pub mod cache;
pub mod document;
pub mod observability;
pub mod query;
pub mod store;

pub use access::{AccessConfig, AccessError, AccessResult, DataAccess, Listener, Page, WriteOp};
pub use document::{DocumentMeta, Stored};
pub use query::{FilterOp, OrderSpec, PageOptions, QueryOptions};
pub use store::{DocumentStore, MemoryStore, StoreError};
