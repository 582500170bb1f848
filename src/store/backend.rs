//! # Store Backend Trait
//!
//! Async contract every document store backend implements. Backends are
//! expected to resolve field-transform sentinels (server timestamps,
//! numeric increments) atomically at commit time.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::document::Fields;
use crate::query::QueryOptions;

use super::errors::StoreResult;

/// Push channel for a single-document watch. `None` means the document
/// does not exist (missing or hard-deleted).
pub type DocumentWatch = mpsc::UnboundedReceiver<Option<Fields>>;

/// Push channel for a query watch: the full result set after each
/// relevant change.
pub type QueryWatch = mpsc::UnboundedReceiver<Vec<(String, Fields)>>;

/// One operation inside an atomic batch
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Insert a new document with a store-assigned id
    Insert {
        /// Target collection
        collection: String,
        /// Document body (sentinels unresolved)
        fields: Fields,
    },
    /// Merge a partial update into an existing document
    Update {
        /// Target collection
        collection: String,
        /// Document id
        id: String,
        /// Partial body (sentinels unresolved)
        patch: Fields,
    },
    /// Physically remove a document
    Remove {
        /// Target collection
        collection: String,
        /// Document id
        id: String,
    },
}

impl BatchOp {
    /// Collection this operation touches
    pub fn collection(&self) -> &str {
        match self {
            BatchOp::Insert { collection, .. }
            | BatchOp::Update { collection, .. }
            | BatchOp::Remove { collection, .. } => collection,
        }
    }
}

/// Backend trait for remote document stores
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a new document, returning its store-assigned id
    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// Fetch a document body; `Ok(None)` if it does not exist
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Fields>>;

    /// Merge a partial update into an existing document
    async fn apply(&self, collection: &str, id: &str, patch: Fields) -> StoreResult<()>;

    /// Physically remove a document; removing a missing document is a no-op
    async fn remove(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Run a query, returning (id, body) pairs in result order
    async fn find(&self, collection: &str, options: &QueryOptions)
        -> StoreResult<Vec<(String, Fields)>>;

    /// Commit a batch atomically: either every operation applies or none do
    async fn commit_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()>;

    /// Watch a single document. The current state is pushed immediately,
    /// then once per change, until the receiver is dropped.
    async fn watch_document(&self, collection: &str, id: &str) -> StoreResult<DocumentWatch>;

    /// Watch a query. The current result set is pushed immediately, then
    /// once per change to the collection, until the receiver is dropped.
    async fn watch_query(&self, collection: &str, options: QueryOptions)
        -> StoreResult<QueryWatch>;

    /// Toggle network connectivity
    async fn set_network_enabled(&self, enabled: bool) -> StoreResult<()>;
}
