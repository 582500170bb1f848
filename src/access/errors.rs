//! # Access Layer Errors
//!
//! Every operation wraps the underlying store failure with the
//! collection (and document, where known) it was touching.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for access layer operations
pub type AccessResult<T> = Result<T, AccessError>;

/// Access layer errors
#[derive(Debug, Error)]
pub enum AccessError {
    // ==================
    // Store Errors
    // ==================
    /// A read or query against the store failed
    #[error("failed to read from {collection}: {source}")]
    StoreRead {
        /// Collection being read
        collection: String,
        /// Underlying store failure
        source: StoreError,
    },

    /// A write against the store failed
    #[error("failed to write to {collection}: {source}")]
    StoreWrite {
        /// Collection being written
        collection: String,
        /// Underlying store failure
        source: StoreError,
    },

    /// A batch commit failed; no operation in the batch was applied
    #[error("batch write failed: {source}")]
    BatchWrite {
        /// Underlying store failure
        source: StoreError,
    },

    /// A live subscription could not be installed
    #[error("failed to set up listener on {collection}: {source}")]
    ListenerSetup {
        /// Collection being watched
        collection: String,
        /// Underlying store failure
        source: StoreError,
    },

    /// Toggling store connectivity failed
    #[error("network toggle failed: {source}")]
    Network {
        /// Underlying store failure
        source: StoreError,
    },

    // ==================
    // Caller Errors
    // ==================
    /// Payload did not serialize to a JSON object
    #[error("invalid document for {collection}: {reason}")]
    InvalidDocument {
        /// Target collection
        collection: String,
        /// What was wrong with the payload
        reason: String,
    },

    /// Pagination request was malformed
    #[error("invalid pagination request: {0}")]
    InvalidPage(String),

    // ==================
    // Decode Errors
    // ==================
    /// A stored document did not match the requested schema
    #[error("failed to decode document in {collection}: {source}")]
    Decode {
        /// Collection the document came from
        collection: String,
        /// Deserialization failure
        source: serde_json::Error,
    },
}
