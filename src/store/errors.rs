//! # Store Errors
//!
//! Error types surfaced by document store backends.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    // ==================
    // Addressing Errors
    // ==================
    /// Write targeted a document that does not exist
    #[error("document {collection}/{id} not found")]
    NotFound {
        /// Collection name
        collection: String,
        /// Document id
        id: String,
    },

    // ==================
    // Payload Errors
    // ==================
    /// Document body was rejected by the backend
    #[error("invalid document payload: {0}")]
    InvalidPayload(String),

    // ==================
    // Transport Errors
    // ==================
    /// Network access is disabled
    #[error("store unavailable: network disabled")]
    Unavailable,

    /// Backend transport failure
    #[error("transport failure: {0}")]
    Transport(String),
}
