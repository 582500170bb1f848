//! # Audit Records
//!
//! Every mutation is mirrored as a document in an audit collection.
//! Delivery is best-effort: audit writes ride the same store but their
//! failures never reach the caller.

use chrono::Utc;
use serde_json::{json, Value};

use crate::document::{server_timestamp, Fields};

/// One audit record describing a mutation
#[derive(Debug, Clone)]
pub(crate) struct AuditRecord {
    /// Operation name ("create", "update", "delete")
    pub operation: String,
    /// Collection the mutation touched
    pub collection: String,
    /// Document id the mutation touched
    pub doc_id: String,
}

impl AuditRecord {
    pub(crate) fn new(
        operation: impl Into<String>,
        collection: impl Into<String>,
        doc_id: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            collection: collection.into(),
            doc_id: doc_id.into(),
        }
    }

    /// Audit document body, stamped like any other document
    pub(crate) fn into_fields(self) -> Fields {
        let value = json!({
            "level": "info",
            "category": "system",
            "message": format!(
                "{} operation on {}:{}",
                self.operation, self.collection, self.doc_id
            ),
            "metadata": {
                "operation": self.operation,
                "collection": self.collection,
                "docId": self.doc_id,
                "timestamp": Utc::now().timestamp_millis(),
            },
            "resolved": true,
            "createdAt": server_timestamp(),
            "updatedAt": server_timestamp(),
            "isActive": true,
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!("audit record is always an object"),
        }
    }
}
