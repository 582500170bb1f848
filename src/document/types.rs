//! Base document types.
//!
//! Every document, regardless of collection, carries an opaque store-assigned
//! id plus metadata stamps on camelCase wire fields. A collection's concrete
//! schema is a caller-chosen type flattened alongside the base fields.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw document body as stored: field name to JSON value, id excluded.
pub type Fields = Map<String, Value>;

/// Wire name of the document id injected into read results.
pub const FIELD_ID: &str = "id";

/// Wire name of the creation stamp.
pub const FIELD_CREATED_AT: &str = "createdAt";

/// Wire name of the last-write stamp.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// Wire name of the soft-delete flag.
pub const FIELD_IS_ACTIVE: &str = "isActive";

/// Wire name of the soft-delete stamp.
pub const FIELD_DELETED_AT: &str = "deletedAt";

/// Server-assigned metadata present on every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Stamped once at creation, immutable afterwards.
    pub created_at: DateTime<Utc>,

    /// Stamped on every write, monotonically non-decreasing per document.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete flag; `false` means logically deleted.
    pub is_active: bool,

    /// Set when the document is soft-deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A document as read back from the store: id, base metadata, and the
/// collection's schema `T` flattened into one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    /// Opaque id assigned by the store at creation.
    pub id: String,

    /// Server-assigned metadata stamps.
    #[serde(flatten)]
    pub meta: DocumentMeta,

    /// Collection-specific fields.
    #[serde(flatten)]
    pub fields: T,
}

impl<T: DeserializeOwned> Stored<T> {
    /// Builds a typed document from a raw body and its id.
    pub fn from_fields(id: &str, fields: Fields) -> Result<Self, serde_json::Error> {
        let mut object = fields;
        object.insert(FIELD_ID.to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(object))
    }
}
