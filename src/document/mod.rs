//! # Document Model
//!
//! Base document shape shared by every collection: server-assigned
//! metadata stamps, soft-delete flag, and the field-transform sentinels
//! that backends resolve at commit time.

mod sentinel;
mod types;

pub use sentinel::{increment, is_transform, resolve_transforms, server_timestamp};
pub use types::{
    DocumentMeta, Fields, Stored, FIELD_CREATED_AT, FIELD_DELETED_AT, FIELD_ID, FIELD_IS_ACTIVE,
    FIELD_UPDATED_AT,
};
