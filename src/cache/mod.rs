//! # TTL Cache
//!
//! Bounded in-memory cache for read and query results. Entries expire
//! after a fixed time-to-live and are never served past expiry; capacity
//! overflow evicts the oldest quarter of entries by insertion time.

mod ttl;

pub use ttl::{CacheConfig, CacheStats, TtlCache};
