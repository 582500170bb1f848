//! # Access Manager
//!
//! `DataAccess` owns the store handle, the TTL cache, and the listener
//! registry. All mutation of that state happens synchronously between
//! suspension points, so plain locks suffice; nothing is held across an
//! await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::{CacheConfig, CacheStats, TtlCache};
use crate::document::{
    increment, server_timestamp, Fields, Stored, FIELD_CREATED_AT, FIELD_DELETED_AT, FIELD_ID,
    FIELD_IS_ACTIVE, FIELD_UPDATED_AT,
};
use crate::observability::Logger;
use crate::query::{OrderDirection, OrderSpec, PageOptions, QueryOptions};
use crate::store::{BatchOp, DocumentStore};

use super::audit::AuditRecord;
use super::errors::{AccessError, AccessResult};
use super::listeners::{Listener, ListenerRegistry};
use super::pagination::{Page, PageInfo, PageMeta};

/// Access layer configuration
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Cache tuning
    pub cache: CacheConfig,
    /// Whether mutations are mirrored to the audit collection
    pub audit_enabled: bool,
    /// Collection audit records are written to
    pub audit_collection: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            audit_enabled: true,
            audit_collection: "system_logs".to_string(),
        }
    }
}

/// One operation inside an access-level batch.
///
/// Deletes inside a batch are always soft deletes.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create a document with fresh stamps
    Create {
        /// Target collection
        collection: String,
        /// Document body (must be a JSON object)
        data: Value,
    },
    /// Merge a partial update into an existing document
    Update {
        /// Target collection
        collection: String,
        /// Document id
        id: String,
        /// Partial body (must be a JSON object)
        patch: Value,
    },
    /// Soft-delete a document
    Delete {
        /// Target collection
        collection: String,
        /// Document id
        id: String,
    },
}

/// Cache-augmented access layer over a document store.
///
/// Explicitly constructed and passed around; there is no process-wide
/// instance. The store is injected so tests can substitute a fake and
/// assert call counts.
pub struct DataAccess<S: DocumentStore> {
    store: Arc<S>,
    cache: Arc<Mutex<TtlCache>>,
    listeners: ListenerRegistry,
    audit_enabled: bool,
    audit_collection: String,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    audit_failures: Arc<AtomicU64>,
}

impl<S: DocumentStore> DataAccess<S> {
    /// Create an access layer with default configuration.
    ///
    /// Must be called from within a tokio runtime; the periodic cache
    /// sweep is spawned here.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, AccessConfig::default())
    }

    /// Create an access layer with explicit configuration
    pub fn with_config(store: Arc<S>, config: AccessConfig) -> Self {
        let cache_enabled = config.cache.enabled;
        let ttl = config.cache.ttl;
        let cache = Arc::new(Mutex::new(TtlCache::new(config.cache)));

        // Background sweep on a fixed interval equal to the TTL
        let sweeper = if cache_enabled {
            let cache = Arc::clone(&cache);
            Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(ttl).await;
                    let removed = cache.lock().expect("cache lock poisoned").sweep();
                    if removed > 0 {
                        Logger::info("CACHE_SWEEP", &[("removed", &removed.to_string())]);
                    }
                }
            }))
        } else {
            None
        };

        Self {
            store,
            cache,
            listeners: ListenerRegistry::new(),
            audit_enabled: config.audit_enabled,
            audit_collection: config.audit_collection,
            sweeper: Mutex::new(sweeper),
            audit_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    // ==================
    // CRUD
    // ==================

    /// Create a document: stamps `createdAt`/`updatedAt`/`isActive`,
    /// writes it, and invalidates every cache entry for the collection.
    pub async fn create<T: Serialize>(&self, collection: &str, data: &T) -> AccessResult<String> {
        let mut fields = Self::object_of(collection, data)?;
        fields.insert(FIELD_CREATED_AT.to_string(), server_timestamp());
        fields.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());
        fields.insert(FIELD_IS_ACTIVE.to_string(), Value::Bool(true));

        let id = self
            .store
            .insert(collection, fields)
            .await
            .map_err(|source| AccessError::StoreWrite {
                collection: collection.to_string(),
                source,
            })?;

        self.log_operation("create", collection, &id);
        self.lock_cache().invalidate_pattern(collection);

        Ok(id)
    }

    /// Read a document, serving from cache when allowed. A missing
    /// document is `Ok(None)`, not an error.
    pub async fn read<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        use_cache: bool,
    ) -> AccessResult<Option<Stored<T>>> {
        let key = Self::doc_key(collection, id);

        if use_cache {
            if let Some(value) = self.lock_cache().get(&key) {
                return Ok(Some(Self::decode(collection, value)?));
            }
        }

        let fields = self
            .store
            .get(collection, id)
            .await
            .map_err(|source| AccessError::StoreRead {
                collection: collection.to_string(),
                source,
            })?;

        let Some(fields) = fields else {
            return Ok(None);
        };

        let mut object = fields;
        object.insert(FIELD_ID.to_string(), Value::String(id.to_string()));
        let value = Value::Object(object);

        if use_cache {
            self.lock_cache().insert(key, value.clone());
        }

        Ok(Some(Self::decode(collection, value)?))
    }

    /// Merge a partial update, stamping `updatedAt`. The exact cache
    /// entry is invalidated synchronously.
    pub async fn update<P: Serialize>(
        &self,
        collection: &str,
        id: &str,
        patch: &P,
    ) -> AccessResult<()> {
        let mut patch = Self::object_of(collection, patch)?;
        patch.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());

        self.store
            .apply(collection, id, patch)
            .await
            .map_err(|source| AccessError::StoreWrite {
                collection: collection.to_string(),
                source,
            })?;

        self.log_operation("update", collection, id);
        self.lock_cache().invalidate(&Self::doc_key(collection, id));

        Ok(())
    }

    /// Delete a document. Soft deletion flips `isActive` and stamps
    /// `deletedAt`; hard deletion removes the document.
    pub async fn delete(&self, collection: &str, id: &str, soft: bool) -> AccessResult<()> {
        let result = if soft {
            self.store
                .apply(collection, id, Self::soft_delete_patch())
                .await
        } else {
            self.store.remove(collection, id).await
        };

        result.map_err(|source| AccessError::StoreWrite {
            collection: collection.to_string(),
            source,
        })?;

        self.log_operation("delete", collection, id);
        self.lock_cache().invalidate(&Self::doc_key(collection, id));

        Ok(())
    }

    // ==================
    // Queries
    // ==================

    /// Run a query. Results are cached only on request, under a key
    /// derived from the serialized options.
    pub async fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        options: &QueryOptions,
        use_cache: bool,
    ) -> AccessResult<Vec<Stored<T>>> {
        let key = options.cache_key(collection);

        if use_cache {
            if let Some(Value::Array(values)) = self.lock_cache().get(&key) {
                return values
                    .into_iter()
                    .map(|value| Self::decode(collection, value))
                    .collect();
            }
        }

        let rows = self
            .store
            .find(collection, options)
            .await
            .map_err(|source| AccessError::StoreRead {
                collection: collection.to_string(),
                source,
            })?;

        let values: Vec<Value> = rows
            .into_iter()
            .map(|(id, fields)| {
                let mut object = fields;
                object.insert(FIELD_ID.to_string(), Value::String(id));
                Value::Object(object)
            })
            .collect();

        if use_cache {
            self.lock_cache()
                .insert(key, Value::Array(values.clone()));
        }

        values
            .into_iter()
            .map(|value| Self::decode(collection, value))
            .collect()
    }

    /// Fetch one page of a collection with exact totals.
    ///
    /// The total count comes from a full filtered scan and the offset is
    /// skipped by re-fetching prior rows, so cost grows with the page
    /// number. Acceptable only at small data volumes.
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        collection: &str,
        options: &PageOptions,
        filters: Option<&QueryOptions>,
    ) -> AccessResult<Page<T>> {
        if options.page == 0 {
            return Err(AccessError::InvalidPage("page numbers start at 1".to_string()));
        }
        if options.page_size == 0 {
            return Err(AccessError::InvalidPage("page size must be positive".to_string()));
        }

        let started = Instant::now();

        let order_field = options
            .order_by
            .clone()
            .unwrap_or_else(|| FIELD_CREATED_AT.to_string());
        let direction = options.direction.unwrap_or(OrderDirection::Desc);

        let mut base = QueryOptions::new().order(OrderSpec {
            field: order_field,
            direction,
        });
        if let Some(filters) = filters {
            base.r#where = filters.r#where.clone();
        }

        let read_error = |source| AccessError::StoreRead {
            collection: collection.to_string(),
            source,
        };

        // Exact total requires the full filtered result set
        let total_items = self
            .store
            .find(collection, &base)
            .await
            .map_err(read_error)?
            .len();

        let offset = (options.page - 1) * options.page_size;
        let mut page_query = base.clone().limit(options.page_size);

        let mut beyond_end = false;
        if offset > 0 {
            let skipped = self
                .store
                .find(collection, &base.clone().limit(offset))
                .await
                .map_err(read_error)?;
            match skipped.last() {
                Some((anchor, _)) if skipped.len() == offset => {
                    page_query = page_query.start_after(anchor.as_str());
                }
                // Fewer rows than the offset: the requested page is past
                // the end of the result set
                _ => beyond_end = true,
            }
        }

        let data = if beyond_end {
            Vec::new()
        } else {
            let rows = self
                .store
                .find(collection, &page_query)
                .await
                .map_err(read_error)?;
            rows.into_iter()
                .map(|(id, fields)| {
                    let mut object = fields;
                    object.insert(FIELD_ID.to_string(), Value::String(id));
                    Self::decode(collection, Value::Object(object))
                })
                .collect::<AccessResult<Vec<_>>>()?
        };

        Ok(Page {
            data,
            pagination: PageInfo::new(options.page, options.page_size, total_items),
            metadata: PageMeta {
                query_time_ms: started.elapsed().as_millis() as u64,
                from_cache: false,
            },
        })
    }

    // ==================
    // Live Subscriptions
    // ==================

    /// Subscribe to a single document. The current state arrives first,
    /// then one message per remote change; `None` means the document is
    /// gone.
    pub async fn listen<T>(
        &self,
        collection: &str,
        id: &str,
    ) -> AccessResult<Listener<Option<Stored<T>>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut watch = self
            .store
            .watch_document(collection, id)
            .await
            .map_err(|source| AccessError::ListenerSetup {
                collection: collection.to_string(),
                source,
            })?;

        let listener_id = format!("{collection}:{id}:{}", Uuid::new_v4());
        let (tx, rx) = mpsc::unbounded_channel();

        let forward_collection = collection.to_string();
        let forward_id = id.to_string();
        let task = tokio::spawn(async move {
            while let Some(snapshot) = watch.recv().await {
                let message = match snapshot {
                    None => None,
                    Some(fields) => match Stored::from_fields(&forward_id, fields) {
                        Ok(document) => Some(document),
                        Err(error) => {
                            Logger::warn(
                                "LISTENER_DECODE_FAILED",
                                &[
                                    ("collection", forward_collection.as_str()),
                                    ("docId", forward_id.as_str()),
                                    ("error", &error.to_string()),
                                ],
                            );
                            continue;
                        }
                    },
                };
                if tx.send(message).is_err() {
                    break;
                }
            }
        });

        self.listeners.register(listener_id.clone(), task);
        Ok(Listener::new(listener_id, rx))
    }

    /// Subscribe to a query. The full result set is pushed after every
    /// relevant change.
    pub async fn listen_to_query<T>(
        &self,
        collection: &str,
        options: QueryOptions,
    ) -> AccessResult<Listener<Vec<Stored<T>>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut watch = self
            .store
            .watch_query(collection, options)
            .await
            .map_err(|source| AccessError::ListenerSetup {
                collection: collection.to_string(),
                source,
            })?;

        let listener_id = format!("{collection}:query:{}", Uuid::new_v4());
        let (tx, rx) = mpsc::unbounded_channel();

        let forward_collection = collection.to_string();
        let task = tokio::spawn(async move {
            while let Some(rows) = watch.recv().await {
                let mut documents = Vec::with_capacity(rows.len());
                for (id, fields) in rows {
                    match Stored::from_fields(&id, fields) {
                        Ok(document) => documents.push(document),
                        Err(error) => Logger::warn(
                            "LISTENER_DECODE_FAILED",
                            &[
                                ("collection", forward_collection.as_str()),
                                ("docId", id.as_str()),
                                ("error", &error.to_string()),
                            ],
                        ),
                    }
                }
                if tx.send(documents).is_err() {
                    break;
                }
            }
        });

        self.listeners.register(listener_id.clone(), task);
        Ok(Listener::new(listener_id, rx))
    }

    /// Stop a listener; a no-op if it was already stopped
    pub fn stop_listening(&self, listener_id: &str) {
        self.listeners.stop(listener_id);
    }

    /// Number of running listeners
    pub fn active_listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ==================
    // Batches & Counters
    // ==================

    /// Apply a heterogeneous list of writes atomically, then invalidate
    /// cache entries for every touched collection.
    pub async fn batch_write(&self, operations: Vec<WriteOp>) -> AccessResult<()> {
        let mut ops = Vec::with_capacity(operations.len());
        let mut touched: Vec<String> = Vec::new();

        for operation in operations {
            let collection = match &operation {
                WriteOp::Create { collection, .. }
                | WriteOp::Update { collection, .. }
                | WriteOp::Delete { collection, .. } => collection.clone(),
            };
            if !touched.contains(&collection) {
                touched.push(collection);
            }

            ops.push(match operation {
                WriteOp::Create { collection, data } => {
                    let mut fields = Self::object_of(&collection, &data)?;
                    fields.insert(FIELD_CREATED_AT.to_string(), server_timestamp());
                    fields.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());
                    fields.insert(FIELD_IS_ACTIVE.to_string(), Value::Bool(true));
                    BatchOp::Insert { collection, fields }
                }
                WriteOp::Update {
                    collection,
                    id,
                    patch,
                } => {
                    let mut patch = Self::object_of(&collection, &patch)?;
                    patch.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());
                    BatchOp::Update {
                        collection,
                        id,
                        patch,
                    }
                }
                WriteOp::Delete { collection, id } => BatchOp::Update {
                    collection,
                    id,
                    patch: Self::soft_delete_patch(),
                },
            });
        }

        self.store
            .commit_batch(ops)
            .await
            .map_err(|source| AccessError::BatchWrite { source })?;

        let mut cache = self.lock_cache();
        for collection in &touched {
            cache.invalidate_pattern(collection);
        }

        Ok(())
    }

    /// Atomically add `delta` to a numeric field, stamping `updatedAt`
    pub async fn increment_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: f64,
    ) -> AccessResult<()> {
        let mut patch = Fields::new();
        patch.insert(field.to_string(), increment(delta));
        patch.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());

        self.store
            .apply(collection, id, patch)
            .await
            .map_err(|source| AccessError::StoreWrite {
                collection: collection.to_string(),
                source,
            })?;

        self.lock_cache().invalidate(&Self::doc_key(collection, id));
        Ok(())
    }

    // ==================
    // Network & Lifecycle
    // ==================

    /// Disable store network access
    pub async fn go_offline(&self) -> AccessResult<()> {
        self.store
            .set_network_enabled(false)
            .await
            .map_err(|source| AccessError::Network { source })
    }

    /// Re-enable store network access
    pub async fn go_online(&self) -> AccessResult<()> {
        self.store
            .set_network_enabled(true)
            .await
            .map_err(|source| AccessError::Network { source })
    }

    /// Tear down: stop the sweep task and every listener, clear the cache
    pub fn destroy(&self) {
        if let Some(task) = self.sweeper.lock().expect("sweeper lock poisoned").take() {
            task.abort();
        }
        self.listeners.stop_all();
        self.lock_cache().clear();
    }

    // ==================
    // Cache Maintenance
    // ==================

    /// Number of cache entries
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// Drop every cache entry
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Cache statistics snapshot
    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats().clone()
    }

    /// Number of audit records dropped because their write failed
    pub fn audit_failure_count(&self) -> u64 {
        self.audit_failures.load(Ordering::SeqCst)
    }

    // ==================
    // Internals
    // ==================

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, TtlCache> {
        self.cache.lock().expect("cache lock poisoned")
    }

    fn doc_key(collection: &str, id: &str) -> String {
        format!("{collection}:{id}")
    }

    fn soft_delete_patch() -> Fields {
        let mut patch = Fields::new();
        patch.insert(FIELD_IS_ACTIVE.to_string(), Value::Bool(false));
        patch.insert(FIELD_DELETED_AT.to_string(), server_timestamp());
        patch.insert(FIELD_UPDATED_AT.to_string(), server_timestamp());
        patch
    }

    fn object_of<P: Serialize>(collection: &str, payload: &P) -> AccessResult<Fields> {
        let value = serde_json::to_value(payload).map_err(|error| AccessError::InvalidDocument {
            collection: collection.to_string(),
            reason: error.to_string(),
        })?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(AccessError::InvalidDocument {
                collection: collection.to_string(),
                reason: format!("expected a JSON object, got {}", json_type_name(&other)),
            }),
        }
    }

    fn decode<T: DeserializeOwned>(collection: &str, value: Value) -> AccessResult<Stored<T>> {
        serde_json::from_value(value).map_err(|source| AccessError::Decode {
            collection: collection.to_string(),
            source,
        })
    }

    /// Mirror a mutation into the audit collection, fire-and-forget.
    /// Failures are counted and logged, never propagated.
    fn log_operation(&self, operation: &'static str, collection: &str, doc_id: &str) {
        if !self.audit_enabled {
            return;
        }

        let record = AuditRecord::new(operation, collection, doc_id);
        let store = Arc::clone(&self.store);
        let audit_collection = self.audit_collection.clone();
        let failures = Arc::clone(&self.audit_failures);

        tokio::spawn(async move {
            if let Err(error) = store.insert(&audit_collection, record.into_fields()).await {
                failures.fetch_add(1, Ordering::SeqCst);
                Logger::warn(
                    "AUDIT_WRITE_FAILED",
                    &[
                        ("collection", audit_collection.as_str()),
                        ("error", &error.to_string()),
                    ],
                );
            }
        });
    }
}

impl<S: DocumentStore> Drop for DataAccess<S> {
    fn drop(&mut self) {
        if let Some(task) = self.sweeper.lock().expect("sweeper lock poisoned").take() {
            task.abort();
        }
        self.listeners.stop_all();
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
