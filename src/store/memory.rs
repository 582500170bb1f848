//! # In-Memory Store
//!
//! Reference `DocumentStore` backend. Collections are ordered maps,
//! server timestamps come from a strictly monotonic store clock, batches
//! are validate-then-apply, and watches are unbounded push channels fed
//! synchronously from the mutation path.
//!
//! Doubles as the test backend: operation counters let tests assert how
//! many store round trips an access-layer call performed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::document::{resolve_transforms, Fields};
use crate::query::{DocumentSorter, PredicateFilter, QueryOptions};

use super::backend::{BatchOp, DocumentStore, DocumentWatch, QueryWatch};
use super::errors::{StoreError, StoreResult};

struct DocWatcher {
    collection: String,
    id: String,
    tx: mpsc::UnboundedSender<Option<Fields>>,
}

struct QueryWatcher {
    collection: String,
    options: QueryOptions,
    tx: mpsc::UnboundedSender<Vec<(String, Fields)>>,
}

struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    doc_watchers: Vec<DocWatcher>,
    query_watchers: Vec<QueryWatcher>,
    online: bool,
    last_stamp: DateTime<Utc>,
}

/// In-memory document store
pub struct MemoryStore {
    inner: RwLock<Inner>,
    reads: AtomicU64,
    writes: AtomicU64,
    queries: AtomicU64,
    batches: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                collections: HashMap::new(),
                doc_watchers: Vec::new(),
                query_watchers: Vec::new(),
                online: true,
                last_stamp: DateTime::<Utc>::MIN_UTC,
            }),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            queries: AtomicU64::new(0),
            batches: AtomicU64::new(0),
        }
    }

    /// Number of document fetches served
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of single-document writes applied
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of queries executed
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of batches committed
    pub fn batch_count(&self) -> u64 {
        self.batches.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection
    pub fn collection_len(&self, collection: &str) -> usize {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .collections
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Next server timestamp: the wall clock, bumped so successive
    /// commits never share or reverse a stamp (microsecond resolution).
    fn next_stamp(inner: &mut Inner) -> DateTime<Utc> {
        let now = Utc::now();
        let now = DateTime::<Utc>::from_timestamp_micros(now.timestamp_micros())
            .unwrap_or(now);
        let stamp = if now > inner.last_stamp {
            now
        } else {
            inner.last_stamp + Duration::microseconds(1)
        };
        inner.last_stamp = stamp;
        stamp
    }

    fn run_query(
        inner: &Inner,
        collection: &str,
        options: &QueryOptions,
    ) -> Vec<(String, Fields)> {
        let mut results: Vec<(String, Fields)> = inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| PredicateFilter::matches(fields, &options.r#where))
                    .map(|(id, fields)| (id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();

        DocumentSorter::sort(&mut results, &options.order_by);

        if let Some(anchor) = &options.start_after {
            match results.iter().position(|(id, _)| id == anchor) {
                Some(position) => {
                    results.drain(..=position);
                }
                // Vanished anchor: nothing to resume after
                None => results.clear(),
            }
        }

        if let Some(limit) = options.limit {
            results.truncate(limit);
        }

        results
    }

    /// Push fresh state to every watcher affected by the touched
    /// documents, dropping watchers whose receivers are gone.
    fn notify(inner: &mut Inner, touched: &HashSet<(String, String)>) {
        let collections: HashSet<&str> = touched.iter().map(|(c, _)| c.as_str()).collect();

        let mut doc_sends: Vec<(usize, Option<Fields>)> = Vec::new();
        for (index, watcher) in inner.doc_watchers.iter().enumerate() {
            if touched.contains(&(watcher.collection.clone(), watcher.id.clone())) {
                let snapshot = inner
                    .collections
                    .get(&watcher.collection)
                    .and_then(|docs| docs.get(&watcher.id))
                    .cloned();
                doc_sends.push((index, snapshot));
            }
        }
        let mut dead_docs = Vec::new();
        for (index, snapshot) in doc_sends {
            if inner.doc_watchers[index].tx.send(snapshot).is_err() {
                dead_docs.push(index);
            }
        }
        for index in dead_docs.into_iter().rev() {
            inner.doc_watchers.remove(index);
        }

        let mut query_sends: Vec<(usize, Vec<(String, Fields)>)> = Vec::new();
        for (index, watcher) in inner.query_watchers.iter().enumerate() {
            if collections.contains(watcher.collection.as_str()) {
                let results = Self::run_query(inner, &watcher.collection, &watcher.options);
                query_sends.push((index, results));
            }
        }
        let mut dead_queries = Vec::new();
        for (index, results) in query_sends {
            if inner.query_watchers[index].tx.send(results).is_err() {
                dead_queries.push(index);
            }
        }
        for index in dead_queries.into_iter().rev() {
            inner.query_watchers.remove(index);
        }
    }

    fn require_online(inner: &Inner) -> StoreResult<()> {
        if inner.online {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        Self::require_online(&inner)?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let id = Uuid::new_v4().to_string();
        let stamp = Self::next_stamp(&mut inner);

        let mut body = fields;
        resolve_transforms(&mut body, None, stamp);

        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), body);

        let touched = HashSet::from([(collection.to_string(), id.clone())]);
        Self::notify(&mut inner, &touched);

        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Fields>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Self::require_online(&inner)?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn apply(&self, collection: &str, id: &str, patch: Fields) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        Self::require_online(&inner)?;

        let exists = inner
            .collections
            .get(collection)
            .map(|docs| docs.contains_key(id))
            .unwrap_or(false);
        if !exists {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        let stamp = Self::next_stamp(&mut inner);

        let docs = inner
            .collections
            .get_mut(collection)
            .expect("collection checked above");
        let current = docs.get(id).cloned();
        let mut patch = patch;
        resolve_transforms(&mut patch, current.as_ref(), stamp);

        let body = docs.get_mut(id).expect("document checked above");
        for (field, value) in patch {
            body.insert(field, value);
        }

        let touched = HashSet::from([(collection.to_string(), id.to_string())]);
        Self::notify(&mut inner, &touched);

        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        Self::require_online(&inner)?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let removed = inner
            .collections
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false);

        if removed {
            let touched = HashSet::from([(collection.to_string(), id.to_string())]);
            Self::notify(&mut inner, &touched);
        }

        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        options: &QueryOptions,
    ) -> StoreResult<Vec<(String, Fields)>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Self::require_online(&inner)?;
        self.queries.fetch_add(1, Ordering::SeqCst);

        Ok(Self::run_query(&inner, collection, options))
    }

    async fn commit_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        Self::require_online(&inner)?;

        // Validate everything before touching state so a rejected batch
        // leaves no partial effects.
        for op in &ops {
            if let BatchOp::Update { collection, id, .. } = op {
                let exists = inner
                    .collections
                    .get(collection)
                    .map(|docs| docs.contains_key(id))
                    .unwrap_or(false);
                if !exists {
                    return Err(StoreError::NotFound {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        self.batches.fetch_add(1, Ordering::SeqCst);
        let stamp = Self::next_stamp(&mut inner);
        let mut touched = HashSet::new();

        for op in ops {
            match op {
                BatchOp::Insert { collection, fields } => {
                    let id = Uuid::new_v4().to_string();
                    let mut body = fields;
                    resolve_transforms(&mut body, None, stamp);
                    inner
                        .collections
                        .entry(collection.clone())
                        .or_default()
                        .insert(id.clone(), body);
                    touched.insert((collection, id));
                }
                BatchOp::Update {
                    collection,
                    id,
                    patch,
                } => {
                    let docs = inner
                        .collections
                        .get_mut(&collection)
                        .expect("validated above");
                    let current = docs.get(&id).cloned();
                    let mut patch = patch;
                    resolve_transforms(&mut patch, current.as_ref(), stamp);
                    let body = docs.get_mut(&id).expect("validated above");
                    for (field, value) in patch {
                        body.insert(field, value);
                    }
                    touched.insert((collection, id));
                }
                BatchOp::Remove { collection, id } => {
                    if let Some(docs) = inner.collections.get_mut(&collection) {
                        docs.remove(&id);
                    }
                    touched.insert((collection, id));
                }
            }
        }

        Self::notify(&mut inner, &touched);
        Ok(())
    }

    async fn watch_document(&self, collection: &str, id: &str) -> StoreResult<DocumentWatch> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let (tx, rx) = mpsc::unbounded_channel();

        let snapshot = inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned();
        let _ = tx.send(snapshot);

        inner.doc_watchers.push(DocWatcher {
            collection: collection.to_string(),
            id: id.to_string(),
            tx,
        });

        Ok(rx)
    }

    async fn watch_query(
        &self,
        collection: &str,
        options: QueryOptions,
    ) -> StoreResult<QueryWatch> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let (tx, rx) = mpsc::unbounded_channel();

        let results = Self::run_query(&inner, collection, &options);
        let _ = tx.send(results);

        inner.query_watchers.push(QueryWatcher {
            collection: collection.to_string(),
            options,
            tx,
        });

        Ok(rx)
    }

    async fn set_network_enabled(&self, enabled: bool) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.online = enabled;
        Ok(())
    }
}
