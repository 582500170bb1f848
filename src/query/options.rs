//! Query and pagination option types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate operator for where clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

/// A single field predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    /// Field to filter on
    pub field: String,
    /// Operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: Value,
}

impl WhereClause {
    /// Create a predicate
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl Default for OrderDirection {
    fn default() -> Self {
        OrderDirection::Asc
    }
}

/// A single ordering key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by
    pub field: String,
    /// Direction
    #[serde(default)]
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Ascending order on a field
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on a field
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Declarative query description: filters, ordering, limit, and an
/// id-anchored continuation cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Predicates, combined with AND semantics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub r#where: Vec<WhereClause>,

    /// Ordering keys, applied left to right
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderSpec>,

    /// Maximum number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Resume after the document with this id in the sorted result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_after: Option<String>,
}

impl QueryOptions {
    /// Empty query (everything in the collection)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.r#where.push(WhereClause::new(field, op, value));
        self
    }

    /// Add an ordering key
    pub fn order(mut self, spec: OrderSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    /// Cap the result size
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after a document id
    pub fn start_after(mut self, id: impl Into<String>) -> Self {
        self.start_after = Some(id.into());
        self
    }

    /// Deterministic cache key for this query over a collection.
    ///
    /// Segments mirror the option structure so distinct queries never
    /// collide and every key contains the collection name (which is what
    /// collection-wide invalidation scans for).
    pub fn cache_key(&self, collection: &str) -> String {
        let mut parts = vec![collection.to_string()];

        if !self.r#where.is_empty() {
            parts.push("where".to_string());
            parts.push(serde_json::to_string(&self.r#where).unwrap_or_default());
        }
        if !self.order_by.is_empty() {
            parts.push("orderBy".to_string());
            parts.push(serde_json::to_string(&self.order_by).unwrap_or_default());
        }
        if let Some(limit) = self.limit {
            parts.push("limit".to_string());
            parts.push(limit.to_string());
        }
        if let Some(anchor) = &self.start_after {
            parts.push("after".to_string());
            parts.push(anchor.clone());
        }

        parts.join(":")
    }
}

/// Offset-style pagination request, translated to cursor continuation by
/// the access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    /// 1-based page number
    pub page: usize,
    /// Rows per page
    pub page_size: usize,
    /// Ordering field (defaults to `createdAt`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Ordering direction (defaults to descending, newest first)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<OrderDirection>,
}

impl PageOptions {
    /// Page request with default ordering
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            order_by: None,
            direction: None,
        }
    }
}
