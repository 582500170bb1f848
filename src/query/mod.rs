//! # Query Model
//!
//! Declarative query description (predicates, ordering, limit, cursor)
//! and its client-side evaluation. Evaluation is strict: no type
//! coercion, AND semantics across predicates, stable deterministic
//! ordering.

mod filters;
mod options;
mod sorter;

pub use filters::PredicateFilter;
pub use options::{FilterOp, OrderDirection, OrderSpec, PageOptions, QueryOptions, WhereClause};
pub use sorter::DocumentSorter;
