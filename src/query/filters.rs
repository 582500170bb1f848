//! Predicate evaluation.
//!
//! Filters document bodies strictly according to where clauses.
//! No type coercion, AND semantics, missing fields never match.

use serde_json::Value;

use crate::document::Fields;

use super::options::{FilterOp, WhereClause};

/// Evaluates where clauses against document bodies
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a document matches all clauses (AND semantics)
    pub fn matches(fields: &Fields, clauses: &[WhereClause]) -> bool {
        clauses.iter().all(|clause| Self::matches_clause(fields, clause))
    }

    /// Checks if a document matches a single clause
    fn matches_clause(fields: &Fields, clause: &WhereClause) -> bool {
        let field_value = match fields.get(&clause.field) {
            Some(v) => v,
            None => return false, // Missing field = no match
        };

        // Null values never match
        if field_value.is_null() {
            return false;
        }

        match clause.op {
            FilterOp::Eq => field_value == &clause.value,
            FilterOp::Neq => field_value != &clause.value,
            FilterOp::Gt => Self::ordered(field_value, &clause.value, |o| o.is_gt()),
            FilterOp::Gte => Self::ordered(field_value, &clause.value, |o| o.is_ge()),
            FilterOp::Lt => Self::ordered(field_value, &clause.value, |o| o.is_lt()),
            FilterOp::Lte => Self::ordered(field_value, &clause.value, |o| o.is_le()),
            FilterOp::In => clause
                .value
                .as_array()
                .map(|candidates| candidates.contains(field_value))
                .unwrap_or(false),
        }
    }

    /// Range comparison over numbers and strings; mixed types never match.
    fn ordered(
        actual: &Value,
        bound: &Value,
        accept: impl Fn(std::cmp::Ordering) -> bool,
    ) -> bool {
        match (actual, bound) {
            (Value::Number(a), Value::Number(b)) => {
                match (a.as_f64(), b.as_f64()) {
                    (Some(af), Some(bf)) => af
                        .partial_cmp(&bf)
                        .map(&accept)
                        .unwrap_or(false),
                    _ => false,
                }
            }
            (Value::String(a), Value::String(b)) => accept(a.cmp(b)),
            _ => false,
        }
    }
}
