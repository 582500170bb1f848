//! Result ordering.
//!
//! Sorts (id, body) pairs by the requested keys, deterministically.
//! The sort is stable, so equal keys keep their incoming order.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Fields;

use super::options::{OrderDirection, OrderSpec};

/// Sorts raw query results
pub struct DocumentSorter;

impl DocumentSorter {
    /// Sorts documents by the ordering keys, applied left to right.
    pub fn sort(documents: &mut [(String, Fields)], order_by: &[OrderSpec]) {
        if order_by.is_empty() {
            return;
        }

        documents.sort_by(|(_, a), (_, b)| {
            for spec in order_by {
                let ordering = Self::compare_values(a.get(&spec.field), b.get(&spec.field));
                let ordering = match spec.direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Compares two JSON values for sorting.
    ///
    /// Ordering rules:
    /// - missing < null < bool < number < string
    /// - For same types, natural ordering
    /// - Arrays and objects are not compared
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let type_order = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                let a_type = type_order(a_val);
                let b_type = type_order(b_val);
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }

                match (a_val, b_val) {
                    (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                    (Value::Number(a_n), Value::Number(b_n)) => {
                        let a_f = a_n.as_f64().unwrap_or(0.0);
                        let b_f = b_n.as_f64().unwrap_or(0.0);
                        a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                    _ => Ordering::Equal,
                }
            }
        }
    }
}
