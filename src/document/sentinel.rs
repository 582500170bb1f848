//! Field-transform sentinels.
//!
//! The access layer never reads a clock for document stamps. It writes
//! sentinel values into the outgoing body and the backend resolves them
//! atomically at commit time, so `createdAt`/`updatedAt` reflect the
//! store's clock and numeric increments apply against the committed value.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use super::types::Fields;

const SERVER_TIMESTAMP_KEY: &str = "__serverTimestamp";
const INCREMENT_KEY: &str = "__increment";

/// Sentinel resolved to the store's clock at commit time.
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_KEY: true })
}

/// Sentinel resolved to `current value + delta` at commit time.
///
/// A missing or non-numeric current value is treated as zero.
pub fn increment(delta: f64) -> Value {
    json!({ INCREMENT_KEY: delta })
}

/// Whether a value is one of the transform sentinels.
pub fn is_transform(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => map.contains_key(SERVER_TIMESTAMP_KEY) || map.contains_key(INCREMENT_KEY),
        None => false,
    }
}

/// Resolves every transform sentinel in `patch` against the current
/// document body and the commit timestamp. Non-sentinel values pass
/// through untouched.
pub fn resolve_transforms(patch: &mut Fields, current: Option<&Fields>, now: DateTime<Utc>) {
    let stamp = Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true));

    for (field, value) in patch.iter_mut() {
        let Some(map) = value.as_object() else {
            continue;
        };

        if map.contains_key(SERVER_TIMESTAMP_KEY) {
            *value = stamp.clone();
        } else if let Some(delta) = map.get(INCREMENT_KEY).and_then(Value::as_f64) {
            let base = current.and_then(|fields| fields.get(field));
            // Integer arithmetic stays integral so integer-typed fields
            // survive repeated increments
            let base_int = match base {
                Some(value) => value.as_i64(),
                None => Some(0),
            };
            *value = match base_int {
                Some(base) if delta.fract() == 0.0 => json!(base + delta as i64),
                _ => {
                    let base = base.and_then(Value::as_f64).unwrap_or(0.0);
                    json!(base + delta)
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_timestamp_sentinel_resolves_to_commit_clock() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut patch = fields(json!({"updatedAt": server_timestamp(), "make": "BMW"}));

        resolve_transforms(&mut patch, None, now);

        assert_eq!(patch["updatedAt"], json!("2024-06-01T12:00:00.000000Z"));
        assert_eq!(patch["make"], json!("BMW"));
    }

    #[test]
    fn test_increment_applies_against_current_value() {
        let now = Utc::now();
        let current = fields(json!({"views": 41}));
        let mut patch = fields(json!({"views": increment(1.0)}));

        resolve_transforms(&mut patch, Some(&current), now);

        assert_eq!(patch["views"], json!(42));
    }

    #[test]
    fn test_increment_on_missing_field_starts_at_zero() {
        let now = Utc::now();
        let mut patch = fields(json!({"views": increment(3.0)}));

        resolve_transforms(&mut patch, None, now);

        assert_eq!(patch["views"], json!(3));
    }

    #[test]
    fn test_fractional_increment_goes_through_floats() {
        let now = Utc::now();
        let current = fields(json!({"rating": 4.0}));
        let mut patch = fields(json!({"rating": increment(0.5)}));

        resolve_transforms(&mut patch, Some(&current), now);

        assert_eq!(patch["rating"], json!(4.5));
    }

    #[test]
    fn test_plain_objects_pass_through() {
        let now = Utc::now();
        let mut patch = fields(json!({"specs": {"doors": 4}}));

        resolve_transforms(&mut patch, None, now);

        assert_eq!(patch["specs"], json!({"doors": 4}));
    }

    #[test]
    fn test_is_transform() {
        assert!(is_transform(&server_timestamp()));
        assert!(is_transform(&increment(1.0)));
        assert!(!is_transform(&json!({"doors": 4})));
        assert!(!is_transform(&json!(42)));
    }
}
