//! Deep structural equality
//!
//! Sequences compare element-wise, mappings by key set regardless of key
//! order, references by target id. A reference equals a mapping holding only
//! the same `$reference` string, since both read the same on the wire.
//! Numbers compare numerically, so `1` and `1.0` are equal and so are `0`
//! and `-0`.

use crate::value::{Mapping, Value, REFERENCE_KEY};
use serde_json::Number;

/// Returns true if `a` and `b` are structurally equal
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Reference(a), Value::Reference(b)) => a == b,
        (Value::Reference(id), Value::Mapping(mapping))
        | (Value::Mapping(mapping), Value::Reference(id)) => {
            spelled_reference(mapping) == Some(id.as_str())
        }
        (Value::Sequence(a), Value::Sequence(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| deep_equal(a, b))
        }
        (Value::Mapping(a), Value::Mapping(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, a)| match b.get(key) {
                    Some(b) => deep_equal(a, b),
                    None => false,
                })
        }
        _ => false,
    }
}

fn spelled_reference(mapping: &Mapping) -> Option<&str> {
    match mapping.get(REFERENCE_KEY) {
        Some(Value::String(id)) if mapping.len() == 1 => Some(id),
        _ => None,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        deep_equal(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_primitives() {
        assert!(deep_equal(&v(json!(null)), &v(json!(null))));
        assert!(deep_equal(&v(json!("a")), &v(json!("a"))));
        assert!(!deep_equal(&v(json!("a")), &v(json!("b"))));
        assert!(!deep_equal(&v(json!(false)), &v(json!(null))));
        assert!(!deep_equal(&v(json!(0)), &v(json!(false))));
        assert!(!deep_equal(&v(json!("1")), &v(json!(1))));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(deep_equal(&v(json!(1)), &v(json!(1.0))));
        assert!(deep_equal(&v(json!(-0.0)), &v(json!(0))));
        assert!(deep_equal(&v(json!(u64::MAX)), &v(json!(u64::MAX))));
        assert!(!deep_equal(&v(json!(-1)), &v(json!(1))));
        assert!(!deep_equal(&v(json!(0.5)), &v(json!(0.25))));
    }

    #[test]
    fn test_sequences() {
        assert!(deep_equal(&v(json!([1, [2, 3]])), &v(json!([1, [2, 3]]))));
        assert!(!deep_equal(&v(json!([1, 2])), &v(json!([1, 2, 3]))));
        assert!(!deep_equal(&v(json!([1, 2])), &v(json!([2, 1]))));
    }

    #[test]
    fn test_mappings_ignore_key_order() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": {"c": [true]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": {"c": [true]}, "a": 1}"#).unwrap();
        assert!(deep_equal(&a, &b));

        assert!(!deep_equal(&v(json!({ "a": 1 })), &v(json!({ "b": 1 }))));
        assert!(!deep_equal(&v(json!({ "a": 1 })), &v(json!({ "a": 1, "b": 2 }))));
        assert!(!deep_equal(&v(json!({ "a": null })), &v(json!({}))));
    }

    #[test]
    fn test_sequence_is_not_mapping() {
        assert!(!deep_equal(&v(json!([])), &v(json!({}))));
        assert!(!deep_equal(&v(json!({ "0": "a" })), &v(json!(["a"]))));
    }

    #[test]
    fn test_references_compare_by_id() {
        assert!(deep_equal(&Value::reference("a"), &Value::reference("a")));
        assert!(!deep_equal(&Value::reference("a"), &Value::reference("b")));
        assert!(!deep_equal(&Value::reference("a"), &Value::from("a")));
    }

    #[test]
    fn test_reference_equals_its_spelled_out_mapping() {
        let spelled = Value::reference("a").to_plain();
        assert!(spelled.as_mapping().is_some());
        assert!(deep_equal(&Value::reference("a"), &spelled));
        assert!(deep_equal(&spelled, &Value::reference("a")));
        assert!(!deep_equal(&Value::reference("b"), &spelled));

        let mut extra = spelled.as_mapping().unwrap().clone();
        extra.insert("k".to_string(), v(json!(1)));
        assert!(!deep_equal(&Value::reference("a"), &Value::Mapping(extra)));
    }
}
