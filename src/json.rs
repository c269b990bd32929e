/// JSON text bridge.
///
/// Parsed documents become `json`-typed heap values: arrays are `json[]`,
/// objects are `map<json>` with key order preserved. Integral numbers that
/// fit an `i64` become ints, every other number a float.
use indexmap::IndexMap;
use serde_json::{Map, Number};
use thiserror::Error;

use crate::error::{ErrorKind, RuntimeError};
use crate::heap::{Body, Heap, Path};
use crate::types::RuntimeType;
use crate::value::Value;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("number {0} cannot be represented")]
    Number(String),
}

pub fn parse_json(heap: &mut Heap, text: &str) -> Result<Value, JsonError> {
    let doc: serde_json::Value = serde_json::from_str(text)?;
    from_json_value(heap, &doc)
}

pub fn from_json_value(heap: &mut Heap, doc: &serde_json::Value) -> Result<Value, JsonError> {
    Ok(match doc {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => number_value(n)?,
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_json_value(heap, item)?);
            }
            heap.new_list(RuntimeType::json_array(), out)
        }
        serde_json::Value::Object(entries) => {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                out.insert(key.clone(), from_json_value(heap, item)?);
            }
            heap.new_record(RuntimeType::json_object(), out)
        }
    })
}

fn number_value(n: &Number) -> Result<Value, JsonError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| JsonError::Number(n.to_string()))
}

/// JSON document for `value`. Fails for values with no JSON form (xml,
/// objects, errors, functions, non-finite floats) and for cyclic graphs.
pub fn to_json_value(heap: &Heap, value: &Value) -> Result<serde_json::Value, RuntimeError> {
    to_json_inner(heap, value, &mut Path::new())
}

/// Compact JSON text for `value`.
pub fn to_json_string(heap: &Heap, value: &Value) -> Result<String, RuntimeError> {
    Ok(to_json_value(heap, value)?.to_string())
}

fn to_json_inner(heap: &Heap, value: &Value, path: &mut Path) -> Result<serde_json::Value, RuntimeError> {
    let id = match value {
        Value::Nil => return Ok(serde_json::Value::Null),
        Value::Boolean(b) => return Ok(serde_json::Value::Bool(*b)),
        Value::Int(i) => return Ok((*i).into()),
        Value::Byte(b) => return Ok((*b).into()),
        Value::Float(f) => {
            return Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| no_json_form(heap, value))
        }
        Value::Decimal(d) => {
            use rust_decimal::prelude::ToPrimitive;
            return d
                .to_f64()
                .and_then(Number::from_f64)
                .map(serde_json::Value::Number)
                .ok_or_else(|| no_json_form(heap, value));
        }
        Value::Str(s) => return Ok(serde_json::Value::String(s.clone())),
        Value::Ref(id) => *id,
    };
    if !path.insert(id) {
        return Err(heap.cyclic(value));
    }
    let result = match heap.get(id).body() {
        Body::List(items) => items
            .iter()
            .map(|item| to_json_inner(heap, item, path))
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        Body::Mapping(entries) => entries
            .iter()
            .map(|(key, item)| Ok((key.clone(), to_json_inner(heap, item, path)?)))
            .collect::<Result<Map<_, _>, RuntimeError>>()
            .map(serde_json::Value::Object),
        _ => Err(no_json_form(heap, value)),
    };
    path.remove(&id);
    result
}

fn no_json_form(heap: &Heap, value: &Value) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::IncompatibleConvertOperation,
        format!(
            "incompatible convert operation: '{}' value '{}' has no JSON representation",
            heap.type_of(value),
            heap.repr(value)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_into_json_typed_values() {
        let mut heap = Heap::new();
        let v = parse_json(&mut heap, r#"{"b": [1, 2.5, null], "a": "x"}"#).unwrap();
        assert_eq!(heap.type_of(&v), RuntimeType::json_object());
        let b = heap.require_field(&v, "b").unwrap();
        assert_eq!(heap.type_of(&b), RuntimeType::json_array());
        assert_eq!(heap.get_index(&b, 0).unwrap(), Value::Int(1));
        assert_eq!(heap.get_index(&b, 1).unwrap(), Value::Float(2.5));
        assert_eq!(heap.get_index(&b, 2).unwrap(), Value::Nil);
    }

    #[test]
    fn key_order_survives_round_trip() {
        let mut heap = Heap::new();
        let text = r#"{"z":1,"a":{"m":true,"b":"s"}}"#;
        let v = parse_json(&mut heap, text).unwrap();
        assert_eq!(to_json_string(&heap, &v).unwrap(), text);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut heap = Heap::new();
        let err = parse_json(&mut heap, "[1, ").unwrap_err();
        assert!(matches!(err, JsonError::Syntax(_)));
        assert!(err.to_string().starts_with("invalid JSON"));
    }

    #[test]
    fn nan_has_no_json_form() {
        let heap = Heap::new();
        let err = to_json_value(&heap, &Value::Float(f64::NAN)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleConvertOperation);
    }

    #[test]
    fn cyclic_list_fails_to_serialize() {
        let mut heap = Heap::new();
        let list = heap.new_array(RuntimeType::json(), vec![]);
        heap.push(&list, list.clone()).unwrap();
        let err = to_json_string(&heap, &list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicValueReference);
    }

    #[test]
    fn bytes_serialize_as_numbers() {
        let mut heap = Heap::new();
        let list = heap.new_array(RuntimeType::byte(), vec![Value::Byte(7), Value::Byte(255)]);
        assert_eq!(to_json_string(&heap, &list).unwrap(), "[7,255]");
    }
}
