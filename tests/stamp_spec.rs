/// Tests for clone and stamp.
use valtype::json::parse_json;
use valtype::types::ObjectType;
use valtype::{
    parse_type, Body, CastMode, ErrorCategory, ErrorKind, Heap, RuntimeType, TypeRef, Value,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ty(src: &str) -> TypeRef {
    parse_type(src).expect("type parse failed")
}

fn json(heap: &mut Heap, text: &str) -> Value {
    parse_json(heap, text).expect("json parse failed")
}

fn stamp_err(heap: &mut Heap, value: &Value, target: &str) -> ErrorKind {
    match heap.stamp(value, &ty(target)) {
        Ok(v) => panic!("stamp as {} unexpectedly succeeded: {}", target, heap.repr(&v)),
        Err(e) => e.kind(),
    }
}

/// `a` with `a[0] = a`.
fn self_referencing_array(heap: &mut Heap) -> Value {
    let a = heap.new_array(RuntimeType::any(), vec![]);
    heap.set_index(&a, 0, a.clone()).unwrap();
    a
}

// ---------------------------------------------------------------------------
// Stamp
// ---------------------------------------------------------------------------

#[test]
fn stamp_retypes_a_deep_copy() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"id": 1, "tags": ["a", "b"]}"#);
    let target = ty("record {| int id; string[] tags; |}");
    let out = heap.stamp(&v, &target).unwrap();

    assert_ne!(out, v);
    assert_eq!(heap.type_of(&out), target);
    let tags = heap.require_field(&out, "tags").unwrap();
    assert_eq!(heap.type_of(&tags), ty("string[]"));
    assert_ne!(tags, heap.require_field(&v, "tags").unwrap());
    assert!(heap.equals(&out, &v));
    assert_eq!(heap.type_of(&v), RuntimeType::json_object());
}

#[test]
fn stamp_narrows_ints_to_bytes() {
    let mut heap = Heap::new();
    let v = json(&mut heap, "[1, 2]");
    let out = heap.stamp(&v, &ty("byte[]")).unwrap();
    assert_eq!(heap.get_index(&out, 0).unwrap(), Value::Byte(1));
}

#[test]
fn stamp_mismatch_is_incompatible_stamp_operation() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"[1, "x"]"#);
    let err = heap.stamp(&v, &ty("int[]")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleStampOperation);
    assert_eq!(err.category(), ErrorCategory::Stamp);
    assert_eq!(
        err.message(),
        "incompatible stamp operation: 'json[]' value cannot be stamped as 'int[]'"
    );
}

#[test]
fn failed_stamp_leaves_no_partial_value() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"a": [1], "b": ["x"], "c": [3]}"#);
    let before = heap.len();
    assert_eq!(
        stamp_err(&mut heap, &v, "record {| int[] a; int[] b; int[] c; |}"),
        ErrorKind::IncompatibleStampOperation
    );
    assert_eq!(heap.len(), before);
}

#[test]
fn nil_cannot_be_stamped() {
    let mut heap = Heap::new();
    assert_eq!(stamp_err(&mut heap, &Value::Nil, "json"), ErrorKind::CannotStampNull);
}

#[test]
fn stamp_into_union_uses_first_conforming_member() {
    let mut heap = Heap::new();
    let v = json(&mut heap, "[1]");
    let out = heap.stamp(&v, &ty("string[]|int[]|json[]")).unwrap();
    assert_eq!(heap.type_of(&out), ty("int[]"));
}

#[test]
fn stamp_into_readonly_freezes_the_copy() {
    let mut heap = Heap::new();
    let v = json(&mut heap, "[[1], [2]]");
    let out = heap.stamp(&v, &ty("readonly & int[][]")).unwrap();
    assert!(heap.is_readonly(&out));
    assert!(!heap.has_mutable_reachable(&out));
    assert!(!heap.is_readonly(&v));
}

#[test]
fn stamp_of_readonly_conforming_value_is_shared() {
    let mut heap = Heap::new();
    let v = json(&mut heap, "[1, 2]");
    heap.freeze(&v).unwrap();
    let before = heap.len();

    let out = heap.stamp(&v, &ty("json[]")).unwrap();
    assert_eq!(out, v);
    assert!(heap.is_readonly(&out));
    assert_eq!(heap.len(), before);
    assert_eq!(heap.clone_value(&v).unwrap(), v);
}

#[test]
fn stamp_as_json_rebuilds_containers() {
    let mut heap = Heap::new();
    let v = heap.new_array(RuntimeType::any(), vec![Value::Int(1), Value::str("a")]);
    let out = heap.stamp(&v, &RuntimeType::json()).unwrap();
    assert_eq!(heap.type_of(&out), RuntimeType::json_array());
    assert!(heap.equals(&out, &v));
}

#[test]
fn stamp_of_cyclic_value_fails() {
    let mut heap = Heap::new();
    let a = self_referencing_array(&mut heap);
    let before = heap.len();
    assert_eq!(stamp_err(&mut heap, &a, "any[]"), ErrorKind::CyclicValueReference);
    assert_eq!(stamp_err(&mut heap, &a, "json"), ErrorKind::CyclicValueReference);
    assert_eq!(heap.len(), before);
}

#[test]
fn stamp_through_object_keeps_clone_error() {
    let mut heap = Heap::new();
    let obj = heap.new_object(ObjectType::new().build(), Vec::<(String, Value)>::new());
    let list = heap.new_array(RuntimeType::any(), vec![obj]);
    assert_eq!(stamp_err(&mut heap, &list, "any[]"), ErrorKind::UnsupportedCloneOperation);
}

// ---------------------------------------------------------------------------
// Clone
// ---------------------------------------------------------------------------

#[test]
fn clone_is_independent_of_source() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"a": [1]}"#);
    let copy = heap.clone_value(&v).unwrap();
    let inner = heap.require_field(&copy, "a").unwrap();
    heap.push(&inner, Value::Int(2)).unwrap();

    let original = heap.require_field(&v, "a").unwrap();
    assert_eq!(heap.length(&original), Some(1));
    assert_eq!(heap.length(&inner), Some(2));
    assert_eq!(heap.type_of(&copy), heap.type_of(&v));
}

#[test]
fn clone_shares_readonly_parts() {
    let mut heap = Heap::new();
    let inner = heap.new_array(RuntimeType::int(), vec![Value::Int(1)]);
    heap.freeze(&inner).unwrap();
    let outer = heap.new_map(RuntimeType::any(), [("xs", inner.clone())]);

    let copy = heap.clone_value(&outer).unwrap();
    assert_ne!(copy, outer);
    assert_eq!(heap.require_field(&copy, "xs").unwrap(), inner);
}

#[test]
fn clone_copies_shared_children_separately() {
    let mut heap = Heap::new();
    let shared = heap.new_array(RuntimeType::int(), vec![Value::Int(1)]);
    let outer = heap.new_array(RuntimeType::any(), vec![shared.clone(), shared]);

    let copy = heap.clone_value(&outer).unwrap();
    let first = heap.get_index(&copy, 0).unwrap();
    let second = heap.get_index(&copy, 1).unwrap();
    assert_ne!(first, second);
    assert!(heap.equals(&first, &second));
}

#[test]
fn clone_of_cycle_fails() {
    let mut heap = Heap::new();
    let a = self_referencing_array(&mut heap);
    let err = heap.clone_value(&a).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicValueReference);
    assert_eq!(err.category(), ErrorCategory::CyclicValueReference);
}

#[test]
fn unsupported_clone_sources() {
    let mut heap = Heap::new();
    let f = heap.new_function("f");
    let fut = heap.new_future("job");
    let obj = heap.new_object(ObjectType::new().build(), Vec::<(String, Value)>::new());
    for v in [f, fut, obj] {
        let err = heap.clone_value(&v).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCloneOperation);
    }
}

#[test]
fn error_values_are_shared() {
    let mut heap = Heap::new();
    let e = heap.new_error("boom", None).unwrap();
    assert_eq!(heap.clone_value(&e).unwrap(), e);
}

#[test]
fn clone_readonly_of_frozen_value_is_identity() {
    let mut heap = Heap::new();
    let v = json(&mut heap, "[1]");
    heap.freeze(&v).unwrap();
    assert_eq!(heap.clone_readonly(&v).unwrap(), v);

    let m = json(&mut heap, "[2]");
    let ro = heap.clone_readonly(&m).unwrap();
    assert_ne!(ro, m);
    assert!(heap.is_readonly(&ro));
}

#[test]
fn clone_never_aliases_mutable_error_detail() {
    let mut heap = Heap::new();
    let detail = json(&mut heap, r#"{"k": 1}"#);
    let error = heap.alloc(
        RuntimeType::error(),
        Body::Error {
            message: "boom".to_string(),
            detail: Some(detail.clone()),
        },
    );
    let list = heap.new_array(RuntimeType::any(), vec![error]);

    let copy = heap.clone_value(&list).unwrap();
    heap.set_field(&detail, "k", Value::Int(99)).unwrap();
    let copied = heap.get_index(&copy, 0).unwrap();
    assert_eq!(heap.repr(&copied), "error(\"boom\", {k: 1})");
    assert!(!heap.has_mutable_reachable(&copied));

    let ro = heap.cast(&list, &ty("readonly & error[]"), CastMode::Checked).unwrap();
    assert!(!heap.has_mutable_reachable(&ro));
}
