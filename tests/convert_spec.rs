/// Tests for the conversion engine.
use rust_decimal::Decimal;

use valtype::json::{parse_json, to_json_string};
use valtype::types::{ObjectType, RecordType};
use valtype::{parse_type, ErrorCategory, ErrorKind, Heap, RuntimeType, TypeRef, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ty(src: &str) -> TypeRef {
    parse_type(src).expect("type parse failed")
}

fn json(heap: &mut Heap, text: &str) -> Value {
    parse_json(heap, text).expect("json parse failed")
}

fn convert(heap: &mut Heap, value: &Value, target: &str) -> Value {
    heap.convert(value, &ty(target))
        .unwrap_or_else(|e| panic!("convert to {} failed: {}", target, e))
}

fn convert_err(heap: &mut Heap, value: &Value, target: &str) -> ErrorKind {
    match heap.convert(value, &ty(target)) {
        Ok(v) => panic!("convert to {} unexpectedly succeeded: {}", target, heap.repr(&v)),
        Err(e) => e.kind(),
    }
}

fn person_type() -> TypeRef {
    RecordType::new()
        .named("Person")
        .field("name", RuntimeType::string())
        .field("age", RuntimeType::int())
        .sealed()
        .build()
}

// ---------------------------------------------------------------------------
// Records and JSON
// ---------------------------------------------------------------------------

#[test]
fn record_json_round_trip() {
    let mut heap = Heap::new();
    let person = person_type();
    let v = heap.new_record(
        person.clone(),
        [("name", Value::str("Ada")), ("age", Value::Int(36))],
    );

    let as_json = heap.convert(&v, &RuntimeType::json()).unwrap();
    assert_eq!(heap.type_of(&as_json), RuntimeType::json_object());
    assert_eq!(to_json_string(&heap, &as_json).unwrap(), r#"{"name":"Ada","age":36}"#);

    let back = heap.convert(&as_json, &person).unwrap();
    assert_eq!(heap.type_of(&back), person);
    assert!(heap.equals(&back, &v));
}

#[test]
fn numeric_strings_convert_into_int_fields() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"name": "a", "age": "12"}"#);
    let out = heap.convert(&v, &person_type()).unwrap();
    assert_eq!(heap.require_field(&out, "age").unwrap(), Value::Int(12));
}

#[test]
fn missing_field_fails_atomically() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"name": "a"}"#);
    let before = heap.len();
    let err = heap.convert(&v, &person_type()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingFieldInJson);
    assert_eq!(err.category(), ErrorCategory::MissingOrUnknownField);
    assert_eq!(heap.len(), before);
}

#[test]
fn bad_field_value_is_reported_against_the_field() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"name": "a", "age": "old"}"#);
    let err = heap.convert(&v, &person_type()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleFieldTypeForCasting);
    assert!(err.message().contains("field 'age'"), "{}", err.message());
}

#[test]
fn non_mapping_cannot_become_a_record() {
    let mut heap = Heap::new();
    let v = json(&mut heap, "[1]");
    assert_eq!(
        convert_err(&mut heap, &v, "record { int a; }"),
        ErrorKind::IncompatibleTypeForCastingJson
    );
    assert_eq!(
        convert_err(&mut heap, &Value::Int(1), "record { int a; }"),
        ErrorKind::IncompatibleTypeForCastingJson
    );
}

#[test]
fn closed_record_rejects_unknown_fields() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"name": "a", "age": 1, "x": 0}"#);
    let err = heap.convert(&v, &person_type()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownFieldJsonStruct);
}

#[test]
fn open_record_copies_extras_as_json() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"id": "1", "extra": [1, 2]}"#);
    let out = convert(&mut heap, &v, "record { int id; }");
    assert_eq!(heap.require_field(&out, "id").unwrap(), Value::Int(1));

    let extra_in = heap.require_field(&v, "extra").unwrap();
    let extra_out = heap.require_field(&out, "extra").unwrap();
    assert_ne!(extra_in, extra_out);
    assert_eq!(heap.type_of(&extra_out), RuntimeType::json_array());
    assert!(heap.equals(&extra_in, &extra_out));
}

#[test]
fn json_projection_of_xml_fails() {
    let mut heap = Heap::new();
    let x = heap.new_xml(vec![valtype::xml::XmlItem::text("t")]);
    let list = heap.new_array(RuntimeType::anydata(), vec![Value::Int(1), x]);
    assert_eq!(
        convert_err(&mut heap, &list, "json"),
        ErrorKind::IncompatibleConvertOperation
    );
}

// ---------------------------------------------------------------------------
// Simple values
// ---------------------------------------------------------------------------

#[test]
fn nil_converts_only_to_nil_permitting_types() {
    let mut heap = Heap::new();
    assert_eq!(convert_err(&mut heap, &Value::Nil, "int"), ErrorKind::CannotConvertNil);
    assert_eq!(convert_err(&mut heap, &Value::Nil, "string"), ErrorKind::CannotConvertNil);
    assert_eq!(convert(&mut heap, &Value::Nil, "int?"), Value::Nil);
}

#[test]
fn float_to_int_truncates() {
    let mut heap = Heap::new();
    assert_eq!(convert(&mut heap, &Value::Float(2.9), "int"), Value::Int(2));
    assert_eq!(convert(&mut heap, &Value::Float(-2.9), "int"), Value::Int(-2));
}

#[test]
fn float_out_of_int_range_is_too_large() {
    let mut heap = Heap::new();
    assert_eq!(
        convert_err(&mut heap, &Value::Float(1e20), "int"),
        ErrorKind::IndexNumberTooLarge
    );
    for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert_eq!(
            convert_err(&mut heap, &Value::Float(f), "int"),
            ErrorKind::IncompatibleSimpleTypeConvertOperation
        );
    }
}

#[test]
fn widening_and_decimal_conversions() {
    let mut heap = Heap::new();
    assert_eq!(convert(&mut heap, &Value::Int(3), "decimal"), Value::Decimal(Decimal::from(3)));
    assert_eq!(
        convert(&mut heap, &Value::Decimal(Decimal::new(15, 1)), "float"),
        Value::Float(1.5)
    );
    assert_eq!(
        convert(&mut heap, &Value::str("3.25"), "decimal"),
        Value::Decimal(Decimal::new(325, 2))
    );
    assert_eq!(convert(&mut heap, &Value::Int(255), "byte"), Value::Byte(255));
    assert_eq!(
        convert_err(&mut heap, &Value::Int(256), "byte"),
        ErrorKind::IncompatibleSimpleTypeConvertOperation
    );
}

#[test]
fn strings_parse_into_simple_types() {
    let mut heap = Heap::new();
    assert_eq!(convert(&mut heap, &Value::str(" true "), "boolean"), Value::Boolean(true));
    assert_eq!(convert(&mut heap, &Value::str("-7"), "int"), Value::Int(-7));
    assert_eq!(
        convert_err(&mut heap, &Value::str("abc"), "float"),
        ErrorKind::IncompatibleSimpleTypeConvertOperation
    );
    assert_eq!(convert(&mut heap, &Value::str("1e3"), "float"), Value::Float(1000.0));
    assert_eq!(
        convert(&mut heap, &Value::str("-Infinity"), "float"),
        Value::Float(f64::NEG_INFINITY)
    );
    for text in ["inf", "nan", "infinity"] {
        assert_eq!(
            convert_err(&mut heap, &Value::str(text), "float"),
            ErrorKind::IncompatibleSimpleTypeConvertOperation
        );
    }
}

#[test]
fn values_stringify() {
    let mut heap = Heap::new();
    assert_eq!(convert(&mut heap, &Value::Float(1.0), "string"), Value::str("1.0"));
    assert_eq!(convert(&mut heap, &Value::Boolean(false), "string"), Value::str("false"));
    let v = json(&mut heap, r#"[1, "a", {"k": null}]"#);
    assert_eq!(
        convert(&mut heap, &v, "string"),
        Value::str(r#"[1,"a",{"k":null}]"#)
    );
}

// ---------------------------------------------------------------------------
// Unions and containers
// ---------------------------------------------------------------------------

#[test]
fn union_tries_members_in_order() {
    let mut heap = Heap::new();
    assert_eq!(convert(&mut heap, &Value::str("12"), "int|float"), Value::Int(12));
    assert_eq!(convert(&mut heap, &Value::str("1.5"), "int|float"), Value::Float(1.5));
    assert_eq!(
        convert_err(&mut heap, &Value::str("x"), "int|boolean"),
        ErrorKind::IncompatibleConvertOperation
    );
}

#[test]
fn union_prefers_exactly_conforming_member() {
    let mut heap = Heap::new();
    assert_eq!(convert(&mut heap, &Value::Float(2.5), "int|float"), Value::Float(2.5));
}

#[test]
fn arrays_convert_element_wise() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"[1, "2", 3.9]"#);
    let out = convert(&mut heap, &v, "int[]");
    assert_eq!(heap.type_of(&out), ty("int[]"));
    let items: Vec<Value> = (0..3).map(|i| heap.get_index(&out, i).unwrap()).collect();
    assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

    assert_eq!(convert_err(&mut heap, &v, "int[2]"), ErrorKind::IllegalArraySize);
}

#[test]
fn tuples_convert_member_wise() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"["a", "5"]"#);
    let out = convert(&mut heap, &v, "[string, int]");
    assert_eq!(heap.get_index(&out, 1).unwrap(), Value::Int(5));
    assert_eq!(convert_err(&mut heap, &v, "[string]"), ErrorKind::IllegalTupleSize);
}

#[test]
fn maps_convert_their_values() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"a": 1, "b": true}"#);
    let out = convert(&mut heap, &v, "map<string>");
    assert_eq!(heap.require_field(&out, "a").unwrap(), Value::str("1"));
    assert_eq!(heap.require_field(&out, "b").unwrap(), Value::str("true"));
}

// ---------------------------------------------------------------------------
// Readonly, cycles and identity kinds
// ---------------------------------------------------------------------------

#[test]
fn readonly_target_freezes_result() {
    let mut heap = Heap::new();
    let v = json(&mut heap, r#"{"a": [1]}"#);
    let out = convert(&mut heap, &v, "readonly & map<int[]>");
    assert!(heap.is_readonly(&out));
    assert!(!heap.has_mutable_reachable(&out));
    assert_eq!(heap.type_of(&out), ty("readonly & map<int[]>"));
    assert!(!heap.is_readonly(&v));
}

#[test]
fn readonly_source_of_target_type_is_shared() {
    let mut heap = Heap::new();
    let v = json(&mut heap, "[1, 2]");
    heap.freeze(&v).unwrap();
    let before = heap.len();
    assert_eq!(convert(&mut heap, &v, "json[]"), v);
    assert_eq!(heap.len(), before);
}

#[test]
fn cyclic_value_fails_conversion() {
    let mut heap = Heap::new();
    let a = heap.new_array(RuntimeType::any(), vec![Value::Int(1)]);
    heap.push(&a, a.clone()).unwrap();
    let before = heap.len();
    assert_eq!(convert_err(&mut heap, &a, "json"), ErrorKind::CyclicValueReference);
    assert_eq!(heap.len(), before);
}

#[test]
fn objects_convert_only_to_conforming_object_types() {
    let mut heap = Heap::new();
    let point = ObjectType::new().field("x", RuntimeType::int()).build();
    let obj = heap.new_object(point.clone(), [("x", Value::Int(1))]);
    assert_eq!(heap.convert(&obj, &point).unwrap(), obj);

    let other = ObjectType::new().field("y", RuntimeType::int()).build();
    let err = heap.convert(&obj, &other).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleConvertOperation);
}
