/// Tests for runtime type descriptors and the annotation parser.
use valtype::types::{ArrayLength, RecordType, TypeKind};
use valtype::{parse_type, RuntimeType, TypeRef};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ty(src: &str) -> TypeRef {
    parse_type(src).unwrap_or_else(|e| panic!("parse of {:?} failed: {}", src, e))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn parses_simple_and_builtin_types() {
    for (src, kind) in [
        ("()", TypeKind::Nil),
        ("boolean", TypeKind::Boolean),
        ("byte", TypeKind::Byte),
        ("decimal", TypeKind::Decimal),
        ("anydata", TypeKind::Anydata),
        ("xml", TypeKind::Xml),
        ("error", TypeKind::Error),
        ("future", TypeKind::Future),
    ] {
        assert_eq!(ty(src).kind(), kind, "{}", src);
    }
}

#[test]
fn parses_containers() {
    assert_eq!(
        *ty("string[4]"),
        RuntimeType::Array {
            element: RuntimeType::string(),
            length: ArrayLength::Fixed(4),
        }
    );
    assert_eq!(
        ty("[int, string...]"),
        RuntimeType::tuple_with_rest(vec![RuntimeType::int()], RuntimeType::string())
    );
    assert_eq!(ty("map<int[]>"), RuntimeType::map(RuntimeType::array(RuntimeType::int())));
}

#[test]
fn parses_records() {
    let parsed = ty("record {| int id; string name?; readonly int[] tags; |}");
    let built = RecordType::new()
        .field("id", RuntimeType::int())
        .optional_field("name", RuntimeType::string())
        .readonly_field("tags", RuntimeType::array(RuntimeType::int()))
        .sealed()
        .build();
    assert_eq!(parsed, built);

    let RuntimeType::Record(record) = &*parsed else {
        panic!("expected record, got {}", parsed);
    };
    let required: Vec<&String> = record.required_fields().map(|(name, _)| name).collect();
    assert_eq!(required, vec!["id", "tags"]);
    assert!(record.extra_field_type().is_none());
}

#[test]
fn open_record_extras_are_anydata() {
    let parsed = ty("record { int id; }");
    let RuntimeType::Record(record) = &*parsed else {
        panic!("expected record");
    };
    assert_eq!(record.extra_field_type(), Some(RuntimeType::anydata()));
}

#[test]
fn union_keeps_declaration_order() {
    let RuntimeType::Union(members) = &*ty("string|int|()") else {
        panic!("expected union");
    };
    let kinds: Vec<TypeKind> = members.iter().map(|m| m.kind()).collect();
    assert_eq!(kinds, vec![TypeKind::String, TypeKind::Int, TypeKind::Nil]);
}

#[test]
fn readonly_binds_looser_than_union() {
    let t = ty("readonly & (int[]|string)");
    assert_eq!(t.kind(), TypeKind::Readonly);
    assert!(t.is_immutable());
    assert_eq!(t.to_string(), "readonly & (int[]|string)");
}

#[test]
fn malformed_annotations_report_errors() {
    for src in ["int[", "map<>", "record { int; }", "[int,", "int string"] {
        assert!(parse_type(src).is_err(), "{} should not parse", src);
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[test]
fn immutability_of_descriptors() {
    assert!(ty("int|string").is_immutable());
    assert!(ty("error").is_immutable());
    assert!(!ty("int[]").is_immutable());
    assert!(!ty("int|int[]").is_immutable());
    assert!(ty("readonly & map<int>").is_immutable());
}

#[test]
fn nil_permission() {
    assert!(ty("json").permits_nil());
    assert!(ty("string?").permits_nil());
    assert!(!ty("any[]").permits_nil());
    assert!(!ty("string").permits_nil());
}

#[test]
fn ordered_kinds() {
    for kind in [TypeKind::Int, TypeKind::Float, TypeKind::String, TypeKind::Boolean] {
        assert!(kind.is_ordered());
    }
    for kind in [TypeKind::Nil, TypeKind::Map, TypeKind::Record, TypeKind::Xml] {
        assert!(!kind.is_ordered());
    }
}

#[test]
fn descriptors_are_shareable_across_threads() {
    let t = ty("record { int id; }");
    let handle = std::thread::spawn({
        let t = t.clone();
        move || t.to_string()
    });
    assert_eq!(handle.join().unwrap(), t.to_string());
}
