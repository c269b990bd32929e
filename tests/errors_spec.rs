/// Tests for the runtime error catalogue.
use std::collections::HashSet;

use valtype::{ErrorCategory, ErrorKind, RuntimeError};

#[test]
fn every_kind_has_a_distinct_code_and_key() {
    let codes: HashSet<&str> = ErrorKind::ALL.iter().map(|k| k.code()).collect();
    let keys: HashSet<&str> = ErrorKind::ALL.iter().map(|k| k.message_key()).collect();
    assert_eq!(codes.len(), ErrorKind::ALL.len());
    assert_eq!(keys.len(), ErrorKind::ALL.len());
}

#[test]
fn codes_follow_runtime_numbering() {
    for kind in ErrorKind::ALL {
        let code = kind.code();
        assert!(code.starts_with("RUNTIME_"), "{}", code);
        assert_eq!(code.len(), "RUNTIME_0000".len(), "{}", code);
    }
    assert_eq!(ErrorKind::TypeCastError.code(), "RUNTIME_0035");
    assert_eq!(ErrorKind::CyclicValueReference.code(), "RUNTIME_0037");
}

#[test]
fn colliding_codes_were_split() {
    assert_eq!(ErrorKind::JTypeCastError.code(), "RUNTIME_0050");
    assert_eq!(ErrorKind::XmlSequenceIndexOutOfRange.code(), "RUNTIME_0083");
    assert_eq!(ErrorKind::CannotConvertNil.code(), "RUNTIME_0038");
    assert_eq!(ErrorKind::TupleIndexOutOfRange.code(), "RUNTIME_0082");
}

#[test]
fn every_category_is_used() {
    let used: HashSet<ErrorCategory> = ErrorKind::ALL.iter().map(|k| k.category()).collect();
    for category in ErrorCategory::ALL {
        assert!(used.contains(&category), "{} has no kinds", category.name());
    }
}

#[test]
fn categories_of_representative_kinds() {
    assert_eq!(ErrorKind::JTypeCastError.category(), ErrorCategory::TypeCast);
    assert_eq!(ErrorKind::CannotConvertNil.category(), ErrorCategory::Conversion);
    assert_eq!(ErrorKind::CannotStampNull.category(), ErrorCategory::Stamp);
    assert_eq!(
        ErrorKind::ObjectInvalidFinalFieldUpdate.category(),
        ErrorCategory::ImmutableValueUpdate
    );
    assert_eq!(
        ErrorKind::IllegalTupleWithRestTypeSize.category(),
        ErrorCategory::IllegalContainerSize
    );
    assert_eq!(
        ErrorKind::UnknownFieldJsonStruct.category(),
        ErrorCategory::MissingOrUnknownField
    );
    assert_eq!(ErrorKind::StringIndexOutOfRange.category(), ErrorCategory::IndexOutOfRange);
}

#[test]
fn category_lookup_ignores_case() {
    assert_eq!(ErrorCategory::from_name("typecasterror"), Some(ErrorCategory::TypeCast));
    assert_eq!(
        ErrorCategory::from_name("IllegalContainerSize"),
        Some(ErrorCategory::IllegalContainerSize)
    );
    assert_eq!(ErrorCategory::from_name("nope"), None);
}

#[test]
fn runtime_error_display_carries_code() {
    let err = RuntimeError::new(ErrorKind::CannotStampNull, "cannot stamp '()' value as type 'json'");
    assert_eq!(
        err.to_string(),
        "cannot stamp '()' value as type 'json' [RUNTIME_0030]"
    );
    assert_eq!(err.message_key(), "cannot.stamp.null");
    assert_eq!(ErrorKind::CannotStampNull.to_string(), "cannot.stamp.null");
}
