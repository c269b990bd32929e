/// Runtime error taxonomy.
///
/// Every failure raised by the value engines carries an `ErrorKind`, which
/// pins a stable `(message key, diagnostic code)` pair. Tooling matches on
/// the diagnostic code, so existing pairs must never be renumbered.
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IndexNumberTooLarge,
    ArrayIndexOutOfRange,
    IncompatibleType,
    CastingWithoutRequiredField,
    CastingFailedWithCause,
    MissingFieldInJson,
    CannotSetValueIncompatibleTypes,
    IncompatibleFieldTypeForCasting,
    IncompatibleTypeForCastingJson,
    ArrayTypeMismatch,
    UnknownFieldJsonStruct,
    InvalidMapInsertion,
    IncompatibleStampOperation,
    CannotStampNull,
    UnsupportedCloneOperation,
    InvalidRecordFieldAccess,
    InvalidRecordFieldAddition,
    InvalidObjectFieldAddition,
    TypeCastError,
    JTypeCastError,
    CyclicValueReference,
    CannotConvertNil,
    IncompatibleConvertOperation,
    IncompatibleSimpleTypeConvertOperation,
    TupleIndexOutOfRange,
    IllegalArrayInsertion,
    IllegalTupleInsertion,
    IllegalArraySize,
    IllegalTupleSize,
    IllegalTupleWithRestTypeSize,
    StringIndexOutOfRange,
    InvalidSubstringRange,
    XmlSequenceIndexOutOfRange,
    RecordInvalidReadonlyFieldUpdate,
    InvalidReadonlyValueUpdate,
    ObjectInvalidFinalFieldUpdate,
    UnsupportedComparisonOperation,
    UnorderedTypesInComparison,
}

/// Coarse grouping used by callers that only care about the family of a
/// failure (e.g. a connector mapping conversion failures to 400 responses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    TypeCast,
    Conversion,
    Stamp,
    CyclicValueReference,
    ImmutableValueUpdate,
    IndexOutOfRange,
    IllegalContainerSize,
    MissingOrUnknownField,
    UnsupportedComparison,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 38] = [
        ErrorKind::IndexNumberTooLarge,
        ErrorKind::ArrayIndexOutOfRange,
        ErrorKind::IncompatibleType,
        ErrorKind::CastingWithoutRequiredField,
        ErrorKind::CastingFailedWithCause,
        ErrorKind::MissingFieldInJson,
        ErrorKind::CannotSetValueIncompatibleTypes,
        ErrorKind::IncompatibleFieldTypeForCasting,
        ErrorKind::IncompatibleTypeForCastingJson,
        ErrorKind::ArrayTypeMismatch,
        ErrorKind::UnknownFieldJsonStruct,
        ErrorKind::InvalidMapInsertion,
        ErrorKind::IncompatibleStampOperation,
        ErrorKind::CannotStampNull,
        ErrorKind::UnsupportedCloneOperation,
        ErrorKind::InvalidRecordFieldAccess,
        ErrorKind::InvalidRecordFieldAddition,
        ErrorKind::InvalidObjectFieldAddition,
        ErrorKind::TypeCastError,
        ErrorKind::JTypeCastError,
        ErrorKind::CyclicValueReference,
        ErrorKind::CannotConvertNil,
        ErrorKind::IncompatibleConvertOperation,
        ErrorKind::IncompatibleSimpleTypeConvertOperation,
        ErrorKind::TupleIndexOutOfRange,
        ErrorKind::IllegalArrayInsertion,
        ErrorKind::IllegalTupleInsertion,
        ErrorKind::IllegalArraySize,
        ErrorKind::IllegalTupleSize,
        ErrorKind::IllegalTupleWithRestTypeSize,
        ErrorKind::StringIndexOutOfRange,
        ErrorKind::InvalidSubstringRange,
        ErrorKind::XmlSequenceIndexOutOfRange,
        ErrorKind::RecordInvalidReadonlyFieldUpdate,
        ErrorKind::InvalidReadonlyValueUpdate,
        ErrorKind::ObjectInvalidFinalFieldUpdate,
        ErrorKind::UnsupportedComparisonOperation,
        ErrorKind::UnorderedTypesInComparison,
    ];

    /// `(message key, diagnostic code)`.
    fn pair(self) -> (&'static str, &'static str) {
        match self {
            ErrorKind::IndexNumberTooLarge => ("index.number.too.large", "RUNTIME_0003"),
            ErrorKind::ArrayIndexOutOfRange => ("array.index.out.of.range", "RUNTIME_0004"),
            ErrorKind::IncompatibleType => ("incompatible.types", "RUNTIME_0005"),
            ErrorKind::CastingWithoutRequiredField => {
                ("casting.without.required.field", "RUNTIME_0006")
            }
            ErrorKind::CastingFailedWithCause => ("casting.failed.with.cause", "RUNTIME_0007"),
            ErrorKind::MissingFieldInJson => ("missing.field.in.json", "RUNTIME_0008"),
            ErrorKind::CannotSetValueIncompatibleTypes => {
                ("cannot.set.value.incompatible.types", "RUNTIME_0009")
            }
            ErrorKind::IncompatibleFieldTypeForCasting => {
                ("incompatible.field.type.for.casting", "RUNTIME_0011")
            }
            ErrorKind::IncompatibleTypeForCastingJson => {
                ("incompatible.types.in.json", "RUNTIME_0012")
            }
            ErrorKind::ArrayTypeMismatch => ("from.and.to.array.type.mismatch", "RUNTIME_0015"),
            ErrorKind::UnknownFieldJsonStruct => ("unknown.field.in.json.struct", "RUNTIME_0019"),
            ErrorKind::InvalidMapInsertion => ("invalid.map.insertion", "RUNTIME_0023"),
            ErrorKind::IncompatibleStampOperation => {
                ("incompatible.stamp.operation", "RUNTIME_0029")
            }
            ErrorKind::CannotStampNull => ("cannot.stamp.null", "RUNTIME_0030"),
            ErrorKind::UnsupportedCloneOperation => ("unsupported.clone.operation", "RUNTIME_0031"),
            ErrorKind::InvalidRecordFieldAccess => ("invalid.record.field.access", "RUNTIME_0032"),
            ErrorKind::InvalidRecordFieldAddition => {
                ("invalid.record.field.addition", "RUNTIME_0033")
            }
            ErrorKind::InvalidObjectFieldAddition => {
                ("invalid.object.field.addition", "RUNTIME_0034")
            }
            ErrorKind::TypeCastError => ("incompatible.types.cannot.cast", "RUNTIME_0035"),
            ErrorKind::JTypeCastError => ("incompatible.jtypes.cannot.cast", "RUNTIME_0050"),
            ErrorKind::CyclicValueReference => ("cyclic.value.reference", "RUNTIME_0037"),
            ErrorKind::CannotConvertNil => ("cannot.convert.nil", "RUNTIME_0038"),
            ErrorKind::IncompatibleConvertOperation => {
                ("incompatible.convert.operation", "RUNTIME_0039")
            }
            ErrorKind::IncompatibleSimpleTypeConvertOperation => {
                ("incompatible.simple.type.convert.operation", "RUNTIME_0040")
            }
            ErrorKind::IllegalArrayInsertion => ("illegal.array.insertion", "RUNTIME_0041"),
            ErrorKind::IllegalTupleInsertion => ("illegal.tuple.insertion", "RUNTIME_0044"),
            ErrorKind::IllegalArraySize => ("illegal.array.size", "RUNTIME_0045"),
            ErrorKind::IllegalTupleSize => ("illegal.tuple.size", "RUNTIME_0046"),
            ErrorKind::IllegalTupleWithRestTypeSize => ("illegal.rest.tuple.size", "RUNTIME_0047"),
            ErrorKind::StringIndexOutOfRange => ("string.index.out.of.range", "RUNTIME_0048"),
            ErrorKind::InvalidSubstringRange => ("invalid.substring.range", "RUNTIME_0049"),
            ErrorKind::RecordInvalidReadonlyFieldUpdate => {
                ("record.invalid.readonly.field.update", "RUNTIME_0051")
            }
            ErrorKind::InvalidReadonlyValueUpdate => {
                ("invalid.update.on.readonly.value", "RUNTIME_0052")
            }
            ErrorKind::ObjectInvalidFinalFieldUpdate => {
                ("object.invalid.final.field.update", "RUNTIME_0053")
            }
            ErrorKind::UnsupportedComparisonOperation => {
                ("unsupported.comparison.operation", "RUNTIME_0054")
            }
            ErrorKind::UnorderedTypesInComparison => {
                ("unordered.types.in.comparison", "RUNTIME_0055")
            }
            // Codes 0038 and 0050 were each shared by two kinds; these two
            // were moved past the end of the numbering.
            ErrorKind::TupleIndexOutOfRange => ("tuple.index.out.of.range", "RUNTIME_0082"),
            ErrorKind::XmlSequenceIndexOutOfRange => ("xml.index.out.of.range", "RUNTIME_0083"),
        }
    }

    pub fn message_key(self) -> &'static str {
        self.pair().0
    }

    pub fn code(self) -> &'static str {
        self.pair().1
    }

    pub fn category(self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            TypeCastError | JTypeCastError | CastingFailedWithCause | IncompatibleType
            | ArrayTypeMismatch | InvalidMapInsertion | CannotSetValueIncompatibleTypes => {
                ErrorCategory::TypeCast
            }
            CannotConvertNil
            | IncompatibleConvertOperation
            | IncompatibleSimpleTypeConvertOperation
            | IndexNumberTooLarge
            | IncompatibleTypeForCastingJson
            | IncompatibleFieldTypeForCasting => ErrorCategory::Conversion,
            IncompatibleStampOperation | CannotStampNull | UnsupportedCloneOperation => {
                ErrorCategory::Stamp
            }
            CyclicValueReference => ErrorCategory::CyclicValueReference,
            RecordInvalidReadonlyFieldUpdate
            | InvalidReadonlyValueUpdate
            | ObjectInvalidFinalFieldUpdate => ErrorCategory::ImmutableValueUpdate,
            ArrayIndexOutOfRange
            | TupleIndexOutOfRange
            | StringIndexOutOfRange
            | InvalidSubstringRange
            | XmlSequenceIndexOutOfRange => ErrorCategory::IndexOutOfRange,
            IllegalArraySize
            | IllegalTupleSize
            | IllegalTupleWithRestTypeSize
            | IllegalArrayInsertion
            | IllegalTupleInsertion => ErrorCategory::IllegalContainerSize,
            CastingWithoutRequiredField
            | MissingFieldInJson
            | UnknownFieldJsonStruct
            | InvalidRecordFieldAccess
            | InvalidRecordFieldAddition
            | InvalidObjectFieldAddition => ErrorCategory::MissingOrUnknownField,
            UnsupportedComparisonOperation | UnorderedTypesInComparison => {
                ErrorCategory::UnsupportedComparison
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message_key())
    }
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 9] = [
        ErrorCategory::TypeCast,
        ErrorCategory::Conversion,
        ErrorCategory::Stamp,
        ErrorCategory::CyclicValueReference,
        ErrorCategory::ImmutableValueUpdate,
        ErrorCategory::IndexOutOfRange,
        ErrorCategory::IllegalContainerSize,
        ErrorCategory::MissingOrUnknownField,
        ErrorCategory::UnsupportedComparison,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorCategory::TypeCast => "TypeCastError",
            ErrorCategory::Conversion => "ConversionError",
            ErrorCategory::Stamp => "StampError",
            ErrorCategory::CyclicValueReference => "CyclicValueReference",
            ErrorCategory::ImmutableValueUpdate => "ImmutableValueUpdate",
            ErrorCategory::IndexOutOfRange => "IndexOutOfRange",
            ErrorCategory::IllegalContainerSize => "IllegalContainerSize",
            ErrorCategory::MissingOrUnknownField => "MissingOrUnknownField",
            ErrorCategory::UnsupportedComparison => "UnsupportedComparison",
        }
    }

    /// Case-insensitive lookup by `name()`.
    pub fn from_name(name: &str) -> Option<ErrorCategory> {
        ErrorCategory::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// RuntimeError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} [{}]", kind.code())]
pub struct RuntimeError {
    kind: ErrorKind,
    message: String,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message_key(&self) -> &'static str {
        self.kind.message_key()
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
