/// Runtime value representation.
///
/// Scalars are stored inline and are immutable. Everything with identity
/// (arrays, tuples, maps, records, objects, xml, errors, functions,
/// futures) lives in a `Heap` and is referenced by `Value::Ref`.
use std::fmt;

use rust_decimal::Decimal;

use crate::types::TypeKind;

/// Index of a heap slot. Only meaningful for the heap that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) usize);

impl ValueId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `PartialEq` here is representation equality (same scalar, same slot);
/// structural equality lives in `Heap::equals`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Int(i64),
    Byte(u8),
    Float(f64),
    Decimal(Decimal),
    Str(String),
    Ref(ValueId),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_ref(&self) -> Option<ValueId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Kind of a scalar; `None` for heap references.
    pub fn scalar_kind(&self) -> Option<TypeKind> {
        match self {
            Value::Nil => Some(TypeKind::Nil),
            Value::Boolean(_) => Some(TypeKind::Boolean),
            Value::Int(_) => Some(TypeKind::Int),
            Value::Byte(_) => Some(TypeKind::Byte),
            Value::Float(_) => Some(TypeKind::Float),
            Value::Decimal(_) => Some(TypeKind::Decimal),
            Value::Str(_) => Some(TypeKind::String),
            Value::Ref(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ValueId> for Value {
    fn from(id: ValueId) -> Self {
        Value::Ref(id)
    }
}

/// Text form of a scalar as produced by `toString`-style stringification.
pub(crate) fn scalar_repr(val: &Value) -> Option<String> {
    match val {
        Value::Nil => Some(String::new()),
        Value::Boolean(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Byte(b) => Some(b.to_string()),
        Value::Float(f) => Some(float_repr(*f)),
        Value::Decimal(d) => Some(d.normalize().to_string()),
        Value::Str(s) => Some(s.clone()),
        Value::Ref(_) => None,
    }
}

fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}
