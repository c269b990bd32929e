/// Runtime type descriptors.
///
/// A `RuntimeType` describes the shape of a value: its kind plus whatever
/// structural detail that kind carries. Descriptors are immutable and
/// shared through `TypeRef`; two descriptors built independently with the
/// same shape compare equal (record and object names are labels only).
///
/// `is_assignable_to` is the static subtype relation. The engines use it as
/// a fast path; when it answers `false` they fall back to checking the
/// concrete value's shape.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

pub mod parse;

pub use parse::{parse_type, TypeParseError};

pub type TypeRef = Arc<RuntimeType>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayLength {
    Open,
    Fixed(usize),
}

/// Fieldless projection of `RuntimeType`, for messages and quick dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Nil,
    Boolean,
    Int,
    Byte,
    Float,
    Decimal,
    String,
    Array,
    Tuple,
    Map,
    Record,
    Object,
    Union,
    Any,
    Anydata,
    Json,
    Xml,
    Error,
    Function,
    Future,
    Readonly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub ty: TypeRef,
    pub optional: bool,
    pub readonly: bool,
}

#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: Option<String>,
    pub fields: IndexMap<String, RecordField>,
    /// Type of fields not declared in `fields`.
    pub rest: Option<TypeRef>,
    /// A sealed record without a rest type rejects undeclared fields.
    pub sealed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    pub ty: TypeRef,
    pub is_final: bool,
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: Option<String>,
    pub fields: IndexMap<String, ObjectField>,
    pub sealed: bool,
    /// Foreign class handle (e.g. `java.lang.String`). Handles are opaque:
    /// they only match a handle type with the same class.
    pub external: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeType {
    Nil,
    Boolean,
    Int,
    Byte,
    Float,
    Decimal,
    String,
    Any,
    Anydata,
    Json,
    Xml,
    Error,
    Function,
    Future,
    Array {
        element: TypeRef,
        length: ArrayLength,
    },
    Tuple {
        members: Vec<TypeRef>,
        rest: Option<TypeRef>,
    },
    Map {
        constraint: TypeRef,
    },
    Record(RecordType),
    Object(ObjectType),
    /// Members keep declaration order; matching picks the first that fits.
    Union(Vec<TypeRef>),
    Readonly(TypeRef),
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.rest == other.rest && self.sealed == other.sealed
    }
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.sealed == other.sealed && self.external == other.external
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

impl RuntimeType {
    pub fn nil() -> TypeRef {
        Arc::new(RuntimeType::Nil)
    }

    pub fn boolean() -> TypeRef {
        Arc::new(RuntimeType::Boolean)
    }

    pub fn int() -> TypeRef {
        Arc::new(RuntimeType::Int)
    }

    pub fn byte() -> TypeRef {
        Arc::new(RuntimeType::Byte)
    }

    pub fn float() -> TypeRef {
        Arc::new(RuntimeType::Float)
    }

    pub fn decimal() -> TypeRef {
        Arc::new(RuntimeType::Decimal)
    }

    pub fn string() -> TypeRef {
        Arc::new(RuntimeType::String)
    }

    pub fn any() -> TypeRef {
        Arc::new(RuntimeType::Any)
    }

    pub fn anydata() -> TypeRef {
        Arc::new(RuntimeType::Anydata)
    }

    pub fn json() -> TypeRef {
        Arc::new(RuntimeType::Json)
    }

    pub fn xml() -> TypeRef {
        Arc::new(RuntimeType::Xml)
    }

    pub fn error() -> TypeRef {
        Arc::new(RuntimeType::Error)
    }

    pub fn function() -> TypeRef {
        Arc::new(RuntimeType::Function)
    }

    pub fn future() -> TypeRef {
        Arc::new(RuntimeType::Future)
    }

    pub fn array(element: TypeRef) -> TypeRef {
        Arc::new(RuntimeType::Array {
            element,
            length: ArrayLength::Open,
        })
    }

    pub fn fixed_array(element: TypeRef, len: usize) -> TypeRef {
        Arc::new(RuntimeType::Array {
            element,
            length: ArrayLength::Fixed(len),
        })
    }

    pub fn tuple(members: Vec<TypeRef>) -> TypeRef {
        Arc::new(RuntimeType::Tuple { members, rest: None })
    }

    pub fn tuple_with_rest(members: Vec<TypeRef>, rest: TypeRef) -> TypeRef {
        Arc::new(RuntimeType::Tuple {
            members,
            rest: Some(rest),
        })
    }

    pub fn map(constraint: TypeRef) -> TypeRef {
        Arc::new(RuntimeType::Map { constraint })
    }

    pub fn union(members: Vec<TypeRef>) -> TypeRef {
        Arc::new(RuntimeType::Union(members))
    }

    /// `T?`, shorthand for `T|()`.
    pub fn optional(inner: TypeRef) -> TypeRef {
        RuntimeType::union(vec![inner, RuntimeType::nil()])
    }

    pub fn readonly(inner: TypeRef) -> TypeRef {
        match &*inner {
            RuntimeType::Readonly(_) => inner,
            _ => Arc::new(RuntimeType::Readonly(inner)),
        }
    }

    /// `map<json>`, the descriptor of a JSON object.
    pub fn json_object() -> TypeRef {
        RuntimeType::map(RuntimeType::json())
    }

    /// `json[]`, the descriptor of a JSON array.
    pub fn json_array() -> TypeRef {
        RuntimeType::array(RuntimeType::json())
    }
}

impl RecordType {
    /// Open record with no fields; chain `field`/`optional_field` to build.
    pub fn new() -> Self {
        RecordType {
            name: None,
            fields: IndexMap::new(),
            rest: None,
            sealed: false,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn field(self, name: &str, ty: TypeRef) -> Self {
        self.with_field(name, ty, false, false)
    }

    pub fn optional_field(self, name: &str, ty: TypeRef) -> Self {
        self.with_field(name, ty, true, false)
    }

    pub fn readonly_field(self, name: &str, ty: TypeRef) -> Self {
        self.with_field(name, ty, false, true)
    }

    pub fn with_field(mut self, name: &str, ty: TypeRef, optional: bool, readonly: bool) -> Self {
        self.fields.insert(
            name.to_string(),
            RecordField {
                ty,
                optional,
                readonly,
            },
        );
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn rest(mut self, ty: TypeRef) -> Self {
        self.sealed = true;
        self.rest = Some(ty);
        self
    }

    pub fn build(self) -> TypeRef {
        Arc::new(RuntimeType::Record(self))
    }

    /// Type every undeclared field must conform to, or `None` when the
    /// record is closed. Open records carry `anydata` extras.
    pub fn extra_field_type(&self) -> Option<TypeRef> {
        match (&self.rest, self.sealed) {
            (Some(rest), _) => Some(rest.clone()),
            (None, false) => Some(RuntimeType::anydata()),
            (None, true) => None,
        }
    }

    pub fn required_fields(&self) -> impl Iterator<Item = (&String, &RecordField)> {
        self.fields.iter().filter(|(_, f)| !f.optional)
    }
}

impl Default for RecordType {
    fn default() -> Self {
        RecordType::new()
    }
}

impl ObjectType {
    pub fn new() -> Self {
        ObjectType {
            name: None,
            fields: IndexMap::new(),
            sealed: false,
            external: None,
        }
    }

    /// Opaque handle to a foreign class.
    pub fn external(class: &str) -> TypeRef {
        Arc::new(RuntimeType::Object(ObjectType {
            name: None,
            fields: IndexMap::new(),
            sealed: true,
            external: Some(class.to_string()),
        }))
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn field(mut self, name: &str, ty: TypeRef) -> Self {
        self.fields.insert(
            name.to_string(),
            ObjectField {
                ty,
                is_final: false,
            },
        );
        self
    }

    pub fn final_field(mut self, name: &str, ty: TypeRef) -> Self {
        self.fields
            .insert(name.to_string(), ObjectField { ty, is_final: true });
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn build(self) -> TypeRef {
        Arc::new(RuntimeType::Object(self))
    }
}

impl Default for ObjectType {
    fn default() -> Self {
        ObjectType::new()
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

impl TypeKind {
    /// Kinds whose values have a total (or IEEE partial) order.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            TypeKind::Boolean
                | TypeKind::Int
                | TypeKind::Byte
                | TypeKind::Float
                | TypeKind::Decimal
                | TypeKind::String
                | TypeKind::Array
                | TypeKind::Tuple
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeKind::Int | TypeKind::Byte | TypeKind::Float | TypeKind::Decimal
        )
    }
}

impl RuntimeType {
    pub fn kind(&self) -> TypeKind {
        match self {
            RuntimeType::Nil => TypeKind::Nil,
            RuntimeType::Boolean => TypeKind::Boolean,
            RuntimeType::Int => TypeKind::Int,
            RuntimeType::Byte => TypeKind::Byte,
            RuntimeType::Float => TypeKind::Float,
            RuntimeType::Decimal => TypeKind::Decimal,
            RuntimeType::String => TypeKind::String,
            RuntimeType::Any => TypeKind::Any,
            RuntimeType::Anydata => TypeKind::Anydata,
            RuntimeType::Json => TypeKind::Json,
            RuntimeType::Xml => TypeKind::Xml,
            RuntimeType::Error => TypeKind::Error,
            RuntimeType::Function => TypeKind::Function,
            RuntimeType::Future => TypeKind::Future,
            RuntimeType::Array { .. } => TypeKind::Array,
            RuntimeType::Tuple { .. } => TypeKind::Tuple,
            RuntimeType::Map { .. } => TypeKind::Map,
            RuntimeType::Record(_) => TypeKind::Record,
            RuntimeType::Object(_) => TypeKind::Object,
            RuntimeType::Union(_) => TypeKind::Union,
            RuntimeType::Readonly(_) => TypeKind::Readonly,
        }
    }

    /// Values of this descriptor are read-only by construction.
    pub fn is_immutable(&self) -> bool {
        match self {
            RuntimeType::Nil
            | RuntimeType::Boolean
            | RuntimeType::Int
            | RuntimeType::Byte
            | RuntimeType::Float
            | RuntimeType::Decimal
            | RuntimeType::String
            | RuntimeType::Error
            | RuntimeType::Function
            | RuntimeType::Readonly(_) => true,
            RuntimeType::Union(members) => members.iter().all(|m| m.is_immutable()),
            _ => false,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            RuntimeType::Nil
                | RuntimeType::Boolean
                | RuntimeType::Int
                | RuntimeType::Byte
                | RuntimeType::Float
                | RuntimeType::Decimal
                | RuntimeType::String
        )
    }

    pub fn permits_nil(&self) -> bool {
        match self {
            RuntimeType::Nil | RuntimeType::Any | RuntimeType::Anydata | RuntimeType::Json => true,
            RuntimeType::Union(members) => members.iter().any(|m| m.permits_nil()),
            RuntimeType::Readonly(inner) => inner.permits_nil(),
            _ => false,
        }
    }

    /// `(inner, true)` for `readonly & inner`, `(self, false)` otherwise.
    pub fn strip_readonly<'a>(self: &'a TypeRef) -> (&'a TypeRef, bool) {
        match &**self {
            RuntimeType::Readonly(inner) => (inner, true),
            _ => (self, false),
        }
    }

    pub fn is_anydata(&self) -> bool {
        match self {
            RuntimeType::Nil
            | RuntimeType::Boolean
            | RuntimeType::Int
            | RuntimeType::Byte
            | RuntimeType::Float
            | RuntimeType::Decimal
            | RuntimeType::String
            | RuntimeType::Anydata
            | RuntimeType::Json
            | RuntimeType::Xml => true,
            RuntimeType::Array { element, .. } => element.is_anydata(),
            RuntimeType::Tuple { members, rest } => {
                members.iter().all(|m| m.is_anydata())
                    && rest.as_ref().map_or(true, |r| r.is_anydata())
            }
            RuntimeType::Map { constraint } => constraint.is_anydata(),
            RuntimeType::Record(record) => {
                record.fields.values().all(|f| f.ty.is_anydata())
                    && record.extra_field_type().map_or(true, |r| r.is_anydata())
            }
            RuntimeType::Union(members) => members.iter().all(|m| m.is_anydata()),
            RuntimeType::Readonly(inner) => inner.is_anydata(),
            RuntimeType::Any
            | RuntimeType::Error
            | RuntimeType::Function
            | RuntimeType::Future
            | RuntimeType::Object(_) => false,
        }
    }

    pub fn is_json(&self) -> bool {
        match self {
            RuntimeType::Nil
            | RuntimeType::Boolean
            | RuntimeType::Int
            | RuntimeType::Byte
            | RuntimeType::Float
            | RuntimeType::Decimal
            | RuntimeType::String
            | RuntimeType::Json => true,
            RuntimeType::Array { element, .. } => element.is_json(),
            RuntimeType::Tuple { members, rest } => {
                members.iter().all(|m| m.is_json()) && rest.as_ref().map_or(true, |r| r.is_json())
            }
            RuntimeType::Map { constraint } => constraint.is_json(),
            RuntimeType::Record(record) => {
                record.fields.values().all(|f| f.ty.is_json())
                    && record.extra_field_type().map_or(true, |r| r.is_json())
            }
            RuntimeType::Union(members) => members.iter().all(|m| m.is_json()),
            RuntimeType::Readonly(inner) => inner.is_json(),
            _ => false,
        }
    }

    /// `a.is_assignable_to(b)`: is every value of `a` also a value of `b`?
    ///
    /// Sound but not complete: `false` only means the answer depends on the
    /// concrete value.
    pub fn is_assignable_to(&self, target: &RuntimeType) -> bool {
        if self == target {
            return true;
        }
        match self {
            RuntimeType::Union(members) => {
                return members.iter().all(|m| m.is_assignable_to(target));
            }
            RuntimeType::Readonly(inner) => {
                return match target {
                    RuntimeType::Readonly(t) => inner.is_assignable_to(t),
                    _ => inner.is_assignable_to(target),
                };
            }
            _ => {}
        }
        match target {
            RuntimeType::Any => !matches!(self, RuntimeType::Error | RuntimeType::Any),
            RuntimeType::Anydata => self.is_anydata(),
            RuntimeType::Json => self.is_json(),
            RuntimeType::Union(members) => members.iter().any(|m| self.is_assignable_to(m)),
            RuntimeType::Readonly(inner) => self.is_immutable() && self.is_assignable_to(inner),
            // Allow byte where int expected (byte is an int subrange)
            RuntimeType::Int => matches!(self, RuntimeType::Byte),
            RuntimeType::Array { element, length } => match self {
                RuntimeType::Array {
                    element: e,
                    length: l,
                } => length_fits(*l, *length) && e.is_assignable_to(element),
                RuntimeType::Tuple { members, rest } => {
                    let len_ok = match length {
                        ArrayLength::Open => true,
                        ArrayLength::Fixed(n) => rest.is_none() && members.len() == *n,
                    };
                    len_ok
                        && members.iter().chain(rest).all(|m| m.is_assignable_to(element))
                }
                _ => false,
            },
            RuntimeType::Tuple {
                members: target_members,
                rest: target_rest,
            } => match self {
                RuntimeType::Tuple { members, rest } => {
                    tuple_assignable(members, rest.as_ref(), target_members, target_rest.as_ref())
                }
                RuntimeType::Array {
                    element,
                    length: ArrayLength::Fixed(n),
                } => {
                    let len_ok = match target_rest {
                        None => *n == target_members.len(),
                        Some(_) => *n >= target_members.len(),
                    };
                    len_ok
                        && target_members
                            .iter()
                            .chain(target_rest)
                            .all(|m| element.is_assignable_to(m))
                }
                _ => false,
            },
            RuntimeType::Map { constraint } => match self {
                RuntimeType::Map { constraint: c } => c.is_assignable_to(constraint),
                RuntimeType::Record(record) => {
                    record.fields.values().all(|f| f.ty.is_assignable_to(constraint))
                        && record
                            .extra_field_type()
                            .map_or(true, |r| r.is_assignable_to(constraint))
                }
                _ => false,
            },
            RuntimeType::Record(target_record) => match self {
                RuntimeType::Record(record) => record_assignable(record, target_record),
                _ => false,
            },
            RuntimeType::Object(target_object) => match self {
                RuntimeType::Object(object) => object_assignable(object, target_object),
                _ => false,
            },
            _ => false,
        }
    }
}

fn length_fits(source: ArrayLength, target: ArrayLength) -> bool {
    match target {
        ArrayLength::Open => true,
        ArrayLength::Fixed(n) => source == ArrayLength::Fixed(n),
    }
}

fn tuple_assignable(
    members: &[TypeRef],
    rest: Option<&TypeRef>,
    target_members: &[TypeRef],
    target_rest: Option<&TypeRef>,
) -> bool {
    if members.len() < target_members.len() {
        return false;
    }
    if target_rest.is_none() && (rest.is_some() || members.len() != target_members.len()) {
        return false;
    }
    let slots_ok = members.iter().enumerate().all(|(i, m)| {
        match target_members.get(i).or(target_rest) {
            Some(slot) => m.is_assignable_to(slot),
            None => false,
        }
    });
    let rest_ok = match (rest, target_rest) {
        (Some(r), Some(tr)) => r.is_assignable_to(tr),
        (None, _) => true,
        (Some(_), None) => false,
    };
    slots_ok && rest_ok
}

fn record_assignable(source: &RecordType, target: &RecordType) -> bool {
    let source_extra = source.extra_field_type();
    let target_extra = target.extra_field_type();
    for (name, field) in &target.fields {
        match source.fields.get(name) {
            Some(sf) => {
                if sf.optional && !field.optional {
                    return false;
                }
                if !sf.ty.is_assignable_to(&field.ty) {
                    return false;
                }
            }
            None => {
                if !field.optional {
                    return false;
                }
                // the source may still carry it as an extra field
                if let Some(extra) = &source_extra {
                    if !extra.is_assignable_to(&field.ty) {
                        return false;
                    }
                }
            }
        }
    }
    for (name, field) in &source.fields {
        if target.fields.contains_key(name) {
            continue;
        }
        match &target_extra {
            Some(extra) if field.ty.is_assignable_to(extra) => {}
            _ => return false,
        }
    }
    match (&source_extra, &target_extra) {
        (None, _) => true,
        (Some(s), Some(t)) => s.is_assignable_to(t),
        (Some(_), None) => false,
    }
}

fn object_assignable(source: &ObjectType, target: &ObjectType) -> bool {
    if source.external.is_some() || target.external.is_some() {
        return source.external == target.external;
    }
    let fields_ok = target.fields.iter().all(|(name, field)| {
        source
            .fields
            .get(name)
            .map_or(false, |sf| sf.ty.is_assignable_to(&field.ty))
    });
    let sealed_ok = !target.sealed || source.fields.keys().all(|k| target.fields.contains_key(k));
    fields_ok && sealed_ok
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Nil => "()",
            TypeKind::Boolean => "boolean",
            TypeKind::Int => "int",
            TypeKind::Byte => "byte",
            TypeKind::Float => "float",
            TypeKind::Decimal => "decimal",
            TypeKind::String => "string",
            TypeKind::Array => "array",
            TypeKind::Tuple => "tuple",
            TypeKind::Map => "map",
            TypeKind::Record => "record",
            TypeKind::Object => "object",
            TypeKind::Union => "union",
            TypeKind::Any => "any",
            TypeKind::Anydata => "anydata",
            TypeKind::Json => "json",
            TypeKind::Xml => "xml",
            TypeKind::Error => "error",
            TypeKind::Function => "function",
            TypeKind::Future => "future",
            TypeKind::Readonly => "readonly",
        };
        f.write_str(name)
    }
}

/// Renders in annotation syntax; `parse_type` accepts everything printed
/// here except named records/objects, which print their name.
impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeType::Array { element, length } => {
                write_operand(f, element)?;
                match length {
                    ArrayLength::Open => write!(f, "[]"),
                    ArrayLength::Fixed(n) => write!(f, "[{}]", n),
                }
            }
            RuntimeType::Tuple { members, rest } => {
                let mut parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                if let Some(r) = rest {
                    parts.push(format!("{}...", r));
                }
                write!(f, "[{}]", parts.join(", "))
            }
            RuntimeType::Map { constraint } => write!(f, "map<{}>", constraint),
            RuntimeType::Record(record) => {
                if let Some(name) = &record.name {
                    return f.write_str(name);
                }
                let (open, close) = if record.sealed { ("{|", "|}") } else { ("{", "}") };
                write!(f, "record {}", open)?;
                for (name, field) in &record.fields {
                    let ro = if field.readonly { "readonly " } else { "" };
                    let opt = if field.optional { "?" } else { "" };
                    write!(f, " {}{} {}{};", ro, field.ty, name, opt)?;
                }
                if let Some(rest) = &record.rest {
                    write!(f, " {}...;", rest)?;
                }
                write!(f, " {}", close)
            }
            RuntimeType::Object(object) => {
                if let Some(class) = &object.external {
                    return write!(f, "handle<{}>", class);
                }
                if let Some(name) = &object.name {
                    return f.write_str(name);
                }
                let (open, close) = if object.sealed { ("{|", "|}") } else { ("{", "}") };
                write!(f, "object {}", open)?;
                for (name, field) in &object.fields {
                    let fin = if field.is_final { "final " } else { "" };
                    write!(f, " {}{} {};", fin, field.ty, name)?;
                }
                write!(f, " {}", close)
            }
            RuntimeType::Union(members) => {
                let parts: Vec<String> = members
                    .iter()
                    .map(|m| match &**m {
                        RuntimeType::Readonly(_) => format!("({})", m),
                        _ => m.to_string(),
                    })
                    .collect();
                f.write_str(&parts.join("|"))
            }
            RuntimeType::Readonly(inner) => match &**inner {
                RuntimeType::Any => f.write_str("readonly"),
                _ => {
                    f.write_str("readonly & ")?;
                    write_operand(f, inner)
                }
            },
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Parenthesize operands that would otherwise bind wrongly under a postfix
/// or `&`.
fn write_operand(f: &mut fmt::Formatter<'_>, ty: &RuntimeType) -> fmt::Result {
    match ty {
        RuntimeType::Union(_) | RuntimeType::Readonly(_) => write!(f, "({})", ty),
        _ => write!(f, "{}", ty),
    }
}
