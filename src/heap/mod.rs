/// Value arena and the engines that operate on it.
///
/// Containers reference their elements by `ValueId`, so a value graph may
/// contain cycles (`a[0] = a`). Cycle detection in the engines is a set of
/// slot indices, never pointer comparison.
///
/// The engines are split across submodules as `impl Heap` blocks:
///   access   - reads, mutation entry points, readonly marking
///   shape    - shape conformance checks
///   cast     - checked / unchecked casts
///   convert  - value-changing conversions
///   stamp    - clone, stamp, readonly clone, cross-heap transfer
///   equality - structural / exact equality and ordering
///   repr     - display strings
use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

pub use crate::error::{ErrorKind, RuntimeError};
pub use crate::types::{ArrayLength, RuntimeType, TypeKind, TypeRef};
pub use crate::value::{Value, ValueId};
pub use access::MAX_LIST_SIZE;
use crate::xml::XmlItem;

mod access;
mod cast;
mod convert;
mod equality;
mod repr;
mod shape;
mod stamp;


#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Array or tuple elements.
    List(Vec<Value>),
    /// Map entries or record fields, in insertion order.
    Mapping(IndexMap<String, Value>),
    Object(IndexMap<String, Value>),
    /// Foreign payload behind a `handle<...>` object type.
    Handle(String),
    Xml(Vec<XmlItem>),
    Error {
        message: String,
        detail: Option<Value>,
    },
    Function {
        name: String,
    },
    Future {
        name: String,
    },
}

impl Body {
    /// Values directly referenced by this payload.
    pub(crate) fn children(&self) -> Vec<&Value> {
        match self {
            Body::List(items) => items.iter().collect(),
            Body::Mapping(entries) | Body::Object(entries) => entries.values().collect(),
            Body::Error { detail, .. } => detail.iter().collect(),
            Body::Handle(_) | Body::Xml(_) | Body::Function { .. } | Body::Future { .. } => {
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeapObject {
    pub(crate) ty: TypeRef,
    pub(crate) readonly: bool,
    pub(crate) body: Body,
}

impl HeapObject {
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// Allocation watermark; see `Heap::rollback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapMark(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastMode {
    Checked,
    /// Conformance was proven by the caller (compiler-inserted casts).
    Unchecked,
}

/// Strand-local value arena. Nothing is ever freed individually; a heap is
/// torn down as a whole by its owner.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Panics if `id` was not allocated by this heap.
    pub fn get(&self, id: ValueId) -> &HeapObject {
        &self.slots[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ValueId) -> &mut HeapObject {
        &mut self.slots[id.0]
    }

    /// Allocates a value of descriptor `ty`. The payload is trusted to have
    /// that shape (literal construction); values of an immutable descriptor
    /// start out readonly.
    pub fn alloc(&mut self, ty: TypeRef, body: Body) -> Value {
        let readonly = ty.is_immutable();
        let id = ValueId(self.slots.len());
        self.slots.push(HeapObject { ty, readonly, body });
        Value::Ref(id)
    }

    pub fn new_array(&mut self, element: TypeRef, items: Vec<Value>) -> Value {
        self.alloc(RuntimeType::array(element), Body::List(items))
    }

    /// Array or tuple with an explicit descriptor.
    pub fn new_list(&mut self, ty: TypeRef, items: Vec<Value>) -> Value {
        self.alloc(ty, Body::List(items))
    }

    pub fn new_tuple(&mut self, members: Vec<TypeRef>, items: Vec<Value>) -> Value {
        self.alloc(RuntimeType::tuple(members), Body::List(items))
    }

    pub fn new_map<K: Into<String>>(
        &mut self,
        constraint: TypeRef,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> Value {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.alloc(RuntimeType::map(constraint), Body::Mapping(entries))
    }

    /// Record (or map) with an explicit descriptor.
    pub fn new_record<K: Into<String>>(
        &mut self,
        ty: TypeRef,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Value {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.alloc(ty, Body::Mapping(fields))
    }

    pub fn new_object<K: Into<String>>(
        &mut self,
        ty: TypeRef,
        fields: impl IntoIterator<Item = (K, Value)>,
    ) -> Value {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.alloc(ty, Body::Object(fields))
    }

    /// Opaque foreign value of class `class`.
    pub fn new_handle(&mut self, class: &str, payload: &str) -> Value {
        self.alloc(
            crate::types::ObjectType::external(class),
            Body::Handle(payload.to_string()),
        )
    }

    pub fn new_xml(&mut self, items: Vec<XmlItem>) -> Value {
        self.alloc(RuntimeType::xml(), Body::Xml(items))
    }

    /// Error value. A mutable `detail` is stored as a readonly clone; details
    /// that cannot be made readonly are rejected.
    pub fn new_error(&mut self, message: &str, detail: Option<Value>) -> Result<Value, RuntimeError> {
        let detail = match detail {
            Some(d) => Some(self.clone_readonly(&d)?),
            None => None,
        };
        Ok(self.alloc(
            RuntimeType::error(),
            Body::Error {
                message: message.to_string(),
                detail,
            },
        ))
    }

    pub fn new_function(&mut self, name: &str) -> Value {
        self.alloc(
            RuntimeType::function(),
            Body::Function {
                name: name.to_string(),
            },
        )
    }

    pub fn new_future(&mut self, name: &str) -> Value {
        self.alloc(
            RuntimeType::future(),
            Body::Future {
                name: name.to_string(),
            },
        )
    }

    /// Runtime descriptor of `value`. Heap values frozen after allocation
    /// report `readonly & T`.
    pub fn type_of(&self, value: &Value) -> TypeRef {
        match value {
            Value::Nil => RuntimeType::nil(),
            Value::Boolean(_) => RuntimeType::boolean(),
            Value::Int(_) => RuntimeType::int(),
            Value::Byte(_) => RuntimeType::byte(),
            Value::Float(_) => RuntimeType::float(),
            Value::Decimal(_) => RuntimeType::decimal(),
            Value::Str(_) => RuntimeType::string(),
            Value::Ref(id) => {
                let obj = self.get(*id);
                if obj.readonly && !obj.ty.is_immutable() {
                    RuntimeType::readonly(obj.ty.clone())
                } else {
                    obj.ty.clone()
                }
            }
        }
    }

    /// Scalars are always readonly.
    pub fn is_readonly(&self, value: &Value) -> bool {
        match value {
            Value::Ref(id) => self.get(*id).readonly,
            _ => true,
        }
    }

    pub fn mark(&self) -> HeapMark {
        HeapMark(self.slots.len())
    }

    /// Discards every slot allocated since `mark`. Callers must not keep
    /// references to those slots; the engines use this to make a failed
    /// operation leave no partial value behind.
    pub fn rollback(&mut self, mark: HeapMark) {
        if mark.0 < self.slots.len() {
            debug!(discarded = self.slots.len() - mark.0, "heap rolled back");
            self.slots.truncate(mark.0);
        }
    }

    /// Runs `op` and rolls back its allocations if it fails.
    pub(crate) fn atomically<T>(
        &mut self,
        op: impl FnOnce(&mut Heap) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let mark = self.mark();
        let result = op(self);
        if result.is_err() {
            self.rollback(mark);
        }
        result
    }
}

/// Set of containers on the active traversal path.
pub(crate) type Path = HashSet<ValueId>;
