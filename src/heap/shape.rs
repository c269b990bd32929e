use std::collections::HashSet;
use std::sync::Arc;

use super::*;

/// `(container, target descriptor)` pairs currently being checked. A pair
/// reached again through a cycle is assumed to conform.
type ShapePath = HashSet<(ValueId, usize)>;

impl Heap {
    pub fn conforms(&self, value: &Value, target: &TypeRef) -> bool {
        self.check_shape(value, target).is_ok()
    }

    /// Checks the concrete shape of `value` against `target`, looking through
    /// declared element types (`any[]` holding ints conforms to `int[]`).
    ///
    /// Size and field-set violations report their specific kind; every
    /// other mismatch is a `TypeCastError`.
    pub fn check_shape(&self, value: &Value, target: &TypeRef) -> Result<(), RuntimeError> {
        let mut path = ShapePath::new();
        self.shape(value, target, &mut path)
    }

    /// First member of a union target, in declaration order, that `value`
    /// conforms to. Non-union targets match themselves.
    pub fn matching_member(&self, value: &Value, target: &TypeRef) -> Option<TypeRef> {
        match &**target {
            RuntimeType::Union(members) => members.iter().find(|m| self.conforms(value, m)).cloned(),
            _ => self.conforms(value, target).then(|| target.clone()),
        }
    }

    pub(crate) fn cast_mismatch(&self, value: &Value, target: &TypeRef) -> RuntimeError {
        RuntimeError::new(
            ErrorKind::TypeCastError,
            format!(
                "incompatible types: '{}' cannot be cast to '{}'",
                self.type_of(value),
                target
            ),
        )
    }

    pub(crate) fn is_error_value(&self, value: &Value) -> bool {
        match value {
            Value::Ref(id) => matches!(self.get(*id).body, Body::Error { .. }),
            _ => false,
        }
    }

    fn shape(&self, value: &Value, target: &TypeRef, path: &mut ShapePath) -> Result<(), RuntimeError> {
        match &**target {
            RuntimeType::Union(members) => {
                if members.iter().any(|m| self.shape(value, m, path).is_ok()) {
                    return Ok(());
                }
                return Err(self.cast_mismatch(value, target));
            }
            RuntimeType::Readonly(inner) => {
                if !self.is_readonly(value) {
                    return Err(self.cast_mismatch(value, target));
                }
                return self.shape(value, inner, path);
            }
            RuntimeType::Any => {
                if self.is_error_value(value) {
                    return Err(self.cast_mismatch(value, target));
                }
                return Ok(());
            }
            _ => {}
        }

        let fits = match value {
            Value::Nil => matches!(
                &**target,
                RuntimeType::Nil | RuntimeType::Anydata | RuntimeType::Json
            ),
            Value::Boolean(_) => matches!(
                &**target,
                RuntimeType::Boolean | RuntimeType::Anydata | RuntimeType::Json
            ),
            Value::Int(i) => match &**target {
                RuntimeType::Int | RuntimeType::Anydata | RuntimeType::Json => true,
                RuntimeType::Byte => (0..=255).contains(i),
                _ => false,
            },
            Value::Byte(_) => matches!(
                &**target,
                RuntimeType::Byte | RuntimeType::Int | RuntimeType::Anydata | RuntimeType::Json
            ),
            Value::Float(_) => matches!(
                &**target,
                RuntimeType::Float | RuntimeType::Anydata | RuntimeType::Json
            ),
            Value::Decimal(_) => matches!(
                &**target,
                RuntimeType::Decimal | RuntimeType::Anydata | RuntimeType::Json
            ),
            Value::Str(_) => matches!(
                &**target,
                RuntimeType::String | RuntimeType::Anydata | RuntimeType::Json
            ),
            Value::Ref(id) => return self.shape_ref(*id, value, target, path),
        };
        if fits {
            Ok(())
        } else {
            Err(self.cast_mismatch(value, target))
        }
    }

    fn shape_ref(
        &self,
        id: ValueId,
        value: &Value,
        target: &TypeRef,
        path: &mut ShapePath,
    ) -> Result<(), RuntimeError> {
        let obj = self.get(id);
        if obj.ty.is_assignable_to(target) {
            return Ok(());
        }
        let key = (id, Arc::as_ptr(target) as usize);
        if !path.insert(key) {
            return Ok(());
        }
        let result = self.shape_body(obj, value, target, path);
        path.remove(&key);
        result
    }

    fn shape_body(
        &self,
        obj: &HeapObject,
        value: &Value,
        target: &TypeRef,
        path: &mut ShapePath,
    ) -> Result<(), RuntimeError> {
        match (&obj.body, &**target) {
            (Body::List(items), RuntimeType::Anydata | RuntimeType::Json) => {
                for item in items {
                    self.shape(item, target, path)?;
                }
                Ok(())
            }
            (Body::Mapping(entries), RuntimeType::Anydata | RuntimeType::Json) => {
                for item in entries.values() {
                    self.shape(item, target, path)?;
                }
                Ok(())
            }
            (Body::Xml(_), RuntimeType::Anydata) => Ok(()),
            (Body::List(items), RuntimeType::Array { element, length }) => {
                if let ArrayLength::Fixed(n) = length {
                    if items.len() != *n {
                        return Err(RuntimeError::new(
                            ErrorKind::IllegalArraySize,
                            format!(
                                "illegal array size: '{}' requires {} elements, found {}",
                                target,
                                n,
                                items.len()
                            ),
                        ));
                    }
                }
                for item in items {
                    self.shape(item, element, path)?;
                }
                Ok(())
            }
            (Body::List(items), RuntimeType::Tuple { members, rest }) => {
                check_tuple_size(items.len(), members.len(), rest.is_some(), target)?;
                for (i, item) in items.iter().enumerate() {
                    if let Some(slot) = members.get(i).or(rest.as_ref()) {
                        self.shape(item, slot, path)?;
                    }
                }
                Ok(())
            }
            (Body::Mapping(entries), RuntimeType::Map { constraint }) => {
                for item in entries.values() {
                    self.shape(item, constraint, path)?;
                }
                Ok(())
            }
            (Body::Mapping(entries), RuntimeType::Record(record)) => {
                for (name, field) in &record.fields {
                    match entries.get(name) {
                        Some(item) => self.shape(item, &field.ty, path)?,
                        None if field.optional => {}
                        None => {
                            return Err(RuntimeError::new(
                                ErrorKind::CastingWithoutRequiredField,
                                format!(
                                    "missing required field '{}' of type '{}' in record '{}'",
                                    name, field.ty, target
                                ),
                            ))
                        }
                    }
                }
                let extra_ty = record.extra_field_type();
                for (name, item) in entries {
                    if record.fields.contains_key(name) {
                        continue;
                    }
                    match &extra_ty {
                        Some(ty) => self.shape(item, ty, path)?,
                        None => return Err(unknown_field(name, target)),
                    }
                }
                Ok(())
            }
            (Body::Object(fields), RuntimeType::Object(object)) if object.external.is_none() => {
                for (name, field) in &object.fields {
                    match fields.get(name) {
                        Some(item) => self.shape(item, &field.ty, path)?,
                        None => return Err(self.cast_mismatch(value, target)),
                    }
                }
                if object.sealed && fields.keys().any(|k| !object.fields.contains_key(k)) {
                    return Err(self.cast_mismatch(value, target));
                }
                Ok(())
            }
            (_, RuntimeType::Object(object)) if object.external.is_some() => Err(jtype_mismatch(
                &self.type_of(value),
                target,
            )),
            (Body::Handle(_), _) => Err(jtype_mismatch(&obj.ty, target)),
            (Body::Xml(_), RuntimeType::Xml)
            | (Body::Error { .. }, RuntimeType::Error)
            | (Body::Function { .. }, RuntimeType::Function)
            | (Body::Future { .. }, RuntimeType::Future) => Ok(()),
            _ => Err(self.cast_mismatch(value, target)),
        }
    }
}

pub(crate) fn check_tuple_size(
    len: usize,
    members: usize,
    has_rest: bool,
    target: &TypeRef,
) -> Result<(), RuntimeError> {
    if has_rest && len < members {
        return Err(RuntimeError::new(
            ErrorKind::IllegalTupleWithRestTypeSize,
            format!(
                "illegal tuple size: '{}' requires at least {} members, found {}",
                target, members, len
            ),
        ));
    }
    if !has_rest && len != members {
        return Err(RuntimeError::new(
            ErrorKind::IllegalTupleSize,
            format!(
                "illegal tuple size: '{}' requires {} members, found {}",
                target, members, len
            ),
        ));
    }
    Ok(())
}

pub(crate) fn unknown_field(name: &str, target: &TypeRef) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::UnknownFieldJsonStruct,
        format!("unknown field '{}' for closed record '{}'", name, target),
    )
}

fn jtype_mismatch(source: &TypeRef, target: &TypeRef) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::JTypeCastError,
        format!(
            "incompatible types: '{}' cannot be cast to foreign type '{}'",
            source, target
        ),
    )
}
