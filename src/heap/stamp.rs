use tracing::{instrument, trace};

use super::*;

impl Heap {
    /// Deep copy of `value`. Deeply readonly values are shared, every
    /// mutable list, mapping or xml sequence gets fresh storage.
    #[instrument(level = "trace", skip_all)]
    pub fn clone_value(&mut self, value: &Value) -> Result<Value, RuntimeError> {
        self.atomically(|heap| heap.clone_graph(value, &mut Path::new()))
    }

    /// Readonly view of `value`: the value itself when nothing reachable is
    /// mutable, otherwise a deep copy that is then frozen.
    pub fn clone_readonly(&mut self, value: &Value) -> Result<Value, RuntimeError> {
        if !self.has_mutable_reachable(value) {
            return Ok(value.clone());
        }
        self.atomically(|heap| {
            let copy = heap.clone_graph(value, &mut Path::new())?;
            heap.freeze(&copy)?;
            Ok(copy)
        })
    }

    /// Deep copy of `value` retyped as `target`, validating every reachable
    /// element against the slot type it lands in.
    ///
    /// Deeply readonly values that already have the target type are returned
    /// as they are.
    ///
    /// Atomic. Shape failures are reported as one `IncompatibleStampOperation`
    /// naming the top-level types; cycles and unsupported sources keep
    /// their own kinds.
    #[instrument(level = "trace", skip_all, fields(target = %target))]
    pub fn stamp(&mut self, value: &Value, target: &TypeRef) -> Result<Value, RuntimeError> {
        if value.is_nil() {
            return Err(RuntimeError::new(
                ErrorKind::CannotStampNull,
                format!("cannot stamp '()' value as type '{}'", target),
            ));
        }
        self.atomically(|heap| heap.stamp_value(value, target, &mut Path::new()))
            .map_err(|err| self.stamp_failure(value, target, err))
    }

    /// Copies `value` from this heap into `into`. Readonly flags carry over;
    /// sources that cannot be cloned fail the same way as `clone_value`.
    pub fn transfer(&self, value: &Value, into: &mut Heap) -> Result<Value, RuntimeError> {
        into.atomically(|dst| self.transfer_graph(value, dst, &mut Path::new()))
    }

    fn clone_graph(&mut self, value: &Value, path: &mut Path) -> Result<Value, RuntimeError> {
        let Value::Ref(id) = value else {
            return Ok(value.clone());
        };
        let obj = self.get(*id);
        if let Body::Object(_) | Body::Handle(_) | Body::Function { .. } | Body::Future { .. } = obj.body {
            return Err(unsupported_clone(&obj.ty));
        }
        let readonly = obj.readonly;
        if readonly && !self.has_mutable_reachable(value) {
            return Ok(value.clone());
        }
        let ty = obj.ty.clone();
        let body = obj.body.clone();
        if !path.insert(*id) {
            return Err(self.cyclic(value));
        }
        let copied = self.clone_body(body, path);
        path.remove(id);
        let copy = self.alloc(ty, copied?);
        if readonly {
            self.freeze(&copy)?;
        }
        Ok(copy)
    }

    fn clone_body(&mut self, body: Body, path: &mut Path) -> Result<Body, RuntimeError> {
        Ok(match body {
            Body::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.clone_graph(item, path)?);
                }
                Body::List(out)
            }
            Body::Mapping(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (name, item) in &entries {
                    out.insert(name.clone(), self.clone_graph(item, path)?);
                }
                Body::Mapping(out)
            }
            Body::Error { message, detail } => Body::Error {
                detail: match detail {
                    Some(d) => Some(self.clone_graph(&d, path)?),
                    None => None,
                },
                message,
            },
            other => other,
        })
    }

    fn stamp_value(&mut self, value: &Value, target: &TypeRef, path: &mut Path) -> Result<Value, RuntimeError> {
        if value.as_ref().is_some()
            && !self.has_mutable_reachable(value)
            && self.type_of(value).is_assignable_to(target)
        {
            return Ok(value.clone());
        }
        match &**target {
            RuntimeType::Readonly(inner) => {
                let stamped = self.stamp_value(value, inner, path)?;
                self.freeze(&stamped)?;
                Ok(stamped)
            }
            RuntimeType::Union(_) => match self.matching_member(value, target) {
                Some(member) => {
                    trace!(member = %member, "union member selected");
                    self.stamp_value(value, &member, path)
                }
                None => Err(self.cast_mismatch(value, target)),
            },
            RuntimeType::Json => {
                self.check_shape(value, target)?;
                self.to_json(value, path)
            }
            RuntimeType::Array { .. }
            | RuntimeType::Tuple { .. }
            | RuntimeType::Map { .. }
            | RuntimeType::Record(_) => {
                self.check_shape(value, target)?;
                let Value::Ref(id) = value else {
                    return Err(self.cast_mismatch(value, target));
                };
                if !path.insert(*id) {
                    return Err(self.cyclic(value));
                }
                let result = self.stamp_container(*id, target, path);
                path.remove(id);
                result
            }
            _ => {
                self.check_shape(value, target)?;
                match (value, &**target) {
                    (Value::Int(i), RuntimeType::Byte) => u8::try_from(*i)
                        .map(Value::Byte)
                        .map_err(|_| self.cast_mismatch(value, target)),
                    _ => self.clone_graph(value, path),
                }
            }
        }
    }

    /// Rebuilds a list or mapping whose shape was already checked against
    /// `target`, stamping each element to its slot type.
    fn stamp_container(&mut self, id: ValueId, target: &TypeRef, path: &mut Path) -> Result<Value, RuntimeError> {
        let body = self.get(id).body.clone();
        let body = match (body, &**target) {
            (Body::List(items), RuntimeType::Array { element, .. }) => {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.stamp_value(item, element, path)?);
                }
                Body::List(out)
            }
            (Body::List(items), RuntimeType::Tuple { members, rest }) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match members.get(i).or(rest.as_ref()) {
                        Some(slot) => out.push(self.stamp_value(item, slot, path)?),
                        None => break,
                    }
                }
                Body::List(out)
            }
            (Body::Mapping(entries), RuntimeType::Map { constraint }) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (name, item) in &entries {
                    out.insert(name.clone(), self.stamp_value(item, constraint, path)?);
                }
                Body::Mapping(out)
            }
            (Body::Mapping(entries), RuntimeType::Record(record)) => {
                let extra_ty = record.extra_field_type();
                let mut out = IndexMap::with_capacity(entries.len());
                for (name, item) in &entries {
                    let slot = match (record.fields.get(name), &extra_ty) {
                        (Some(field), _) => &field.ty,
                        (None, Some(ty)) => ty,
                        (None, None) => return Err(super::shape::unknown_field(name, target)),
                    };
                    out.insert(name.clone(), self.stamp_value(item, slot, path)?);
                }
                Body::Mapping(out)
            }
            _ => return Err(self.cast_mismatch(&Value::Ref(id), target)),
        };
        Ok(self.alloc(target.clone(), body))
    }

    fn stamp_failure(&self, value: &Value, target: &TypeRef, err: RuntimeError) -> RuntimeError {
        match err.kind() {
            ErrorKind::CyclicValueReference | ErrorKind::UnsupportedCloneOperation => err,
            _ => RuntimeError::new(
                ErrorKind::IncompatibleStampOperation,
                format!(
                    "incompatible stamp operation: '{}' value cannot be stamped as '{}'",
                    self.type_of(value),
                    target
                ),
            ),
        }
    }

    fn transfer_graph(&self, value: &Value, into: &mut Heap, path: &mut Path) -> Result<Value, RuntimeError> {
        let Value::Ref(id) = value else {
            return Ok(value.clone());
        };
        let obj = self.get(*id);
        if let Body::Object(_) | Body::Handle(_) | Body::Function { .. } | Body::Future { .. } = obj.body {
            return Err(unsupported_clone(&obj.ty));
        }
        if !path.insert(*id) {
            return Err(self.cyclic(value));
        }
        let body = match &obj.body {
            Body::List(items) => items
                .iter()
                .map(|item| self.transfer_graph(item, into, path))
                .collect::<Result<Vec<_>, _>>()
                .map(Body::List),
            Body::Mapping(entries) => entries
                .iter()
                .map(|(name, item)| Ok((name.clone(), self.transfer_graph(item, into, path)?)))
                .collect::<Result<IndexMap<_, _>, RuntimeError>>()
                .map(Body::Mapping),
            Body::Error { message, detail } => match detail {
                Some(d) => self.transfer_graph(d, into, path).map(|d| Body::Error {
                    message: message.clone(),
                    detail: Some(d),
                }),
                None => Ok(obj.body.clone()),
            },
            other => Ok(other.clone()),
        };
        path.remove(id);
        let copy = into.alloc(obj.ty.clone(), body?);
        if let Value::Ref(new_id) = copy {
            into.get_mut(new_id).readonly = obj.readonly;
        }
        Ok(copy)
    }
}

fn unsupported_clone(ty: &TypeRef) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::UnsupportedCloneOperation,
        format!("unsupported clone operation: value of type '{}' cannot be cloned", ty),
    )
}
