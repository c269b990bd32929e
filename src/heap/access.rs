use rust_decimal::Decimal;

use super::*;

/// Largest number of elements a list may grow to.
pub const MAX_LIST_SIZE: usize = i32::MAX as usize - 8;

impl Heap {
    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Number of elements, entries, fields, xml items or characters.
    pub fn length(&self, value: &Value) -> Option<usize> {
        match value {
            Value::Str(s) => Some(s.chars().count()),
            Value::Ref(id) => match &self.get(*id).body {
                Body::List(items) => Some(items.len()),
                Body::Mapping(entries) | Body::Object(entries) => Some(entries.len()),
                Body::Xml(items) => Some(items.len()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get_index(&self, list: &Value, index: i64) -> Result<Value, RuntimeError> {
        let (obj, items) = self.list_parts(list)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| index_out_of_range(&obj.ty, index, items.len()))
    }

    /// Field of a record, map or object; `None` when absent.
    pub fn get_field(&self, target: &Value, name: &str) -> Result<Option<Value>, RuntimeError> {
        let id = self.expect_ref(target, "field access")?;
        match &self.get(id).body {
            Body::Mapping(entries) | Body::Object(entries) => Ok(entries.get(name).cloned()),
            _ => Err(RuntimeError::new(
                ErrorKind::InvalidRecordFieldAccess,
                format!(
                    "invalid field access: field '{}' on non-mapping value of type '{}'",
                    name,
                    self.type_of(target)
                ),
            )),
        }
    }

    /// Field that the record type declares as required, or that must exist.
    pub fn require_field(&self, target: &Value, name: &str) -> Result<Value, RuntimeError> {
        self.get_field(target, name)?.ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::InvalidRecordFieldAccess,
                format!(
                    "invalid field access: field '{}' not found in record type '{}'",
                    name,
                    self.type_of(target)
                ),
            )
        })
    }

    /// Character at `index`, counted in Unicode scalar values.
    pub fn string_char_at(&self, s: &str, index: i64) -> Result<Value, RuntimeError> {
        let len = s.chars().count();
        usize::try_from(index)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::Str(c.to_string()))
            .ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::StringIndexOutOfRange,
                    format!("string index out of range: index: {}, size: {}", index, len),
                )
            })
    }

    /// `s[start..end)` over Unicode scalar values.
    pub fn substring(&self, s: &str, start: i64, end: i64) -> Result<Value, RuntimeError> {
        let len = s.chars().count() as i64;
        if start < 0 || end > len || start > end {
            return Err(RuntimeError::new(
                ErrorKind::InvalidSubstringRange,
                format!(
                    "invalid substring range: start: {}, end: {}, length: {}",
                    start, end, len
                ),
            ));
        }
        let text: String = s
            .chars()
            .skip(start as usize)
            .take((end - start) as usize)
            .collect();
        Ok(Value::Str(text))
    }

    /// Single-item xml value holding item `index` of an xml sequence.
    pub fn xml_item(&mut self, xml: &Value, index: i64) -> Result<Value, RuntimeError> {
        let id = self.expect_ref(xml, "xml indexing")?;
        let obj = self.get(id);
        let Body::Xml(items) = &obj.body else {
            return Err(self.cast_mismatch(xml, &RuntimeType::xml()));
        };
        let item = usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::XmlSequenceIndexOutOfRange,
                    format!(
                        "xml sequence index out of range: index: {}, size: {}",
                        index,
                        items.len()
                    ),
                )
            })?;
        let readonly = obj.readonly;
        let out = self.new_xml(vec![item]);
        if readonly {
            if let Value::Ref(new_id) = out {
                self.get_mut(new_id).readonly = true;
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Mutation entry points
    // -----------------------------------------------------------------------

    pub fn set_index(&mut self, list: &Value, index: i64, value: Value) -> Result<(), RuntimeError> {
        let id = self.expect_ref(list, "index assignment")?;
        self.ensure_mutable(list, id)?;
        let (ty, len) = {
            let (obj, items) = self.list_parts(list)?;
            (obj.ty.clone(), items.len())
        };
        let index = match usize::try_from(index) {
            Ok(i) if i < MAX_LIST_SIZE => i,
            _ => return Err(index_out_of_range(&ty, index, len)),
        };
        let (slot_ty, filler) = match &*ty {
            RuntimeType::Array { element, length } => {
                if let ArrayLength::Fixed(n) = length {
                    if index >= *n {
                        return Err(index_out_of_range(&ty, index as i64, len));
                    }
                }
                let filler = if index > len {
                    Some(filler_value(element).ok_or_else(|| {
                        RuntimeError::new(
                            ErrorKind::IllegalArrayInsertion,
                            format!(
                                "illegal array insertion: array of length {} cannot be expanded to size {}: '{}' has no filler value",
                                len,
                                index + 1,
                                element
                            ),
                        )
                    })?)
                } else {
                    None
                };
                (element.clone(), filler)
            }
            RuntimeType::Tuple { members, rest } => {
                match members.get(index).or(rest.as_ref()) {
                    Some(slot) if index <= len => (slot.clone(), None),
                    _ => {
                        return Err(RuntimeError::new(
                            ErrorKind::IllegalTupleInsertion,
                            format!(
                                "illegal tuple insertion: size limit {} of '{}' exceeded by index {}",
                                members.len().max(len),
                                ty,
                                index
                            ),
                        ))
                    }
                }
            }
            _ => (RuntimeType::any(), None),
        };
        self.ensure_slot_accepts(&value, &slot_ty, ErrorKind::IncompatibleType)?;
        if let Body::List(items) = &mut self.get_mut(id).body {
            if index < items.len() {
                items[index] = value;
            } else {
                if items.try_reserve(index + 1 - items.len()).is_err() {
                    return Err(RuntimeError::new(
                        ErrorKind::IllegalArrayInsertion,
                        format!(
                            "illegal array insertion: array of length {} cannot be expanded to size {}",
                            items.len(),
                            index + 1
                        ),
                    ));
                }
                if let Some(filler) = filler {
                    items.resize(index, filler);
                }
                items.push(value);
            }
        }
        Ok(())
    }

    pub fn push(&mut self, list: &Value, value: Value) -> Result<(), RuntimeError> {
        let len = self
            .length(list)
            .ok_or_else(|| self.cast_mismatch(list, &RuntimeType::array(RuntimeType::any())))?;
        self.set_index(list, len as i64, value)
    }

    /// Field write on a record, map or object.
    pub fn set_field(&mut self, target: &Value, name: &str, value: Value) -> Result<(), RuntimeError> {
        let id = self.expect_ref(target, "field assignment")?;
        self.ensure_mutable(target, id)?;
        let ty = self.get(id).ty.clone();
        match &*ty {
            RuntimeType::Record(record) => match record.fields.get(name) {
                Some(field) if field.readonly => {
                    return Err(RuntimeError::new(
                        ErrorKind::RecordInvalidReadonlyFieldUpdate,
                        format!(
                            "cannot update 'readonly' field '{}' in record of type '{}'",
                            name, ty
                        ),
                    ))
                }
                Some(field) => {
                    self.ensure_slot_accepts(&value, &field.ty, ErrorKind::IncompatibleType)?
                }
                None => match record.extra_field_type() {
                    Some(extra) => {
                        self.ensure_slot_accepts(&value, &extra, ErrorKind::IncompatibleType)?
                    }
                    None => {
                        return Err(RuntimeError::new(
                            ErrorKind::InvalidRecordFieldAddition,
                            format!(
                                "invalid field access: field '{}' cannot be added to the closed record '{}'",
                                name, ty
                            ),
                        ))
                    }
                },
            },
            RuntimeType::Map { constraint } => {
                self.ensure_slot_accepts(&value, constraint, ErrorKind::InvalidMapInsertion)?
            }
            RuntimeType::Object(object) => match object.fields.get(name) {
                Some(field) if field.is_final => {
                    return Err(RuntimeError::new(
                        ErrorKind::ObjectInvalidFinalFieldUpdate,
                        format!(
                            "cannot update final field '{}' of object of type '{}'",
                            name, ty
                        ),
                    ))
                }
                Some(field) => {
                    self.ensure_slot_accepts(&value, &field.ty, ErrorKind::IncompatibleType)?
                }
                None if object.sealed || object.external.is_some() => {
                    return Err(RuntimeError::new(
                        ErrorKind::InvalidObjectFieldAddition,
                        format!(
                            "invalid field access: field '{}' cannot be added to object of type '{}'",
                            name, ty
                        ),
                    ))
                }
                None => {}
            },
            _ => {
                return Err(RuntimeError::new(
                    ErrorKind::CannotSetValueIncompatibleTypes,
                    format!(
                        "cannot set field '{}' on value of type '{}'",
                        name,
                        self.type_of(target)
                    ),
                ))
            }
        }
        match &mut self.get_mut(id).body {
            Body::Mapping(entries) | Body::Object(entries) => {
                entries.insert(name.to_string(), value);
            }
            _ => {}
        }
        Ok(())
    }

    /// Removes a map entry or an optional/extra record field.
    pub fn remove_field(&mut self, target: &Value, name: &str) -> Result<Option<Value>, RuntimeError> {
        let id = self.expect_ref(target, "field removal")?;
        self.ensure_mutable(target, id)?;
        if let RuntimeType::Record(record) = &*self.get(id).ty {
            if let Some(field) = record.fields.get(name) {
                if !field.optional {
                    return Err(RuntimeError::new(
                        ErrorKind::InvalidRecordFieldAccess,
                        format!(
                            "invalid field access: required field '{}' cannot be removed from '{}'",
                            name,
                            self.get(id).ty
                        ),
                    ));
                }
            }
        }
        match &mut self.get_mut(id).body {
            Body::Mapping(entries) => Ok(entries.shift_remove(name)),
            _ => Err(self.cast_mismatch(target, &RuntimeType::map(RuntimeType::any()))),
        }
    }

    // -----------------------------------------------------------------------
    // Readonly marking
    // -----------------------------------------------------------------------

    /// Marks `value` and everything reachable from it readonly.
    ///
    /// All-or-nothing: when a reachable value cannot be made readonly
    /// (objects, futures, foreign handles) no flag is changed. Readonly
    /// containers are walked as well; their children may still be mutable.
    pub fn freeze(&mut self, value: &Value) -> Result<(), RuntimeError> {
        let mut pending = Vec::new();
        let mut seen = Path::new();
        let mut stack = vec![value.clone()];
        while let Some(v) = stack.pop() {
            let Value::Ref(id) = v else { continue };
            if !seen.insert(id) {
                continue;
            }
            let obj = self.get(id);
            if obj.readonly {
                stack.extend(obj.body.children().into_iter().cloned());
                continue;
            }
            match &obj.body {
                Body::Object(_) | Body::Handle(_) | Body::Future { .. } => {
                    return Err(RuntimeError::new(
                        ErrorKind::UnsupportedCloneOperation,
                        format!("value of type '{}' cannot be made read-only", obj.ty),
                    ));
                }
                body => stack.extend(body.children().into_iter().cloned()),
            }
            pending.push(id);
        }
        for id in pending {
            self.get_mut(id).readonly = true;
        }
        Ok(())
    }

    /// True when some container reachable from `value` is still mutable.
    pub fn has_mutable_reachable(&self, value: &Value) -> bool {
        let mut seen = Path::new();
        let mut stack = vec![value];
        while let Some(v) = stack.pop() {
            let Value::Ref(id) = v else { continue };
            if !seen.insert(*id) {
                continue;
            }
            let obj = self.get(*id);
            if !obj.readonly {
                return true;
            }
            stack.extend(obj.body.children());
        }
        false
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    pub(crate) fn expect_ref(&self, value: &Value, op: &str) -> Result<ValueId, RuntimeError> {
        value.as_ref().ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::CannotSetValueIncompatibleTypes,
                format!("{} is not supported on value of type '{}'", op, self.type_of(value)),
            )
        })
    }

    fn list_parts(&self, list: &Value) -> Result<(&HeapObject, &Vec<Value>), RuntimeError> {
        if let Value::Ref(id) = list {
            let obj = self.get(*id);
            if let Body::List(items) = &obj.body {
                return Ok((obj, items));
            }
        }
        Err(self.cast_mismatch(list, &RuntimeType::array(RuntimeType::any())))
    }

    fn ensure_mutable(&self, value: &Value, id: ValueId) -> Result<(), RuntimeError> {
        if self.get(id).readonly {
            return Err(readonly_update(&self.type_of(value)));
        }
        Ok(())
    }

    fn ensure_slot_accepts(
        &self,
        value: &Value,
        slot: &TypeRef,
        kind: ErrorKind,
    ) -> Result<(), RuntimeError> {
        if self.conforms(value, slot) {
            return Ok(());
        }
        let prefix = match kind {
            ErrorKind::InvalidMapInsertion => "invalid map insertion",
            _ => "incompatible types",
        };
        Err(RuntimeError::new(
            kind,
            format!(
                "{}: expected '{}', found '{}'",
                prefix,
                slot,
                self.type_of(value)
            ),
        ))
    }
}

fn readonly_update(ty: &TypeRef) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::InvalidReadonlyValueUpdate,
        format!("cannot update 'readonly' value of type '{}'", ty),
    )
}

fn index_out_of_range(ty: &TypeRef, index: i64, len: usize) -> RuntimeError {
    let (kind, what) = match &**ty {
        RuntimeType::Tuple { .. } => (ErrorKind::TupleIndexOutOfRange, "tuple"),
        _ => (ErrorKind::ArrayIndexOutOfRange, "array"),
    };
    RuntimeError::new(
        kind,
        format!("{} index out of range: index: {}, size: {}", what, index, len),
    )
}

/// Value an array slot takes when the array grows past it.
pub(crate) fn filler_value(ty: &RuntimeType) -> Option<Value> {
    if ty.permits_nil() {
        return Some(Value::Nil);
    }
    match ty {
        RuntimeType::Boolean => Some(Value::Boolean(false)),
        RuntimeType::Int => Some(Value::Int(0)),
        RuntimeType::Byte => Some(Value::Byte(0)),
        RuntimeType::Float => Some(Value::Float(0.0)),
        RuntimeType::Decimal => Some(Value::Decimal(Decimal::ZERO)),
        RuntimeType::String => Some(Value::Str(String::new())),
        _ => None,
    }
}
