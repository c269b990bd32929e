use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::instrument;

use super::shape::{check_tuple_size, unknown_field};
use super::*;
use crate::value::scalar_repr;

impl Heap {
    /// Converts `value` into a new value of `target`'s representation.
    ///
    /// Unlike `cast`, conversion rebuilds containers with the target's
    /// descriptors and coerces simple values (numeric widening/truncation,
    /// numeric strings, stringification, JSON projection). Deeply readonly
    /// values that already have the target type are returned as they are.
    ///
    /// Atomic: on failure every value allocated by the attempt is discarded.
    #[instrument(level = "trace", skip_all, fields(target = %target))]
    pub fn convert(&mut self, value: &Value, target: &TypeRef) -> Result<Value, RuntimeError> {
        self.atomically(|heap| heap.convert_value(value, target, &mut Path::new()))
    }

    fn convert_value(
        &mut self,
        value: &Value,
        target: &TypeRef,
        path: &mut Path,
    ) -> Result<Value, RuntimeError> {
        if value.is_nil() {
            if target.permits_nil() {
                return Ok(Value::Nil);
            }
            return Err(RuntimeError::new(
                ErrorKind::CannotConvertNil,
                format!("cannot convert '()' to type '{}'", target),
            ));
        }
        if value.as_ref().is_some()
            && self.type_of(value).is_assignable_to(target)
            && !self.has_mutable_reachable(value)
        {
            return Ok(value.clone());
        }

        match &**target {
            RuntimeType::Readonly(inner) => {
                let converted = self.convert_value(value, inner, path)?;
                self.freeze(&converted)?;
                Ok(converted)
            }
            RuntimeType::Union(members) => {
                if let Some(member) = self.matching_member(value, target) {
                    return self.convert_value(value, &member, path);
                }
                for member in members {
                    let mark = self.mark();
                    match self.convert_value(value, member, path) {
                        Ok(converted) => return Ok(converted),
                        Err(err) if err.kind() == ErrorKind::CyclicValueReference => {
                            return Err(err)
                        }
                        Err(_) => self.rollback(mark),
                    }
                }
                Err(self.incompatible_convert(value, target))
            }
            RuntimeType::Any => {
                if self.is_error_value(value) {
                    return Err(self.incompatible_convert(value, target));
                }
                self.copy_graph(value, path)
            }
            RuntimeType::Anydata => {
                if !self.conforms(value, target) {
                    return Err(self.incompatible_convert(value, target));
                }
                self.copy_graph(value, path)
            }
            RuntimeType::Json => self.to_json(value, path),
            RuntimeType::Nil
            | RuntimeType::Boolean
            | RuntimeType::Int
            | RuntimeType::Byte
            | RuntimeType::Float
            | RuntimeType::Decimal => self.convert_simple(value, target),
            RuntimeType::String => self.stringify(value).map(Value::Str),
            RuntimeType::Xml => match value {
                Value::Str(s) => Ok(self.new_xml(vec![crate::xml::XmlItem::text(s)])),
                Value::Ref(id) if matches!(self.get(*id).body, Body::Xml(_)) => {
                    self.copy_graph(value, path)
                }
                _ => Err(self.incompatible_convert(value, target)),
            },
            RuntimeType::Array { .. }
            | RuntimeType::Tuple { .. }
            | RuntimeType::Map { .. }
            | RuntimeType::Record(_) => self.convert_container(value, target, path),
            RuntimeType::Object(_)
            | RuntimeType::Error
            | RuntimeType::Function
            | RuntimeType::Future => match self.check_shape(value, target) {
                Ok(()) => Ok(value.clone()),
                Err(err) if err.kind() == ErrorKind::JTypeCastError => Err(err),
                Err(_) => Err(self.incompatible_convert(value, target)),
            },
        }
    }

    /// Conversion between simple types; never allocates.
    pub(crate) fn convert_simple(&self, value: &Value, target: &TypeRef) -> Result<Value, RuntimeError> {
        match &**target {
            RuntimeType::Nil if value.is_nil() => Ok(Value::Nil),
            RuntimeType::Boolean => match value {
                Value::Boolean(b) => Ok(Value::Boolean(*b)),
                Value::Str(s) => match s.trim() {
                    "true" => Ok(Value::Boolean(true)),
                    "false" => Ok(Value::Boolean(false)),
                    _ => Err(self.incompatible_simple(value, target)),
                },
                _ => Err(self.incompatible_simple(value, target)),
            },
            RuntimeType::Int => self.to_int(value, target).map(Value::Int),
            RuntimeType::Byte => {
                let i = self.to_int(value, target)?;
                u8::try_from(i)
                    .map(Value::Byte)
                    .map_err(|_| self.incompatible_simple(value, target))
            }
            RuntimeType::Float => self.to_float(value, target).map(Value::Float),
            RuntimeType::Decimal => self.to_decimal(value, target).map(Value::Decimal),
            _ => Err(self.incompatible_simple(value, target)),
        }
    }

    fn to_int(&self, value: &Value, target: &TypeRef) -> Result<i64, RuntimeError> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Byte(b) => Ok(i64::from(*b)),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(self.incompatible_simple(value, target));
                }
                let t = f.trunc();
                // i64::MAX as f64 rounds up to 2^63
                if t >= 9_223_372_036_854_775_808.0 || t < -9_223_372_036_854_775_808.0 {
                    return Err(self.out_of_range(value, target));
                }
                Ok(t as i64)
            }
            Value::Decimal(d) => d
                .trunc()
                .to_i64()
                .ok_or_else(|| self.out_of_range(value, target)),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.incompatible_simple(value, target)),
            _ => Err(self.incompatible_simple(value, target)),
        }
    }

    fn to_float(&self, value: &Value, target: &TypeRef) -> Result<f64, RuntimeError> {
        match value {
            Value::Int(i) => Ok(*i as f64),
            Value::Byte(b) => Ok(f64::from(*b)),
            Value::Float(f) => Ok(*f),
            Value::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| self.out_of_range(value, target)),
            Value::Str(s) => parse_float(s.trim()).ok_or_else(|| self.incompatible_simple(value, target)),
            _ => Err(self.incompatible_simple(value, target)),
        }
    }

    fn to_decimal(&self, value: &Value, target: &TypeRef) -> Result<Decimal, RuntimeError> {
        match value {
            Value::Int(i) => Ok(Decimal::from(*i)),
            Value::Byte(b) => Ok(Decimal::from(*b)),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(self.incompatible_simple(value, target));
                }
                Decimal::from_f64(*f).ok_or_else(|| self.out_of_range(value, target))
            }
            Value::Decimal(d) => Ok(*d),
            Value::Str(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .map_err(|_| self.incompatible_simple(value, target))
            }
            _ => Err(self.incompatible_simple(value, target)),
        }
    }

    /// String form of any simple value, xml, error, or JSON-projectable
    /// container (as compact JSON text).
    pub(crate) fn stringify(&self, value: &Value) -> Result<String, RuntimeError> {
        if let Some(text) = scalar_repr(value) {
            return Ok(text);
        }
        let Value::Ref(id) = value else {
            return Err(self.incompatible_convert(value, &RuntimeType::string()));
        };
        match &self.get(*id).body {
            Body::Xml(items) => Ok(crate::xml::sequence_to_string(items)),
            Body::Error { message, .. } => Ok(message.clone()),
            Body::List(_) | Body::Mapping(_) => crate::json::to_json_string(self, value),
            _ => Err(self.incompatible_convert(value, &RuntimeType::string())),
        }
    }

    fn convert_container(
        &mut self,
        value: &Value,
        target: &TypeRef,
        path: &mut Path,
    ) -> Result<Value, RuntimeError> {
        let Value::Ref(id) = value else {
            return Err(self.container_mismatch(value, target));
        };
        if !path.insert(*id) {
            return Err(self.cyclic(value));
        }
        let result = self.convert_container_body(*id, value, target, path);
        path.remove(id);
        result
    }

    fn convert_container_body(
        &mut self,
        id: ValueId,
        value: &Value,
        target: &TypeRef,
        path: &mut Path,
    ) -> Result<Value, RuntimeError> {
        let body = self.get(id).body.clone();
        match (body, &**target) {
            (Body::List(items), RuntimeType::Array { element, length }) => {
                if let ArrayLength::Fixed(n) = length {
                    if items.len() != *n {
                        return Err(RuntimeError::new(
                            ErrorKind::IllegalArraySize,
                            format!(
                                "illegal array size: array of length {} cannot be converted to '{}'",
                                items.len(),
                                target
                            ),
                        ));
                    }
                }
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.convert_value(item, element, path)?);
                }
                Ok(self.new_list(target.clone(), out))
            }
            (Body::List(items), RuntimeType::Tuple { members, rest }) => {
                check_tuple_size(items.len(), members.len(), rest.is_some(), target)?;
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let Some(slot) = members.get(i).or(rest.as_ref()) else {
                        break;
                    };
                    out.push(self.convert_value(item, slot, path)?);
                }
                Ok(self.new_list(target.clone(), out))
            }
            (Body::Mapping(entries), RuntimeType::Map { constraint }) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (name, item) in &entries {
                    out.insert(name.clone(), self.convert_value(item, constraint, path)?);
                }
                Ok(self.new_record(target.clone(), out))
            }
            (Body::Mapping(entries), RuntimeType::Record(record)) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (name, field) in &record.fields {
                    match entries.get(name) {
                        Some(item) => {
                            let converted = self
                                .convert_value(item, &field.ty, path)
                                .map_err(|e| self.field_error(e, name, item, &field.ty))?;
                            out.insert(name.clone(), converted);
                        }
                        None if field.optional => {}
                        None => {
                            return Err(RuntimeError::new(
                                ErrorKind::MissingFieldInJson,
                                format!(
                                    "missing required field '{}' of type '{}' in '{}'",
                                    name, field.ty, target
                                ),
                            ))
                        }
                    }
                }
                for (name, item) in &entries {
                    if record.fields.contains_key(name) {
                        continue;
                    }
                    let extra_ty = record.rest.clone().unwrap_or_else(RuntimeType::json);
                    let converted = match (&record.rest, record.sealed) {
                        (Some(rest), _) => self.convert_value(item, rest, path),
                        (None, false) => self.to_json(item, path),
                        (None, true) => return Err(unknown_field(name, target)),
                    }
                    .map_err(|e| self.field_error(e, name, item, &extra_ty))?;
                    out.insert(name.clone(), converted);
                }
                Ok(self.new_record(target.clone(), out))
            }
            _ => Err(self.container_mismatch(value, target)),
        }
    }

    /// JSON projection: json[] for lists, map<json> for mappings.
    pub(crate) fn to_json(&mut self, value: &Value, path: &mut Path) -> Result<Value, RuntimeError> {
        let id = match value {
            Value::Byte(b) => return Ok(Value::Int(i64::from(*b))),
            Value::Ref(id) => *id,
            scalar => return Ok(scalar.clone()),
        };
        if self.type_of(value).is_json() && !self.has_mutable_reachable(value) {
            return Ok(value.clone());
        }
        if !path.insert(id) {
            return Err(self.cyclic(value));
        }
        let body = self.get(id).body.clone();
        let result = self.to_json_body(value, body, path);
        path.remove(&id);
        result
    }

    fn to_json_body(&mut self, value: &Value, body: Body, path: &mut Path) -> Result<Value, RuntimeError> {
        match body {
            Body::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.to_json(item, path)?);
                }
                Ok(self.new_list(RuntimeType::json_array(), out))
            }
            Body::Mapping(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (name, item) in &entries {
                    out.insert(name.clone(), self.to_json(item, path)?);
                }
                Ok(self.new_record(RuntimeType::json_object(), out))
            }
            _ => Err(RuntimeError::new(
                ErrorKind::IncompatibleConvertOperation,
                format!(
                    "incompatible convert operation: '{}' value has no JSON representation",
                    self.type_of(value)
                ),
            )),
        }
    }

    /// Copy keeping the source's own descriptors: mutable lists, mappings
    /// and xml get fresh storage, everything else keeps its identity.
    fn copy_graph(&mut self, value: &Value, path: &mut Path) -> Result<Value, RuntimeError> {
        let Value::Ref(id) = value else {
            return Ok(value.clone());
        };
        let obj = self.get(*id);
        if obj.readonly {
            return Ok(value.clone());
        }
        let ty = obj.ty.clone();
        let body = match &obj.body {
            Body::List(_) | Body::Mapping(_) | Body::Xml(_) => obj.body.clone(),
            _ => return Ok(value.clone()),
        };
        if !path.insert(*id) {
            return Err(self.cyclic(value));
        }
        let result = self.copy_body(body, path);
        path.remove(id);
        Ok(self.alloc(ty, result?))
    }

    fn copy_body(&mut self, body: Body, path: &mut Path) -> Result<Body, RuntimeError> {
        Ok(match body {
            Body::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.copy_graph(item, path)?);
                }
                Body::List(out)
            }
            Body::Mapping(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (name, item) in &entries {
                    out.insert(name.clone(), self.copy_graph(item, path)?);
                }
                Body::Mapping(out)
            }
            other => other,
        })
    }

    // -----------------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------------

    pub(crate) fn cyclic(&self, value: &Value) -> RuntimeError {
        RuntimeError::new(
            ErrorKind::CyclicValueReference,
            format!("'{}' value has cyclic reference", self.type_of(value)),
        )
    }

    fn incompatible_convert(&self, value: &Value, target: &TypeRef) -> RuntimeError {
        RuntimeError::new(
            ErrorKind::IncompatibleConvertOperation,
            format!(
                "incompatible convert operation: '{}' value cannot be converted to '{}'",
                self.type_of(value),
                target
            ),
        )
    }

    fn incompatible_simple(&self, value: &Value, target: &TypeRef) -> RuntimeError {
        RuntimeError::new(
            ErrorKind::IncompatibleSimpleTypeConvertOperation,
            format!(
                "incompatible convert operation: '{}' value '{}' cannot be converted to '{}'",
                self.type_of(value),
                self.repr(value),
                target
            ),
        )
    }

    fn out_of_range(&self, value: &Value, target: &TypeRef) -> RuntimeError {
        RuntimeError::new(
            ErrorKind::IndexNumberTooLarge,
            format!(
                "number too large: '{}' value '{}' is out of range for '{}'",
                self.type_of(value),
                self.repr(value),
                target
            ),
        )
    }

    fn container_mismatch(&self, value: &Value, target: &TypeRef) -> RuntimeError {
        if let RuntimeType::Record(_) = &**target {
            return RuntimeError::new(
                ErrorKind::IncompatibleTypeForCastingJson,
                format!(
                    "incompatible types: '{}' cannot be converted to record '{}'",
                    self.type_of(value),
                    target
                ),
            );
        }
        self.incompatible_convert(value, target)
    }

    /// Simple-value failures inside a record field are reported against the
    /// field; structural failures pass through.
    fn field_error(&self, err: RuntimeError, name: &str, item: &Value, field_ty: &TypeRef) -> RuntimeError {
        let wrap = matches!(
            err.kind(),
            ErrorKind::CannotConvertNil
                | ErrorKind::IncompatibleConvertOperation
                | ErrorKind::IncompatibleSimpleTypeConvertOperation
                | ErrorKind::IncompatibleTypeForCastingJson
                | ErrorKind::TypeCastError
        );
        if !wrap {
            return err;
        }
        RuntimeError::new(
            ErrorKind::IncompatibleFieldTypeForCasting,
            format!(
                "incompatible types: field '{}' of type '{}' cannot be converted to '{}'",
                name,
                self.type_of(item),
                field_ty
            ),
        )
    }
}

/// Decimal or scientific float text, plus `NaN` and `Infinity` spelled out.
/// Other alphabetic spellings (`inf`, `nan`) are rejected.
fn parse_float(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => text.parse().ok(),
    }
}
