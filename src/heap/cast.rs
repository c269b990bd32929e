use tracing::{instrument, trace};

use super::*;

impl Heap {
    /// Casts `value` to `target`.
    ///
    /// A cast is a type-view change: the returned value is the same value
    /// (same heap slot for containers). Two exceptions produce new values:
    /// a numeric value cast to a different numeric simple type is converted,
    /// and a value with mutable parts cast to a readonly target is replaced
    /// by a readonly clone.
    ///
    /// `Unchecked` skips all work; a mismatch there is a caller bug and trips
    /// a debug assertion.
    #[instrument(level = "trace", skip_all, fields(target = %target))]
    pub fn cast(&mut self, value: &Value, target: &TypeRef, mode: CastMode) -> Result<Value, RuntimeError> {
        if mode == CastMode::Unchecked {
            debug_assert!(
                self.conforms(value, target),
                "unchecked cast of '{}' to '{}' does not conform",
                self.type_of(value),
                target
            );
            return Ok(value.clone());
        }

        let (inner, wants_readonly) = target.strip_readonly();
        if is_numeric_scalar(value) && is_numeric_simple(inner) && !self.conforms(value, inner) {
            trace!("numeric cast delegated to conversion");
            return self.convert_simple(value, inner).map_err(|err| match err.kind() {
                ErrorKind::IndexNumberTooLarge => err,
                _ => self.cast_mismatch(value, target),
            });
        }

        if let Err(err) = self.check_shape(value, inner) {
            return Err(self.cast_failure(value, target, err));
        }
        if wants_readonly && self.has_mutable_reachable(value) {
            trace!("mutable value cast to readonly target; cloning");
            return self.clone_readonly(value);
        }
        Ok(retag(value, inner))
    }

    /// Keeps size and field-set failures as reported by the shape check and
    /// renames everything else to a top-level cast failure.
    fn cast_failure(&self, value: &Value, target: &TypeRef, err: RuntimeError) -> RuntimeError {
        let is_handle = matches!(value, Value::Ref(id) if matches!(self.get(*id).body, Body::Handle(_)));
        match err.kind() {
            _ if is_handle => RuntimeError::new(
                ErrorKind::JTypeCastError,
                format!(
                    "incompatible types: '{}' cannot be cast to '{}'",
                    self.type_of(value),
                    target
                ),
            ),
            ErrorKind::TypeCastError => self.cast_mismatch(value, target),
            _ => err,
        }
    }
}

fn is_numeric_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Int(_) | Value::Byte(_) | Value::Float(_) | Value::Decimal(_)
    )
}

fn is_numeric_simple(target: &RuntimeType) -> bool {
    matches!(
        target,
        RuntimeType::Int | RuntimeType::Byte | RuntimeType::Float | RuntimeType::Decimal
    )
}

/// Int viewed as byte is stored as a byte.
fn retag(value: &Value, target: &RuntimeType) -> Value {
    match (value, target) {
        (Value::Int(i), RuntimeType::Byte) => match u8::try_from(*i) {
            Ok(b) => Value::Byte(b),
            Err(_) => value.clone(),
        },
        _ => value.clone(),
    }
}
