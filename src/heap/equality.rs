use std::cmp::Ordering;
use std::collections::HashSet;

use super::*;

/// Container pairs already being compared; a pair met again through a
/// cycle is taken as equal.
type PairSet = HashSet<(ValueId, ValueId)>;

impl Heap {
    /// Structural equality (`==`).
    ///
    /// Lists compare element-wise, mappings by key set and per-key value
    /// regardless of insertion order or declared descriptor. Numeric values
    /// follow IEEE / decimal equality (`NaN != NaN`, `-0.0 == 0.0`); a byte
    /// equals the int of the same value. Objects, errors, functions and
    /// futures are equal only to themselves.
    pub fn equals(&self, a: &Value, b: &Value) -> bool {
        self.eq_inner(a, b, &mut PairSet::new())
    }

    /// Exact equality (`===`): the same container, or bitwise-identical
    /// scalars.
    pub fn exact_equals(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Float(x), Value::Float(y)) => {
                (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits()
            }
            (Value::Ref(x), Value::Ref(y)) => x == y,
            _ => scalar_eq(a, b).unwrap_or(false),
        }
    }

    /// Ordering of two values.
    ///
    /// `Ok(None)` when the values are ordered kinds but incomparable (a NaN
    /// is involved). Errors: a value of an unordered kind gives
    /// `UnorderedTypesInComparison`; two ordered values of different kinds
    /// give `UnsupportedComparisonOperation`.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Option<Ordering>, RuntimeError> {
        self.cmp_inner(a, b, &mut PairSet::new())
    }

    fn eq_inner(&self, a: &Value, b: &Value, seen: &mut PairSet) -> bool {
        let (x, y) = match (a, b) {
            (Value::Ref(x), Value::Ref(y)) => (*x, *y),
            (Value::Ref(_), _) | (_, Value::Ref(_)) => return false,
            _ => return scalar_eq(a, b).unwrap_or(false),
        };
        if x == y && !self.contains_float(a) {
            return true;
        }
        if !seen.insert((x, y)) {
            return true;
        }
        match (&self.get(x).body, &self.get(y).body) {
            (Body::List(xs), Body::List(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|(p, q)| self.eq_inner(p, q, seen))
            }
            (Body::Mapping(xs), Body::Mapping(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|(k, p)| match ys.get(k) {
                        Some(q) => self.eq_inner(p, q, seen),
                        None => false,
                    })
            }
            (Body::Xml(xs), Body::Xml(ys)) => xs == ys,
            _ => x == y,
        }
    }

    /// A container equal to itself may still hold a NaN, which is not.
    fn contains_float(&self, value: &Value) -> bool {
        let mut visited = Path::new();
        let mut stack = vec![value];
        while let Some(v) = stack.pop() {
            match v {
                Value::Float(_) => return true,
                Value::Ref(id) if visited.insert(*id) => match &self.get(*id).body {
                    Body::List(_) | Body::Mapping(_) => stack.extend(self.get(*id).body.children()),
                    _ => {}
                },
                _ => {}
            }
        }
        false
    }

    fn cmp_inner(&self, a: &Value, b: &Value, seen: &mut PairSet) -> Result<Option<Ordering>, RuntimeError> {
        let (ka, kb) = (self.order_kind(a), self.order_kind(b));
        for (value, kind) in [(a, ka), (b, kb)] {
            if !kind.is_ordered() {
                return Err(RuntimeError::new(
                    ErrorKind::UnorderedTypesInComparison,
                    format!(
                        "'{}' values cannot be ordered",
                        self.type_of(value)
                    ),
                ));
            }
        }
        if ka != kb {
            return Err(RuntimeError::new(
                ErrorKind::UnsupportedComparisonOperation,
                format!(
                    "unsupported comparison: '{}' and '{}' cannot be compared",
                    self.type_of(a),
                    self.type_of(b)
                ),
            ));
        }
        let ordering = match (a, b) {
            (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
            (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
            (Value::Decimal(x), Value::Decimal(y)) => Some(x.cmp(y)),
            (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
            (Value::Ref(x), Value::Ref(y)) => return self.cmp_lists(*x, *y, seen),
            _ => match (as_int(a), as_int(b)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => None,
            },
        };
        Ok(ordering)
    }

    fn cmp_lists(&self, x: ValueId, y: ValueId, seen: &mut PairSet) -> Result<Option<Ordering>, RuntimeError> {
        if !seen.insert((x, y)) {
            return Ok(Some(Ordering::Equal));
        }
        let (Body::List(xs), Body::List(ys)) = (&self.get(x).body, &self.get(y).body) else {
            return Ok(None);
        };
        for (p, q) in xs.iter().zip(ys) {
            match self.cmp_inner(p, q, seen)? {
                Some(Ordering::Equal) => {}
                other => return Ok(other),
            }
        }
        Ok(Some(xs.len().cmp(&ys.len())))
    }

    /// Kind used for ordering: bytes order as ints, tuples as arrays.
    fn order_kind(&self, value: &Value) -> TypeKind {
        match value {
            Value::Byte(_) => TypeKind::Int,
            Value::Ref(id) => match &self.get(*id).body {
                Body::List(_) => TypeKind::Array,
                _ => self.get(*id).ty.kind(),
            },
            scalar => scalar.scalar_kind().unwrap_or(TypeKind::Nil),
        }
    }
}

/// `None` when either side is not a scalar.
fn scalar_eq(a: &Value, b: &Value) -> Option<bool> {
    Some(match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Decimal(x), Value::Decimal(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Ref(_), _) | (_, Value::Ref(_)) => return None,
        _ => match (as_int(a), as_int(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    })
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Byte(b) => Some(i64::from(*b)),
        _ => None,
    }
}
