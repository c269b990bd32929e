use super::*;
use crate::value::scalar_repr;

impl Heap {
    /// Display string of a value, as printed by the CLI and used in error
    /// messages. Top-level strings are bare; strings nested in containers
    /// are quoted. A container met again on the current path prints `...`.
    pub fn repr(&self, value: &Value) -> String {
        match value {
            Value::Nil => "()".to_string(),
            Value::Decimal(d) => format!("{}d", d.normalize()),
            Value::Ref(_) => self.repr_inner(value, &mut Path::new()),
            scalar => scalar_repr(scalar).unwrap_or_default(),
        }
    }

    fn repr_inner(&self, value: &Value, path: &mut Path) -> String {
        let id = match value {
            Value::Str(s) => return format!("\"{}\"", s),
            Value::Ref(id) => *id,
            other => return self.repr(other),
        };
        if !path.insert(id) {
            return "...".to_string();
        }
        let obj = self.get(id);
        let out = match &obj.body {
            Body::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| self.repr_inner(v, path)).collect();
                format!("[{}]", parts.join(", "))
            }
            Body::Mapping(entries) | Body::Object(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, self.repr_inner(v, path)))
                    .collect();
                match (&obj.body, &*obj.ty) {
                    (Body::Object(_), _) => format!("object {{{}}}", parts.join(", ")),
                    (_, RuntimeType::Record(record)) if record.name.is_some() => {
                        format!("{}({})", obj.ty, parts.join(", "))
                    }
                    _ => format!("{{{}}}", parts.join(", ")),
                }
            }
            Body::Handle(payload) => format!("<handle {}>", payload),
            Body::Xml(items) => format!("`{}`", crate::xml::sequence_to_string(items)),
            Body::Error { message, detail } => match detail {
                Some(d) => format!("error(\"{}\", {})", message, self.repr_inner(d, path)),
                None => format!("error(\"{}\")", message),
            },
            Body::Function { name } => format!("<fn {}>", name),
            Body::Future { name } => format!("<future {}>", name),
        };
        path.remove(&id);
        out
    }
}
