pub mod error;
pub mod heap;
pub mod json;
pub mod types;
pub mod value;
pub mod xml;

pub use error::{ErrorCategory, ErrorKind, RuntimeError};
pub use heap::{Body, CastMode, Heap, HeapMark, HeapObject, MAX_LIST_SIZE};
pub use types::{parse_type, RuntimeType, TypeRef};
pub use value::{Value, ValueId};
