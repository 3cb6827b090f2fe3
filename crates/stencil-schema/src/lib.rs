mod field;
mod map;

pub use field::{FieldPath, FieldRef, field};
pub use map::{FieldMap, MappedField};
