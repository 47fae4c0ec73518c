//! Type vocabulary shared by the header, row table, and codec modules:
//! scalar types (component 1), property schemas (component 2), and element
//! schemas (component 3).

pub mod element;
pub mod property;
pub mod scalar;

pub use element::ElementSchema;
pub use property::{PropertySchema, PropertyType};
pub use scalar::{ByteOrderTag, ScalarType, ScalarValue};
