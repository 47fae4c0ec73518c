//! Property schema: the declared shape of one named field of an element.

use std::fmt;

use crate::errors::{PlyError, PlyResult};
use crate::types::scalar::ScalarType;

/// Data type used to encode a property in the payload.
///
/// There are two possible shapes: scalars and lists. Lists are a sequence
/// of scalars with a leading integer length value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PropertyType {
    /// Simple, "one-number" type.
    Scalar(ScalarType),
    /// A sequence of scalars of the same type, preceded by an integer
    /// length. The first field is the length's type, the second is the
    /// element type.
    List {
        /// Type used to encode the per-row list length.
        length_type: ScalarType,
        /// Type of each value inside the list.
        value_type: ScalarType,
    },
}

impl PropertyType {
    /// Whether this property type has a fixed, statically known byte width
    /// per row (`true` for scalars, `false` for lists).
    pub fn is_fixed_width(&self) -> bool {
        matches!(self, PropertyType::Scalar(_))
    }

    /// Byte width of one row's worth of data, if fixed (i.e. scalar).
    pub fn fixed_byte_width(&self) -> Option<usize> {
        match self {
            PropertyType::Scalar(t) => Some(t.byte_width()),
            PropertyType::List { .. } => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Scalar(t) => write!(f, "{t}"),
            PropertyType::List { length_type, value_type } => {
                write!(f, "list {length_type} {value_type}")
            }
        }
    }
}

/// The declared schema of a single named property within an element.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PropertySchema {
    /// Unique name of this property within its element.
    pub name: String,
    /// Scalar or list type of this property.
    pub data_type: PropertyType,
}

impl PropertySchema {
    /// Creates a new scalar property schema.
    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        PropertySchema {
            name: name.into(),
            data_type: PropertyType::Scalar(ty),
        }
    }

    /// Creates a new list property schema.
    pub fn list(name: impl Into<String>, length_type: ScalarType, value_type: ScalarType) -> PlyResult<Self> {
        if !length_type.is_integral() {
            return Err(PlyError::Inconsistent(format!(
                "list property '{}' cannot use {} as its length type",
                name.into(), length_type
            )));
        }
        Ok(PropertySchema {
            name: name.into(),
            data_type: PropertyType::List { length_type, value_type },
        })
    }
}
