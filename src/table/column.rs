//! [`Column`]: one property's worth of decoded values across every row of
//! an element, stored contiguously (scalar) or as a per-row vector (list).
//!
//! The eight scalar kinds are mechanically identical apart from their Rust
//! type, so the enum and its per-kind methods are generated by a single
//! `macro_rules!` invocation rather than written out eight times over.

use crate::errors::{PlyError, PlyResult};
use crate::types::scalar::{ScalarType, ScalarValue};

macro_rules! define_column {
    ( $( ($scalar:ident, $list:ident, $ty:ty) ),* $(,)? ) => {
        /// One property's worth of decoded values, across every row of an
        /// element. Scalar properties store one contiguous `Vec<T>`; list
        /// properties store one `Vec<T>` per row.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Column {
            $(
                #[allow(missing_docs)]
                $scalar(Vec<$ty>),
            )*
            $(
                #[allow(missing_docs)]
                $list(Vec<Vec<$ty>>),
            )*
        }

        impl Column {
            /// The scalar type values of this column are made of (the list
            /// element type, for list columns).
            pub fn scalar_type(&self) -> ScalarType {
                match self {
                    $( Column::$scalar(_) => ScalarType::$scalar, )*
                    $( Column::$list(_) => ScalarType::$scalar, )*
                }
            }

            /// Whether this column holds per-row lists rather than scalars.
            pub fn is_list(&self) -> bool {
                match self {
                    $( Column::$scalar(_) => false, )*
                    $( Column::$list(_) => true, )*
                }
            }

            /// Number of rows stored in this column.
            pub fn len(&self) -> usize {
                match self {
                    $( Column::$scalar(v) => v.len(), )*
                    $( Column::$list(v) => v.len(), )*
                }
            }

            /// Whether this column has zero rows.
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Creates an empty scalar column of the given type.
            pub fn new_scalar(ty: ScalarType) -> Column {
                match ty {
                    $( ScalarType::$scalar => Column::$scalar(Vec::new()), )*
                }
            }

            /// Creates an empty scalar column pre-sized for `capacity` rows.
            pub fn with_capacity_scalar(ty: ScalarType, capacity: usize) -> Column {
                match ty {
                    $( ScalarType::$scalar => Column::$scalar(Vec::with_capacity(capacity)), )*
                }
            }

            /// Creates an empty list column whose values are of type `value_ty`.
            pub fn new_list(value_ty: ScalarType) -> Column {
                match value_ty {
                    $( ScalarType::$scalar => Column::$list(Vec::new()), )*
                }
            }

            /// Creates an empty list column pre-sized for `capacity` rows.
            pub fn with_capacity_list(value_ty: ScalarType, capacity: usize) -> Column {
                match value_ty {
                    $( ScalarType::$scalar => Column::$list(Vec::with_capacity(capacity)), )*
                }
            }

            /// Reads the scalar value at `row`. Panics if this is a list column.
            pub fn get(&self, row: usize) -> ScalarValue {
                match self {
                    $( Column::$scalar(v) => ScalarValue::$scalar(v[row]), )*
                    _ => panic!("get() called on a list column; use get_list()"),
                }
            }

            /// Reads the list at `row`, boxed into [`ScalarValue`]s. Panics
            /// if this is a scalar column.
            pub fn get_list(&self, row: usize) -> Vec<ScalarValue> {
                match self {
                    $( Column::$list(v) => v[row].iter().copied().map(ScalarValue::$scalar).collect(), )*
                    $( Column::$scalar(_) => panic!("get_list() called on a scalar column"), )*
                }
            }

            /// The length of the list at `row`. Panics if this is a scalar column.
            pub fn list_len(&self, row: usize) -> usize {
                match self {
                    $( Column::$list(v) => v[row].len(), )*
                    $( Column::$scalar(_) => panic!("list_len() called on a scalar column"), )*
                }
            }

            /// Appends a scalar value. Errors if `value`'s type does not
            /// match this column's type, or if this is a list column.
            pub fn push_scalar(&mut self, value: ScalarValue) -> PlyResult<()> {
                match (self, value) {
                    $( (Column::$scalar(v), ScalarValue::$scalar(x)) => { v.push(x); Ok(()) } )*
                    _ => Err(PlyError::Inconsistent(
                        "scalar value type does not match column type".to_string(),
                    )),
                }
            }

            /// Overwrites the scalar value at `row` in place. Errors if
            /// `value`'s type does not match this column's type, `row` is
            /// out of bounds, or this is a list column.
            pub fn set_scalar(&mut self, row: usize, value: ScalarValue) -> PlyResult<()> {
                match (self, value) {
                    $(
                        (Column::$scalar(v), ScalarValue::$scalar(x)) => {
                            let slot = v.get_mut(row).ok_or_else(|| {
                                PlyError::Inconsistent(format!("row index {row} out of bounds"))
                            })?;
                            *slot = x;
                            Ok(())
                        }
                    )*
                    _ => Err(PlyError::Inconsistent(
                        "scalar value type does not match column type".to_string(),
                    )),
                }
            }

            /// Appends a list row. Errors if any value's type does not
            /// match this column's value type, or if this is a scalar column.
            pub fn push_list(&mut self, values: Vec<ScalarValue>) -> PlyResult<()> {
                match self {
                    $(
                        Column::$list(v) => {
                            let mut typed = Vec::with_capacity(values.len());
                            for value in values {
                                match value {
                                    ScalarValue::$scalar(x) => typed.push(x),
                                    _ => return Err(PlyError::Inconsistent(
                                        "list value type does not match column type".to_string(),
                                    )),
                                }
                            }
                            v.push(typed);
                            Ok(())
                        }
                    )*
                    _ => Err(PlyError::Inconsistent(
                        "push_list() called on a scalar column".to_string(),
                    )),
                }
            }
        }
    }
}

define_column!(
    (Char, ListChar, i8),
    (UChar, ListUChar, u8),
    (Short, ListShort, i16),
    (UShort, ListUShort, u16),
    (Int, ListInt, i32),
    (UInt, ListUInt, u32),
    (Float, ListFloat, f32),
    (Double, ListDouble, f64),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_push_and_get() {
        let mut col = Column::new_scalar(ScalarType::Int);
        col.push_scalar(ScalarValue::Int(7)).unwrap();
        col.push_scalar(ScalarValue::Int(-3)).unwrap();
        assert_eq!(col.len(), 2);
        assert_eq!(col.get(0), ScalarValue::Int(7));
        assert_eq!(col.get(1), ScalarValue::Int(-3));
        assert!(!col.is_list());
    }

    #[test]
    fn scalar_push_rejects_type_mismatch() {
        let mut col = Column::new_scalar(ScalarType::Int);
        assert!(col.push_scalar(ScalarValue::Float(1.0)).is_err());
    }

    #[test]
    fn list_push_and_get() {
        let mut col = Column::new_list(ScalarType::UInt);
        col.push_list(vec![ScalarValue::UInt(1), ScalarValue::UInt(2), ScalarValue::UInt(3)]).unwrap();
        col.push_list(vec![]).unwrap();
        assert!(col.is_list());
        assert_eq!(col.len(), 2);
        assert_eq!(col.list_len(0), 3);
        assert_eq!(col.list_len(1), 0);
        assert_eq!(
            col.get_list(0),
            vec![ScalarValue::UInt(1), ScalarValue::UInt(2), ScalarValue::UInt(3)]
        );
    }

    #[test]
    fn list_push_rejects_type_mismatch() {
        let mut col = Column::new_list(ScalarType::UInt);
        assert!(col.push_list(vec![ScalarValue::Double(1.0)]).is_err());
    }
}
