//! Element schema: the declared shape of one element block (e.g. `vertex`).

use indexmap::IndexMap;

use crate::errors::{PlyError, PlyResult};
use crate::types::property::PropertySchema;

/// Keywords reserved by the header grammar. A name colliding with one of
/// these cannot be emitted, since it would be unparseable on the way back in.
const RESERVED: &[&str] = &[
    "ply", "format", "comment", "obj_info", "element", "property", "end_header", "list",
];

/// Checks that `name` is non-empty, contains no whitespace or control
/// characters, and does not collide with a header keyword.
pub fn validate_name(name: &str) -> PlyResult<()> {
    if name.is_empty() {
        return Err(PlyError::Inconsistent("names must not be empty".to_string()));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(PlyError::Inconsistent(format!(
            "name '{name}' contains whitespace or control characters"
        )));
    }
    if RESERVED.contains(&name) {
        return Err(PlyError::Inconsistent(format!(
            "name '{name}' collides with a reserved header keyword"
        )));
    }
    Ok(())
}

/// The declared schema of one element block: its name, row count, the
/// ordered list of properties each row carries, and any `comment` lines
/// that appeared inside this element's header block (spec §3/§4.3 —
/// distinct from the container-level comments that precede the first
/// `element` line).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ElementSchema {
    /// Name of the element, e.g. `"vertex"` or `"face"`.
    pub name: String,
    /// Number of rows the header declares for this element. Declared as a
    /// `u64` since the format does not cap it at `usize`; building an
    /// in-memory table still requires it to fit `usize`.
    pub count: u64,
    /// Ordered map of this element's properties, in declaration order.
    pub properties: IndexMap<String, PropertySchema>,
    /// `comment` lines that appeared inside this element's header block,
    /// in declaration order.
    pub comments: Vec<String>,
}

impl ElementSchema {
    /// Creates a new, empty element schema with the given name and count.
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        ElementSchema {
            name: name.into(),
            count,
            properties: IndexMap::new(),
            comments: Vec::new(),
        }
    }

    /// Appends a property to this element's schema, keyed by its name.
    pub fn push_property(&mut self, property: PropertySchema) {
        self.properties.insert(property.name.clone(), property);
    }

    /// An element is fixed-layout when every property is a scalar, i.e. the
    /// byte size of one row is a compile-time-known constant.
    pub fn is_fixed_layout(&self) -> bool {
        self.properties.values().all(|p| p.data_type.is_fixed_width())
    }

    /// Byte size of one row, if this element is fixed-layout.
    pub fn fixed_row_width(&self) -> Option<usize> {
        if !self.is_fixed_layout() {
            return None;
        }
        Some(
            self.properties
                .values()
                .map(|p| p.data_type.fixed_byte_width().unwrap())
                .sum(),
        )
    }

    /// Validates that the element's own name and every property name are
    /// well-formed and free of reserved-keyword collisions.
    pub fn validate(&self) -> PlyResult<()> {
        validate_name(&self.name)?;
        for name in self.properties.keys() {
            validate_name(name)?;
        }
        Ok(())
    }

    /// Structural equivalence per spec §3: same name, count, and property
    /// sequence (by name, position, and type). Unlike the derived
    /// [`PartialEq`], this ignores comments — two elements can be
    /// structurally equivalent while disagreeing on header comment text.
    pub fn is_structurally_equivalent(&self, other: &ElementSchema) -> bool {
        self.name == other.name && self.count == other.count && self.properties == other.properties
    }

    /// `self.count` converted to `usize`, for allocating in-memory storage.
    pub fn count_usize(&self) -> PlyResult<usize> {
        usize::try_from(self.count)
            .map_err(|_| PlyError::Inconsistent(format!(
                "element '{}' declares {} rows, which does not fit in memory on this platform",
                self.name, self.count
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::scalar::ScalarType;

    fn vertex_schema() -> ElementSchema {
        let mut e = ElementSchema::new("vertex", 3);
        e.push_property(PropertySchema::scalar("x", ScalarType::Float));
        e.push_property(PropertySchema::scalar("y", ScalarType::Float));
        e.push_property(PropertySchema::scalar("z", ScalarType::Float));
        e
    }

    #[test]
    fn fixed_layout_vertex() {
        let e = vertex_schema();
        assert!(e.is_fixed_layout());
        assert_eq!(e.fixed_row_width(), Some(12));
    }

    #[test]
    fn ragged_face() {
        let mut e = ElementSchema::new("face", 2);
        e.push_property(
            PropertySchema::list("vertex_indices", ScalarType::UChar, ScalarType::Int).unwrap(),
        );
        assert!(!e.is_fixed_layout());
        assert_eq!(e.fixed_row_width(), None);
    }

    #[test]
    fn validate_rejects_reserved_name() {
        let e = ElementSchema::new("list", 0);
        assert!(e.validate().is_err());
    }

    #[test]
    fn validate_rejects_whitespace_name() {
        let e = ElementSchema::new("bad name", 0);
        assert!(e.validate().is_err());
    }

    #[test]
    fn validate_ok_for_vertex() {
        assert!(vertex_schema().validate().is_ok());
    }

    #[test]
    fn structural_equivalence_ignores_comments() {
        let mut a = vertex_schema();
        let mut b = vertex_schema();
        a.comments.push("a".to_string());
        b.comments.push("different".to_string());
        assert!(a.is_structurally_equivalent(&b));
        assert_ne!(a, b);
    }
}
