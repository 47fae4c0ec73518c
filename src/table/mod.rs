//! Row table: the columnar, in-memory representation of one element's
//! payload (component 5). An element's data is either owned (one `Column`
//! per property, built while reading ASCII or ragged binary payloads) or
//! memory-mapped (a single byte region backing every fixed-layout
//! property's column, built while reading binary payloads whose element
//! has no list property).

pub mod column;

pub use column::Column;

use indexmap::IndexMap;

use crate::errors::{PlyError, PlyResult};
use crate::mmap::MappedElement;
use crate::types::element::ElementSchema;
use crate::types::scalar::ScalarValue;

/// How a [`RowTable`]'s data is actually stored.
pub enum Backing {
    /// One heap-allocated [`Column`] per property.
    Owned(IndexMap<String, Column>),
    /// A single memory-mapped byte region, decoded on access.
    Mapped(MappedElement),
}

/// Whether the backing of a table is owned, memory-mapped read-only, or
/// memory-mapped read-write, mirroring spec component 5's three tags.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BackingKind {
    /// Plain heap-allocated columns.
    Owned,
    /// Memory-mapped, read-only.
    MappedReadOnly,
    /// Memory-mapped, read-write (writes need an explicit flush).
    MappedReadWrite,
}

/// The decoded rows of one element, as columns.
pub struct RowTable {
    schema: ElementSchema,
    backing: Backing,
}

impl RowTable {
    /// Builds an owned row table from already-populated columns, checking
    /// that every declared property has a column of the matching type and
    /// that all columns agree on row count.
    pub fn from_columns(schema: ElementSchema, columns: IndexMap<String, Column>) -> PlyResult<RowTable> {
        let mut len = None;
        for prop in schema.properties.values() {
            let col = columns.get(&prop.name).ok_or_else(|| {
                PlyError::Inconsistent(format!(
                    "element '{}' is missing a column for property '{}'",
                    schema.name, prop.name
                ))
            })?;
            if col.is_list() != matches!(prop.data_type, crate::types::property::PropertyType::List { .. }) {
                return Err(PlyError::Inconsistent(format!(
                    "column '{}' shape does not match its declared property type",
                    prop.name
                )));
            }
            match len {
                None => len = Some(col.len()),
                Some(l) if l != col.len() => {
                    return Err(PlyError::Inconsistent(format!(
                        "columns of element '{}' disagree on row count",
                        schema.name
                    )));
                }
                _ => {}
            }
        }
        Ok(RowTable {
            schema,
            backing: Backing::Owned(columns),
        })
    }

    /// Wraps an already-opened memory mapping as a row table.
    pub fn from_mapped(schema: ElementSchema, mapped: MappedElement) -> RowTable {
        RowTable { schema, backing: Backing::Mapped(mapped) }
    }

    /// The schema this table's rows conform to.
    pub fn schema(&self) -> &ElementSchema {
        &self.schema
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Owned(cols) => cols.values().next().map(Column::len).unwrap_or(0),
            Backing::Mapped(m) => m.count(),
        }
    }

    /// Whether this table has zero rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Which kind of storage backs this table.
    pub fn backing_kind(&self) -> BackingKind {
        match &self.backing {
            Backing::Owned(_) => BackingKind::Owned,
            Backing::Mapped(m) if m.is_read_write() => BackingKind::MappedReadWrite,
            Backing::Mapped(_) => BackingKind::MappedReadOnly,
        }
    }

    /// Property names, in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.schema.properties.keys().map(|s| s.as_str())
    }

    /// Whether a property by this name exists on this table.
    pub fn contains(&self, name: &str) -> bool {
        self.schema.properties.contains_key(name)
    }

    /// Replaces an owned table's column for `name` with `column`, first
    /// checking its row count matches the element's. Type compatibility
    /// with the declared property type is checked lazily, on write (spec
    /// §3 "mismatches trigger implicit casts").
    ///
    /// Errors if this table is memory-mapped: a mapped table's columns are
    /// views over the file's bytes, not independently replaceable buffers;
    /// mutate a mapped table's values in place through [`Self::set_field`]
    /// instead.
    pub fn set_column(&mut self, name: &str, column: Column) -> PlyResult<()> {
        if !self.contains(name) {
            return Err(PlyError::Inconsistent(format!(
                "element '{}' has no property named '{}'",
                self.schema.name, name
            )));
        }
        if column.len() != self.len() {
            return Err(PlyError::Inconsistent(format!(
                "column '{}' has {} rows but element '{}' has {}",
                name, column.len(), self.schema.name, self.len()
            )));
        }
        match &mut self.backing {
            Backing::Owned(cols) => {
                cols.insert(name.to_string(), column);
                Ok(())
            }
            Backing::Mapped(_) => Err(PlyError::Inconsistent(
                "cannot replace a column on a memory-mapped row table".to_string(),
            )),
        }
    }

    /// Mutates a single scalar field in place, for owned tables directly
    /// and for read-write memory-mapped tables via [`MappedElement::write_field`].
    /// Errors for list properties, out-of-bounds rows, or a read-only
    /// mapped table.
    pub fn set_field(&mut self, row: usize, name: &str, value: ScalarValue) -> PlyResult<()> {
        if row >= self.len() {
            return Err(PlyError::Inconsistent(format!(
                "row index {} out of bounds for element '{}' with {} rows",
                row, self.schema.name, self.len()
            )));
        }
        match &mut self.backing {
            Backing::Owned(cols) => {
                let col = cols.get_mut(name).ok_or_else(|| {
                    PlyError::Inconsistent(format!("no such property '{name}'"))
                })?;
                col.set_scalar(row, value)
            }
            Backing::Mapped(mapped) => {
                let field = mapped
                    .fields()
                    .iter()
                    .find(|f| f.name == name)
                    .cloned()
                    .ok_or_else(|| PlyError::Inconsistent(format!("no such property '{name}'")))?;
                mapped.write_field(row, &field, &value)
            }
        }
    }

    /// A typed view over one property's data across every row.
    ///
    /// For an owned table this borrows the underlying [`Column`] directly.
    /// For a memory-mapped table this materializes a fresh [`Column`] by
    /// scanning the mapped bytes once; this is still the only full-size
    /// copy involved (the file's bytes themselves were never copied into
    /// a staging buffer to get here).
    pub fn get_column(&self, name: &str) -> PlyResult<ColumnView<'_>> {
        if !self.schema.properties.contains_key(name) {
            return Err(PlyError::Inconsistent(format!(
                "element '{}' has no property named '{}'",
                self.schema.name, name
            )));
        }
        match &self.backing {
            Backing::Owned(cols) => Ok(ColumnView::Borrowed(&cols[name])),
            Backing::Mapped(mapped) => {
                let field = mapped
                    .fields()
                    .iter()
                    .find(|f| f.name == name)
                    .expect("schema/mapped field lists stay in sync");
                let mut col = Column::with_capacity_scalar(field.ty, mapped.count());
                for row in 0..mapped.count() {
                    col.push_scalar(mapped.read_field(row, field)).expect("types match by construction");
                }
                Ok(ColumnView::Owned(col))
            }
        }
    }

    /// A view over one row, by index.
    pub fn row(&self, index: usize) -> PlyResult<RowView<'_>> {
        if index >= self.len() {
            return Err(PlyError::Inconsistent(format!(
                "row index {} out of bounds for element '{}' with {} rows",
                index, self.schema.name, self.len()
            )));
        }
        Ok(RowView { table: self, index })
    }

    /// Flushes a memory-mapped read-write table's pending writes to disk.
    /// A no-op for owned or read-only tables.
    pub fn flush(&self) -> PlyResult<()> {
        if let Backing::Mapped(m) = &self.backing {
            m.flush()?;
        }
        Ok(())
    }

    pub(crate) fn backing(&self) -> &Backing {
        &self.backing
    }
}

/// A typed view over one property's column, borrowed from an owned table
/// or materialized from a memory-mapped one.
pub enum ColumnView<'a> {
    /// Borrowed directly from an owned table's storage.
    Borrowed(&'a Column),
    /// Materialized by scanning a memory-mapped table.
    Owned(Column),
}

impl<'a> std::ops::Deref for ColumnView<'a> {
    type Target = Column;
    fn deref(&self) -> &Column {
        match self {
            ColumnView::Borrowed(c) => c,
            ColumnView::Owned(c) => c,
        }
    }
}

/// A view over a single row of a [`RowTable`], reading each property
/// on demand.
pub struct RowView<'a> {
    table: &'a RowTable,
    index: usize,
}

impl<'a> RowView<'a> {
    /// The scalar value of a named, non-list property at this row.
    pub fn get(&self, name: &str) -> PlyResult<ScalarValue> {
        match self.table.backing() {
            Backing::Owned(cols) => {
                let col = cols.get(name).ok_or_else(|| {
                    PlyError::Inconsistent(format!("no such property '{name}'"))
                })?;
                Ok(col.get(self.index))
            }
            Backing::Mapped(mapped) => {
                let field = mapped
                    .fields()
                    .iter()
                    .find(|f| f.name == name)
                    .ok_or_else(|| PlyError::Inconsistent(format!("no such property '{name}'")))?;
                Ok(mapped.read_field(self.index, field))
            }
        }
    }

    /// The list value of a named list property at this row.
    pub fn get_list(&self, name: &str) -> PlyResult<Vec<ScalarValue>> {
        match self.table.backing() {
            Backing::Owned(cols) => {
                let col = cols.get(name).ok_or_else(|| {
                    PlyError::Inconsistent(format!("no such property '{name}'"))
                })?;
                Ok(col.get_list(self.index))
            }
            Backing::Mapped(_) => Err(PlyError::Inconsistent(
                "memory-mapped elements are always fixed-layout and have no list properties".to_string(),
            )),
        }
    }

    /// 0-based index of this row within its element.
    pub fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::property::PropertySchema;
    use crate::types::scalar::ScalarType;

    fn vertex_table() -> RowTable {
        let mut schema = ElementSchema::new("vertex", 2);
        schema.push_property(PropertySchema::scalar("x", ScalarType::Float));
        schema.push_property(PropertySchema::scalar("y", ScalarType::Float));
        let mut cols = IndexMap::new();
        let mut xs = Column::new_scalar(ScalarType::Float);
        xs.push_scalar(ScalarValue::Float(1.0)).unwrap();
        xs.push_scalar(ScalarValue::Float(2.0)).unwrap();
        let mut ys = Column::new_scalar(ScalarType::Float);
        ys.push_scalar(ScalarValue::Float(10.0)).unwrap();
        ys.push_scalar(ScalarValue::Float(20.0)).unwrap();
        cols.insert("x".to_string(), xs);
        cols.insert("y".to_string(), ys);
        RowTable::from_columns(schema, cols).unwrap()
    }

    #[test]
    fn len_and_row_access() {
        let table = vertex_table();
        assert_eq!(table.len(), 2);
        let row = table.row(1).unwrap();
        assert_eq!(row.get("x").unwrap(), ScalarValue::Float(2.0));
        assert_eq!(row.get("y").unwrap(), ScalarValue::Float(20.0));
    }

    #[test]
    fn row_out_of_bounds() {
        let table = vertex_table();
        assert!(table.row(5).is_err());
    }

    #[test]
    fn get_column_borrows_for_owned() {
        let table = vertex_table();
        let col = table.get_column("x").unwrap();
        assert_eq!(col.len(), 2);
        assert!(matches!(col, ColumnView::Borrowed(_)));
    }

    #[test]
    fn set_field_mutates_owned_column() {
        let mut table = vertex_table();
        table.set_field(0, "x", ScalarValue::Float(99.0)).unwrap();
        assert_eq!(table.row(0).unwrap().get("x").unwrap(), ScalarValue::Float(99.0));
    }

    #[test]
    fn set_column_replaces_whole_column() {
        let mut table = vertex_table();
        let mut replacement = Column::new_scalar(ScalarType::Float);
        replacement.push_scalar(ScalarValue::Float(5.0)).unwrap();
        replacement.push_scalar(ScalarValue::Float(6.0)).unwrap();
        table.set_column("x", replacement).unwrap();
        assert_eq!(table.row(1).unwrap().get("x").unwrap(), ScalarValue::Float(6.0));
    }

    #[test]
    fn set_column_rejects_length_mismatch() {
        let mut table = vertex_table();
        let mut replacement = Column::new_scalar(ScalarType::Float);
        replacement.push_scalar(ScalarValue::Float(5.0)).unwrap();
        assert!(table.set_column("x", replacement).is_err());
    }

    #[test]
    fn contains_reports_known_and_unknown_names() {
        let table = vertex_table();
        assert!(table.contains("x"));
        assert!(!table.contains("z"));
    }

    #[test]
    fn from_columns_rejects_length_mismatch() {
        let mut schema = ElementSchema::new("vertex", 2);
        schema.push_property(PropertySchema::scalar("x", ScalarType::Float));
        schema.push_property(PropertySchema::scalar("y", ScalarType::Float));
        let mut cols = IndexMap::new();
        let mut xs = Column::new_scalar(ScalarType::Float);
        xs.push_scalar(ScalarValue::Float(1.0)).unwrap();
        let mut ys = Column::new_scalar(ScalarType::Float);
        ys.push_scalar(ScalarValue::Float(1.0)).unwrap();
        ys.push_scalar(ScalarValue::Float(2.0)).unwrap();
        cols.insert("x".to_string(), xs);
        cols.insert("y".to_string(), ys);
        assert!(RowTable::from_columns(schema, cols).is_err());
    }
}
