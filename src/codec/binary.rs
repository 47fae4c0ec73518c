//! Binary codec (component 6): encodes/decodes one element's body in
//! `binary_little_endian`/`binary_big_endian` form.
//!
//! Three read paths exist, chosen by [`crate::container::Container::read`]:
//! a zero-copy memory map (for fixed-layout elements; built in
//! [`crate::mmap`], not here), the bulk owned read below (same shape, but
//! copies the element's bytes into owned [`Column`]s), and the ragged,
//! per-row/per-property read for elements with at least one list property.
//! A fourth path, [`read_known_list_len`], promotes a ragged element to the
//! bulk shape when the caller promises every list property has a constant
//! length, validating that promise as it goes.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::codec::empty_columns;
use crate::errors::{PlyError, PlyResult};
use crate::table::RowTable;
use crate::types::element::ElementSchema;
use crate::types::property::PropertyType;
use crate::types::scalar::{scalar_from_len, ByteOrderTag, ScalarType};

/// Per-property known list lengths for one element, keyed by property
/// name. See [`crate::container::ReadOptions::known_list_len`].
pub type KnownListLen = HashMap<String, u64>;

fn io_err(schema: &ElementSchema, row: u64, property: &str, err: std::io::Error) -> PlyError {
    PlyError::decode(schema.name.clone(), row, format!("{err}")).with_property(property)
}

fn io_err_bulk(schema: &ElementSchema, err: std::io::Error) -> PlyError {
    PlyError::decode(schema.name.clone(), 0, format!("{err}"))
}

/// Reads one element's binary body from `reader`, choosing the bulk path
/// for fixed-layout elements, the known-list-length path when `known`
/// covers every list property, or the ragged per-row path otherwise.
///
/// This is the non-memory-mapped path: [`crate::container::Container`]
/// calls this directly when memory mapping is disabled, the source is not
/// file-backed, or (for fixed-layout elements) always as the decode step
/// behind [`crate::table::RowTable::get_column`] when a mapping was used.
pub fn read_element<R: Read>(
    reader: &mut R,
    schema: &ElementSchema,
    byte_order: ByteOrderTag,
    known: Option<&KnownListLen>,
) -> PlyResult<RowTable> {
    let count = schema.count_usize()?;
    if schema.is_fixed_layout() {
        return read_bulk(reader, schema, byte_order, count);
    }
    if let Some(known) = known {
        if covers_every_list_property(schema, known) {
            return read_known_list_len(reader, schema, byte_order, count, known);
        }
        log::debug!(
            "known_list_len for element '{}' does not cover every list property; falling back to ragged read",
            schema.name
        );
    }
    read_ragged(reader, schema, byte_order, count)
}

/// Whether `known` has an entry for every list property `schema` declares.
pub fn covers_every_list_property(schema: &ElementSchema, known: &KnownListLen) -> bool {
    schema.properties.values().all(|p| match p.data_type {
        PropertyType::List { .. } => known.contains_key(&p.name),
        PropertyType::Scalar(_) => true,
    })
}

fn read_bulk<R: Read>(
    reader: &mut R,
    schema: &ElementSchema,
    byte_order: ByteOrderTag,
    count: usize,
) -> PlyResult<RowTable> {
    let row_size = schema.fixed_row_width().expect("caller checked is_fixed_layout");
    let byte_span = row_size
        .checked_mul(count)
        .ok_or_else(|| PlyError::decode(schema.name.clone(), 0, "element byte span overflows"))?;
    let mut buf = vec![0u8; byte_span];
    reader
        .read_exact(&mut buf)
        .map_err(|e| io_err_bulk(schema, e))?;

    let mut cols = empty_columns(schema, count);
    let mut offset = 0usize;
    for row in 0..count {
        for prop in schema.properties.values() {
            let ty = match prop.data_type {
                PropertyType::Scalar(ty) => ty,
                PropertyType::List { .. } => unreachable!("schema.is_fixed_layout() excludes lists"),
            };
            let width = ty.byte_width();
            let value = byte_order.read(ty, &buf[offset..offset + width]);
            offset += width;
            cols.get_mut(&prop.name)
                .expect("column present for every property")
                .push_scalar(value)
                .map_err(|_| PlyError::decode(schema.name.clone(), row as u64, "type mismatch").with_property(prop.name.clone()))?;
        }
    }
    RowTable::from_columns(schema.clone(), cols)
}

fn read_ragged<R: Read>(
    reader: &mut R,
    schema: &ElementSchema,
    byte_order: ByteOrderTag,
    count: usize,
) -> PlyResult<RowTable> {
    let mut cols = empty_columns(schema, count);
    let mut scratch = [0u8; 8];
    for row in 0..count {
        for prop in schema.properties.values() {
            match prop.data_type {
                PropertyType::Scalar(ty) => {
                    let width = ty.byte_width();
                    reader
                        .read_exact(&mut scratch[..width])
                        .map_err(|e| io_err(schema, row as u64, &prop.name, e))?;
                    let value = byte_order.read(ty, &scratch[..width]);
                    cols.get_mut(&prop.name).unwrap().push_scalar(value).expect("type matches by construction");
                }
                PropertyType::List { length_type, value_type } => {
                    let values = read_one_list(reader, schema, row as u64, &prop.name, byte_order, length_type, value_type)?;
                    cols.get_mut(&prop.name).unwrap().push_list(values).expect("type matches by construction");
                }
            }
        }
    }
    RowTable::from_columns(schema.clone(), cols)
}

fn read_one_list<R: Read>(
    reader: &mut R,
    schema: &ElementSchema,
    row: u64,
    property: &str,
    byte_order: ByteOrderTag,
    length_type: ScalarType,
    value_type: ScalarType,
) -> PlyResult<Vec<crate::types::scalar::ScalarValue>> {
    let mut scratch = [0u8; 8];
    let lw = length_type.byte_width();
    reader
        .read_exact(&mut scratch[..lw])
        .map_err(|e| io_err(schema, row, property, e))?;
    let len_value = byte_order.read(length_type, &scratch[..lw]);
    let n = len_value.as_i64().expect("length_type is integral");
    if n < 0 {
        return Err(PlyError::decode(schema.name.clone(), row, format!("negative list length {n}")).with_property(property));
    }
    let n = n as usize;
    let vw = value_type.byte_width();
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        reader
            .read_exact(&mut scratch[..vw])
            .map_err(|e| io_err(schema, row, property, e))?;
        values.push(byte_order.read(value_type, &scratch[..vw]));
    }
    Ok(values)
}

fn read_known_list_len<R: Read>(
    reader: &mut R,
    schema: &ElementSchema,
    byte_order: ByteOrderTag,
    count: usize,
    known: &KnownListLen,
) -> PlyResult<RowTable> {
    let mut row_size = 0usize;
    for prop in schema.properties.values() {
        row_size += match prop.data_type {
            PropertyType::Scalar(ty) => ty.byte_width(),
            PropertyType::List { length_type, value_type } => {
                let k = known[&prop.name] as usize;
                length_type.byte_width() + k * value_type.byte_width()
            }
        };
    }
    let byte_span = row_size
        .checked_mul(count)
        .ok_or_else(|| PlyError::decode(schema.name.clone(), 0, "element byte span overflows"))?;
    let mut buf = vec![0u8; byte_span];
    reader
        .read_exact(&mut buf)
        .map_err(|e| io_err_bulk(schema, e))?;

    let mut cols = empty_columns(schema, count);
    let mut offset = 0usize;
    for row in 0..count {
        for prop in schema.properties.values() {
            match prop.data_type {
                PropertyType::Scalar(ty) => {
                    let width = ty.byte_width();
                    let value = byte_order.read(ty, &buf[offset..offset + width]);
                    offset += width;
                    cols.get_mut(&prop.name).unwrap().push_scalar(value).expect("type matches");
                }
                PropertyType::List { length_type, value_type } => {
                    let k = known[&prop.name];
                    let lw = length_type.byte_width();
                    let len_value = byte_order.read(length_type, &buf[offset..offset + lw]);
                    offset += lw;
                    let found = len_value.as_i64().expect("length_type is integral");
                    if found != k as i64 {
                        log::warn!(
                            "known_list_len violated for element '{}' property '{}' row {}: expected {}, found {}",
                            schema.name, prop.name, row, k, found
                        );
                        return Err(PlyError::ListLengthMismatch {
                            element: schema.name.clone(),
                            row: row as u64,
                            expected: k,
                            found: found.max(0) as u64,
                        });
                    }
                    let vw = value_type.byte_width();
                    let mut values = Vec::with_capacity(k as usize);
                    for _ in 0..k {
                        values.push(byte_order.read(value_type, &buf[offset..offset + vw]));
                        offset += vw;
                    }
                    cols.get_mut(&prop.name).unwrap().push_list(values).expect("type matches");
                }
            }
        }
    }
    log::trace!(
        "known_list_len fast path validated for element '{}' ({} rows, row size {} bytes)",
        schema.name, count, row_size
    );
    RowTable::from_columns(schema.clone(), cols)
}

/// Writes one element's binary body to `out`, casting each value to its
/// declared property type as it goes (spec §4.6 "implicit casts ...
/// performed element-wise").
pub fn write_element<W: Write>(
    out: &mut W,
    schema: &ElementSchema,
    table: &RowTable,
    byte_order: ByteOrderTag,
) -> PlyResult<()> {
    let mut scratch = [0u8; 8];
    for row in 0..table.len() {
        for prop in schema.properties.values() {
            let column = table.get_column(&prop.name)?;
            match prop.data_type {
                PropertyType::Scalar(ty) => {
                    let raw = column.get(row);
                    let value = raw.cast_to(ty).map_err(|e| {
                        PlyError::decode(schema.name.clone(), row as u64, e.to_string()).with_property(prop.name.clone())
                    })?;
                    let width = ty.byte_width();
                    byte_order.write(&value, &mut scratch[..width]);
                    out.write_all(&scratch[..width])?;
                }
                PropertyType::List { length_type, value_type } => {
                    let values = column.get_list(row);
                    let len_value = scalar_from_len(values.len(), length_type).map_err(|e| {
                        PlyError::decode(schema.name.clone(), row as u64, e.to_string()).with_property(prop.name.clone())
                    })?;
                    let lw = length_type.byte_width();
                    byte_order.write(&len_value, &mut scratch[..lw]);
                    out.write_all(&scratch[..lw])?;
                    let vw = value_type.byte_width();
                    for value in values {
                        let cast = value.cast_to(value_type).map_err(|e| {
                            PlyError::decode(schema.name.clone(), row as u64, e.to_string()).with_property(prop.name.clone())
                        })?;
                        byte_order.write(&cast, &mut scratch[..vw]);
                        out.write_all(&scratch[..vw])?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use crate::types::property::PropertySchema;
    use crate::types::scalar::ScalarValue;
    use std::io::Cursor;

    fn vertex_schema() -> ElementSchema {
        let mut e = ElementSchema::new("vertex", 2);
        e.push_property(PropertySchema::scalar("x", ScalarType::Float));
        e.push_property(PropertySchema::scalar("y", ScalarType::Float));
        e
    }

    fn face_schema(count: u64) -> ElementSchema {
        let mut e = ElementSchema::new("face", count);
        e.push_property(PropertySchema::list("vertex_indices", ScalarType::UChar, ScalarType::Int).unwrap());
        e
    }

    #[test]
    fn bulk_round_trip_little_endian() {
        let schema = vertex_schema();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&2.0f32.to_le_bytes());
        bytes.extend_from_slice(&3.0f32.to_le_bytes());
        bytes.extend_from_slice(&4.0f32.to_le_bytes());
        let mut cursor = Cursor::new(bytes);
        let table = read_element(&mut cursor, &schema, ByteOrderTag::Little, None).unwrap();
        assert_eq!(table.row(0).unwrap().get("x").unwrap(), ScalarValue::Float(1.0));
        assert_eq!(table.row(1).unwrap().get("y").unwrap(), ScalarValue::Float(4.0));

        let mut out = Vec::new();
        write_element(&mut out, &schema, &table, ByteOrderTag::Little).unwrap();
        assert_eq!(out, cursor.into_inner());
    }

    #[test]
    fn ragged_round_trip() {
        let schema = face_schema(2);
        let mut bytes = Vec::new();
        bytes.push(3u8);
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.push(2u8);
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.extend_from_slice(&4i32.to_le_bytes());
        let mut cursor = Cursor::new(bytes.clone());
        let table = read_element(&mut cursor, &schema, ByteOrderTag::Little, None).unwrap();
        assert_eq!(table.row(0).unwrap().get_list("vertex_indices").unwrap().len(), 3);
        assert_eq!(table.row(1).unwrap().get_list("vertex_indices").unwrap().len(), 2);

        let mut out = Vec::new();
        write_element(&mut out, &schema, &table, ByteOrderTag::Little).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn known_list_len_accepts_matching_constant_length() {
        let schema = face_schema(2);
        let mut bytes = Vec::new();
        for vals in [[0i32, 1, 2], [3, 4, 5]] {
            bytes.push(3u8);
            for v in vals {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        let mut known = KnownListLen::new();
        known.insert("vertex_indices".to_string(), 3);
        let mut cursor = Cursor::new(bytes);
        let table = read_element(&mut cursor, &schema, ByteOrderTag::Little, Some(&known)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(1).unwrap().get_list("vertex_indices").unwrap().len(), 3);
    }

    #[test]
    fn known_list_len_rejects_violation() {
        let schema = face_schema(1);
        let mut bytes = Vec::new();
        bytes.push(4u8);
        for v in [0i32, 1, 2, 3] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut known = KnownListLen::new();
        known.insert("vertex_indices".to_string(), 3);
        let mut cursor = Cursor::new(bytes);
        let err = read_element(&mut cursor, &schema, ByteOrderTag::Little, Some(&known)).unwrap_err();
        assert!(matches!(err, PlyError::ListLengthMismatch { expected: 3, found: 4, .. }));
    }

    #[test]
    fn partial_known_list_len_falls_back_to_ragged_silently() {
        let mut schema = face_schema(1);
        schema.push_property(PropertySchema::list("other", ScalarType::UChar, ScalarType::Int).unwrap());
        let mut bytes = Vec::new();
        bytes.push(1u8);
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.push(1u8);
        bytes.extend_from_slice(&8i32.to_le_bytes());
        // Only "vertex_indices" is covered; "other" is not, so the whole
        // element must fall back to the ragged path, not error out.
        let mut known = KnownListLen::new();
        known.insert("vertex_indices".to_string(), 1);
        let mut cursor = Cursor::new(bytes);
        let table = read_element(&mut cursor, &schema, ByteOrderTag::Little, Some(&known)).unwrap();
        assert_eq!(table.row(0).unwrap().get_list("other").unwrap().len(), 1);
    }

    #[test]
    fn big_endian_round_trip() {
        let schema = vertex_schema();
        let mut table_cols = indexmap::IndexMap::new();
        let mut xs = Column::new_scalar(ScalarType::Float);
        xs.push_scalar(ScalarValue::Float(1.5)).unwrap();
        xs.push_scalar(ScalarValue::Float(-2.5)).unwrap();
        let mut ys = Column::new_scalar(ScalarType::Float);
        ys.push_scalar(ScalarValue::Float(0.0)).unwrap();
        ys.push_scalar(ScalarValue::Float(100.0)).unwrap();
        table_cols.insert("x".to_string(), xs);
        table_cols.insert("y".to_string(), ys);
        let table = RowTable::from_columns(schema.clone(), table_cols).unwrap();

        let mut le = Vec::new();
        write_element(&mut le, &schema, &table, ByteOrderTag::Little).unwrap();
        let mut be = Vec::new();
        write_element(&mut be, &schema, &table, ByteOrderTag::Big).unwrap();

        let mut le_reader = Cursor::new(le.clone());
        let decoded_le = read_element(&mut le_reader, &schema, ByteOrderTag::Little, None).unwrap();
        let mut be_reader = Cursor::new(be);
        let decoded_be = read_element(&mut be_reader, &schema, ByteOrderTag::Big, None).unwrap();
        assert_eq!(decoded_le.row(0).unwrap().get("x").unwrap(), decoded_be.row(0).unwrap().get("x").unwrap());
    }
}
