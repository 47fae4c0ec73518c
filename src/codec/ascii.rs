//! ASCII codec (component 7): tokenizes and formats one element's body in
//! text mode. Rows are newline-separated (any of LF/CRLF/CR, matching the
//! header codec's leniency); within a row, fields are separated by runs of
//! spaces or tabs. Blank lines inside the body are *not* tolerated, since
//! they would silently shift every following row's index (spec §4.7).

use std::io::{BufRead, Write};

use crate::codec::empty_columns;
use crate::errors::{PlyError, PlyResult};
use crate::table::RowTable;
use crate::types::element::ElementSchema;
use crate::types::property::PropertyType;
use crate::types::scalar::{scalar_from_len, ScalarValue};
use crate::util::read_raw_line;

fn decode_err(schema: &ElementSchema, row: u64, property: Option<&str>, message: impl Into<String>) -> PlyError {
    let mut err = PlyError::decode(schema.name.clone(), row, message);
    if let Some(p) = property {
        err = err.with_property(p);
    }
    err
}

/// Reads `schema.count` rows of ASCII-encoded data from `reader`.
pub fn read_element<R: BufRead>(reader: &mut R, schema: &ElementSchema) -> PlyResult<RowTable> {
    let count = schema.count_usize()?;
    let mut cols = empty_columns(schema, count);
    let mut buf = Vec::new();
    for row in 0..count {
        let n = read_raw_line(reader, &mut buf)
            .map_err(|e| decode_err(schema, row as u64, None, format!("{e}")))?;
        if n == 0 && buf.is_empty() {
            return Err(decode_err(
                schema,
                row as u64,
                None,
                format!("unexpected end of input; element '{}' declares {} rows", schema.name, count),
            ));
        }
        let text = std::str::from_utf8(&buf)
            .map_err(|_| decode_err(schema, row as u64, None, "row is not valid UTF-8"))?;
        let mut tokens = text.split([' ', '\t']).filter(|t| !t.is_empty());
        for prop in schema.properties.values() {
            match prop.data_type {
                PropertyType::Scalar(ty) => {
                    let tok = tokens.next().ok_or_else(|| {
                        decode_err(schema, row as u64, Some(&prop.name), "row ended before this property")
                    })?;
                    let value = ScalarValue::parse_ascii(ty, tok).map_err(|e| {
                        decode_err(schema, row as u64, Some(&prop.name), e.to_string())
                    })?;
                    cols.get_mut(&prop.name).unwrap().push_scalar(value).expect("type matches by construction");
                }
                PropertyType::List { length_type, value_type } => {
                    let len_tok = tokens.next().ok_or_else(|| {
                        decode_err(schema, row as u64, Some(&prop.name), "row ended before this property's list length")
                    })?;
                    let len_value = ScalarValue::parse_ascii(length_type, len_tok).map_err(|e| {
                        decode_err(schema, row as u64, Some(&prop.name), e.to_string())
                    })?;
                    let n = len_value.as_i64().expect("length_type is integral");
                    if n < 0 {
                        return Err(decode_err(schema, row as u64, Some(&prop.name), format!("negative list length {n}")));
                    }
                    let mut values = Vec::with_capacity(n as usize);
                    for _ in 0..n {
                        let tok = tokens.next().ok_or_else(|| {
                            decode_err(schema, row as u64, Some(&prop.name), "row ended before all list values were read")
                        })?;
                        let value = ScalarValue::parse_ascii(value_type, tok).map_err(|e| {
                            decode_err(schema, row as u64, Some(&prop.name), e.to_string())
                        })?;
                        values.push(value);
                    }
                    cols.get_mut(&prop.name).unwrap().push_list(values).expect("type matches by construction");
                }
            }
        }
        if tokens.next().is_some() {
            return Err(decode_err(schema, row as u64, None, "row has more tokens than the schema declares"));
        }
    }
    RowTable::from_columns(schema.clone(), cols)
}

/// Writes `table`'s rows to `out` in ASCII form: single-space field
/// separators, `\n` row terminators, list properties as `k v0 v1 … v_{k-1}`.
pub fn write_element<W: Write>(out: &mut W, schema: &ElementSchema, table: &RowTable) -> PlyResult<()> {
    for row in 0..table.len() {
        let mut fields: Vec<String> = Vec::new();
        for prop in schema.properties.values() {
            let column = table.get_column(&prop.name)?;
            match prop.data_type {
                PropertyType::Scalar(ty) => {
                    let raw = column.get(row);
                    let value = raw.cast_to(ty).map_err(|e| {
                        decode_err(schema, row as u64, Some(&prop.name), e.to_string())
                    })?;
                    fields.push(value.format_ascii());
                }
                PropertyType::List { length_type, value_type } => {
                    let values = column.get_list(row);
                    let len_value = scalar_from_len(values.len(), length_type).map_err(|e| {
                        decode_err(schema, row as u64, Some(&prop.name), e.to_string())
                    })?;
                    fields.push(len_value.format_ascii());
                    for value in values {
                        let cast = value.cast_to(value_type).map_err(|e| {
                            decode_err(schema, row as u64, Some(&prop.name), e.to_string())
                        })?;
                        fields.push(cast.format_ascii());
                    }
                }
            }
        }
        writeln!(out, "{}", fields.join(" "))?;
    }
    Ok(())
}
