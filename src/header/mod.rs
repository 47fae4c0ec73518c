//! Header codec: parses and emits the textual PLY header that precedes
//! every element's payload, whichever encoding that payload uses.
//!
//! Grammar details live in [`grammar`]; this module owns the line-oriented
//! state machine that turns a sequence of [`grammar::Line`]s into a
//! [`Header`], the positional error context attached along the way, and the
//! canonical emitter used when writing.

pub mod grammar;

use std::fmt;
use std::io::{BufRead, Write};

use indexmap::IndexMap;

use crate::errors::{PlyError, PlyResult};
use crate::types::element::ElementSchema;
use crate::types::property::{PropertySchema, PropertyType};
use crate::util::{read_raw_line, LocationTracker};

/// Which of the three encodings the payload following this header uses.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Encoding {
    /// Human-readable, one row per text line.
    Ascii,
    /// Packed binary, most significant byte first.
    BinaryBigEndian,
    /// Packed binary, least significant byte first.
    BinaryLittleEndian,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Ascii => "ascii",
            Encoding::BinaryBigEndian => "binary_big_endian",
            Encoding::BinaryLittleEndian => "binary_little_endian",
        })
    }
}

/// The `format` line's version field. In practice always `1.0`, but the
/// header codec round-trips whatever version a file declares.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Version {
    /// Major version number.
    pub major: u16,
    /// Minor version number.
    pub minor: u8,
}

impl Default for Version {
    fn default() -> Self {
        Version { major: 1, minor: 0 }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The fully parsed contents of a PLY header.
#[derive(Debug, PartialEq, Clone)]
pub struct Header {
    /// Payload encoding declared by the `format` line.
    pub encoding: Encoding,
    /// Format version declared by the `format` line.
    pub version: Version,
    /// File-level `comment` lines, in declaration order.
    pub comments: Vec<String>,
    /// File-level `obj_info` lines, in declaration order.
    pub obj_info: Vec<String>,
    /// Elements in declaration order, keyed by name.
    pub elements: IndexMap<String, ElementSchema>,
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    /// An empty ASCII/1.0 header with no elements.
    pub fn new() -> Self {
        Header {
            encoding: Encoding::Ascii,
            version: Version::default(),
            comments: Vec::new(),
            obj_info: Vec::new(),
            elements: IndexMap::new(),
        }
    }

    /// Parses a complete header, from the `ply` magic number through
    /// `end_header`, out of `reader`. Leaves `reader` positioned at the
    /// first byte of the payload.
    pub fn read<R: BufRead>(reader: &mut R) -> PlyResult<Header> {
        let mut tracker = LocationTracker::new();
        let mut buf = Vec::new();
        let mut header = Header::new();
        let mut current_element: Option<String> = None;
        let mut saw_magic = false;
        let mut saw_format = false;

        loop {
            let n = read_raw_line(reader, &mut buf)?;
            if n == 0 && buf.is_empty() {
                return Err(PlyError::HeaderParse {
                    line: tracker.line_index,
                    message: "unexpected end of input before end_header".to_string(),
                });
            }
            tracker.next_line();
            let text = std::str::from_utf8(&buf).map_err(|_| PlyError::HeaderParse {
                line: tracker.line_index,
                message: "header line is not valid UTF-8".to_string(),
            })?;

            let line = grammar::grammar::line(text).map_err(|e| PlyError::HeaderParse {
                line: tracker.line_index,
                message: format!("{e}"),
            })?;

            match line {
                grammar::Line::MagicNumber => {
                    if tracker.line_index != 1 {
                        return Err(PlyError::HeaderParse {
                            line: tracker.line_index,
                            message: "'ply' magic number must be the first line".to_string(),
                        });
                    }
                    saw_magic = true;
                }
                grammar::Line::Format((encoding, version)) => {
                    if !saw_magic {
                        return Err(PlyError::HeaderParse {
                            line: tracker.line_index,
                            message: "'format' line must follow the magic number".to_string(),
                        });
                    }
                    header.encoding = encoding;
                    header.version = version.ok_or_else(|| PlyError::HeaderParse {
                        line: tracker.line_index,
                        message: "format line has an invalid version number".to_string(),
                    })?;
                    saw_format = true;
                }
                grammar::Line::Comment(c) => {
                    // Comments before `format` are explicitly tolerated on
                    // input (spec §4.4/§6/§9 scenario E). Once inside an
                    // element block, a comment attaches to that element
                    // rather than to the container (spec §4.4 "Scoping
                    // rules"); otherwise it's a container-level comment.
                    match &current_element {
                        Some(name) => {
                            header.elements.get_mut(name).expect("current_element always valid").comments.push(c);
                        }
                        None => header.comments.push(c),
                    }
                }
                grammar::Line::ObjInfo(o) => {
                    require_format(saw_format, tracker.line_index)?;
                    if current_element.is_some() {
                        return Err(PlyError::HeaderParse {
                            line: tracker.line_index,
                            message: "obj_info is not allowed inside an element block".to_string(),
                        });
                    }
                    header.obj_info.push(o);
                }
                grammar::Line::Element(e) => {
                    require_format(saw_format, tracker.line_index)?;
                    let e = e.ok_or_else(|| PlyError::HeaderParse {
                        line: tracker.line_index,
                        message: "element line has a row count that does not fit in u64".to_string(),
                    })?;
                    e.validate().map_err(|err| PlyError::HeaderParse {
                        line: tracker.line_index,
                        message: err.to_string(),
                    })?;
                    if header.elements.contains_key(&e.name) {
                        return Err(PlyError::HeaderParse {
                            line: tracker.line_index,
                            message: format!("duplicate element name '{}'", e.name),
                        });
                    }
                    current_element = Some(e.name.clone());
                    header.elements.insert(e.name.clone(), e);
                }
                grammar::Line::Property(name, data_type) => {
                    let elem_name = current_element.as_ref().ok_or_else(|| PlyError::HeaderParse {
                        line: tracker.line_index,
                        message: "property line with no preceding element".to_string(),
                    })?;
                    let schema = build_property_schema(name, data_type).map_err(|err| PlyError::HeaderParse {
                        line: tracker.line_index,
                        message: err.to_string(),
                    })?;
                    let elem = header.elements.get_mut(elem_name).expect("current_element always valid");
                    if elem.properties.contains_key(&schema.name) {
                        return Err(PlyError::HeaderParse {
                            line: tracker.line_index,
                            message: format!("duplicate property name '{}' in element '{}'", schema.name, elem_name),
                        });
                    }
                    validate_property_name(&schema.name, tracker.line_index)?;
                    elem.push_property(schema);
                }
                grammar::Line::EndHeader => {
                    require_format(saw_format, tracker.line_index)?;
                    if header.elements.is_empty() {
                        return Err(PlyError::HeaderParse {
                            line: tracker.line_index,
                            message: "header declares no elements".to_string(),
                        });
                    }
                    return Ok(header);
                }
            }
        }
    }

    /// Writes the canonical textual header (magic number, format,
    /// comments, obj_info, elements-with-properties, `end_header`) to
    /// `out`. Always uses `\n` line endings, regardless of what was read.
    pub fn write<W: Write>(&self, out: &mut W) -> PlyResult<()> {
        writeln!(out, "ply")?;
        writeln!(out, "format {} {}", self.encoding, self.version)?;
        for c in &self.comments {
            writeln!(out, "comment {c}")?;
        }
        for o in &self.obj_info {
            writeln!(out, "obj_info {o}")?;
        }
        for element in self.elements.values() {
            element.validate()?;
            writeln!(out, "element {} {}", element.name, element.count)?;
            for c in &element.comments {
                writeln!(out, "comment {c}")?;
            }
            for prop in element.properties.values() {
                write_property_line(out, prop)?;
            }
        }
        writeln!(out, "end_header")?;
        Ok(())
    }
}

fn require_format(saw_format: bool, line: usize) -> PlyResult<()> {
    if saw_format {
        Ok(())
    } else {
        Err(PlyError::HeaderParse {
            line,
            message: "header content must follow the 'format' line".to_string(),
        })
    }
}

fn validate_property_name(name: &str, line: usize) -> PlyResult<()> {
    crate::types::element::validate_name(name).map_err(|e| PlyError::HeaderParse {
        line,
        message: e.to_string(),
    })
}

fn build_property_schema(name: String, data_type: PropertyType) -> PlyResult<PropertySchema> {
    match data_type {
        PropertyType::Scalar(ty) => Ok(PropertySchema::scalar(name, ty)),
        PropertyType::List { length_type, value_type } => PropertySchema::list(name, length_type, value_type),
    }
}

fn write_property_line<W: Write>(out: &mut W, prop: &PropertySchema) -> PlyResult<()> {
    match prop.data_type {
        PropertyType::Scalar(ty) => {
            writeln!(out, "property {} {}", ty.canonical_name(), prop.name)?;
        }
        PropertyType::List { length_type, value_type } => {
            writeln!(
                out,
                "property list {} {} {}",
                length_type.canonical_name(),
                value_type.canonical_name(),
                prop.name
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> &'static str {
        "ply\nformat ascii 1.0\ncomment made by test\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n"
    }

    #[test]
    fn parses_well_formed_header() {
        let mut cursor = Cursor::new(sample());
        let header = Header::read(&mut cursor).unwrap();
        assert_eq!(header.encoding, Encoding::Ascii);
        assert_eq!(header.comments, vec!["made by test".to_string()]);
        assert_eq!(header.elements.len(), 2);
        assert_eq!(header.elements["vertex"].count, 2);
        assert_eq!(header.elements["vertex"].properties.len(), 3);
        assert!(header.elements["vertex"].is_fixed_layout());
        assert!(!header.elements["face"].is_fixed_layout());
    }

    #[test]
    fn rejects_property_without_element() {
        let text = "ply\nformat ascii 1.0\nproperty float x\nend_header\n";
        let mut cursor = Cursor::new(text);
        assert!(Header::read(&mut cursor).is_err());
    }

    #[test]
    fn rejects_duplicate_element_name() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nelement vertex 1\nproperty float x\nend_header\n";
        let mut cursor = Cursor::new(text);
        assert!(Header::read(&mut cursor).is_err());
    }

    #[test]
    fn tolerates_crlf_and_cr_line_endings() {
        let text = "ply\r\nformat ascii 1.0\rcomment x\r\nelement vertex 1\r\nproperty float x\r\nend_header\r\n";
        let mut cursor = Cursor::new(text);
        let header = Header::read(&mut cursor).unwrap();
        assert_eq!(header.elements["vertex"].count, 1);
    }

    #[test]
    fn round_trips_through_write() {
        let mut cursor = Cursor::new(sample());
        let header = Header::read(&mut cursor).unwrap();
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        let mut cursor2 = Cursor::new(out);
        let header2 = Header::read(&mut cursor2).unwrap();
        assert_eq!(header, header2);
    }

    #[test]
    fn element_comment_attaches_to_element_not_container() {
        let text = "ply\nformat ascii 1.0\ncomment container level\nelement vertex 1\ncomment element level\nproperty float x\nend_header\n";
        let mut cursor = Cursor::new(text);
        let header = Header::read(&mut cursor).unwrap();
        assert_eq!(header.comments, vec!["container level".to_string()]);
        assert_eq!(header.elements["vertex"].comments, vec!["element level".to_string()]);

        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let element_line = text.find("element vertex 1").unwrap();
        let comment_line = text.find("comment element level").unwrap();
        let property_line = text.find("property float32 x").unwrap();
        assert!(element_line < comment_line && comment_line < property_line);
    }

    #[test]
    fn accepts_comment_before_format() {
        let text = "ply\ncomment early\nformat ascii 1.0\nelement vertex 1\nproperty float x\nend_header\n";
        let mut cursor = Cursor::new(text);
        let header = Header::read(&mut cursor).unwrap();
        assert_eq!(header.comments, vec!["early".to_string()]);
    }

    #[test]
    fn rejects_obj_info_before_format() {
        let text = "ply\nobj_info early\nformat ascii 1.0\nend_header\n";
        let mut cursor = Cursor::new(text);
        assert!(Header::read(&mut cursor).is_err());
    }

    #[test]
    fn rejects_element_before_format() {
        let text = "ply\nelement vertex 0\nformat ascii 1.0\nend_header\n";
        let mut cursor = Cursor::new(text);
        assert!(Header::read(&mut cursor).is_err());
    }

    #[test]
    fn rejects_obj_info_inside_element_block() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nobj_info nested\nend_header\n";
        let mut cursor = Cursor::new(text);
        assert!(Header::read(&mut cursor).is_err());
    }

    #[test]
    fn rejects_empty_element_list() {
        let text = "ply\nformat ascii 1.0\nend_header\n";
        let mut cursor = Cursor::new(text);
        assert!(Header::read(&mut cursor).is_err());
    }
}
