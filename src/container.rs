//! Container (component 8): the public read/write façade. Aggregates a
//! file's elements (as [`RowTable`]s, each carrying its own
//! [`ElementSchema`]) with the container-level header metadata (format,
//! version, comments, obj_info), and binds them to the body codecs plus
//! the memory-mapping policy.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};

use indexmap::IndexMap;

use crate::codec::{ascii, binary};
use crate::errors::{PlyError, PlyResult};
use crate::header::{Encoding, Header, Version};
use crate::mmap::MappedElement;
use crate::table::RowTable;
use crate::types::scalar::ByteOrderTag;

/// Which memory-mapping mode a read should attempt for fixed-layout
/// elements. Only meaningful for [`Container::read_file`]: the plain
/// [`Container::read`] entry point never has a `File` to map, so it
/// always uses owned reads regardless of this setting (spec §4.6 "if the
/// input supports it").
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum MemoryMapPolicy {
    /// Always read fixed-layout elements into owned buffers.
    #[default]
    Off,
    /// Memory-map fixed-layout elements read-only.
    ReadOnly,
    /// Memory-map fixed-layout elements read-write (flush is explicit).
    ReadWrite,
}

/// Options controlling a [`Container::read`]/[`Container::read_file`] call
/// (spec §4.8).
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Memory-mapping mode for fixed-layout elements.
    pub memory_map: MemoryMapPolicy,
    /// Per-element, per-property constant list lengths the caller
    /// promises hold throughout the file (spec §4.6). An element is only
    /// promoted to the fast path when every one of its list properties
    /// has an entry here; a partial mapping is silently ignored for that
    /// element (no error).
    pub known_list_len: HashMap<String, binary::KnownListLen>,
}

/// The decoded contents of a PLY file: header-level metadata plus every
/// element's row table, in declaration order.
pub struct Container {
    /// Format version declared by (or to be written to) the `format` line.
    pub version: Version,
    /// `true` for the `ascii` encoding; `false` for either binary encoding
    /// (in which case [`Self::byte_order`] picks which one).
    pub text: bool,
    /// Byte order used when `text` is `false`. Ignored when `text` is
    /// `true`. Defaults to this machine's native order
    /// ([`ByteOrderTag::NATIVE`]), so a freshly-built container written
    /// without further configuration picks up "native" at write time, as
    /// spec §4.8 describes.
    pub byte_order: ByteOrderTag,
    /// Container-level `comment` lines (those preceding the first
    /// `element` line), in declaration order.
    pub comments: Vec<String>,
    /// `obj_info` lines, in declaration order.
    pub obj_info: Vec<String>,
    elements: IndexMap<String, RowTable>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// An empty, ASCII-format container with no elements.
    pub fn new() -> Self {
        Container {
            version: Version::default(),
            text: true,
            byte_order: ByteOrderTag::NATIVE,
            comments: Vec::new(),
            obj_info: Vec::new(),
            elements: IndexMap::new(),
        }
    }

    /// The `format` line this container currently resolves to, combining
    /// [`Self::text`] and [`Self::byte_order`] per spec §4.8's ternary
    /// mapping.
    pub fn encoding(&self) -> Encoding {
        if self.text {
            Encoding::Ascii
        } else if self.byte_order == ByteOrderTag::Little {
            Encoding::BinaryLittleEndian
        } else {
            Encoding::BinaryBigEndian
        }
    }

    /// Reads a complete PLY file from any [`Read`] source. Since a generic
    /// source cannot be memory-mapped, this always decodes every element
    /// into owned columns, even if `options.memory_map` requests mapping
    /// (a debug line is logged in that case). Use [`Self::read_file`] to
    /// get the memory-mapped fast path.
    pub fn read<R: Read>(source: R, options: &ReadOptions) -> PlyResult<Container> {
        if options.memory_map != MemoryMapPolicy::Off {
            log::debug!("memory_map requested but the source is not file-backed; reading into owned buffers");
        }
        let mut reader = BufReader::new(source);
        let header = Header::read(&mut reader)?;
        let mut elements = IndexMap::new();
        for schema in header.elements.values() {
            let table = read_body_element(&mut reader, schema, header.encoding, options)?;
            elements.insert(schema.name.clone(), table);
        }
        Ok(Container::from_header(header, elements))
    }

    /// Reads a complete PLY file from an already-opened [`File`], honoring
    /// `options.memory_map` for every fixed-layout element (spec §4.6).
    /// Ragged elements, and fixed-layout elements when mapping is off,
    /// fall back to the same owned read [`Self::read`] uses.
    pub fn read_file(file: File, options: &ReadOptions) -> PlyResult<Container> {
        let cloned = file.try_clone()?;
        let mut reader = CountingReader::new(BufReader::new(cloned));
        let header = Header::read(&mut reader)?;
        let mut elements = IndexMap::new();
        for schema in header.elements.values() {
            let can_map = options.memory_map != MemoryMapPolicy::Off
                && header.encoding != Encoding::Ascii
                && schema.is_fixed_layout();
            let table = if can_map {
                let byte_order = binary_byte_order(header.encoding);
                let count = schema.count_usize()?;
                let row_size = schema.fixed_row_width().expect("checked is_fixed_layout");
                let byte_span = row_size
                    .checked_mul(count)
                    .ok_or_else(|| PlyError::MemoryMap(format!("element '{}' byte span overflows", schema.name)))?;
                let fields = MappedElement::layout_for(schema)?;
                let offset = reader.position();
                let mapped = match options.memory_map {
                    MemoryMapPolicy::ReadOnly => {
                        MappedElement::open_read(&file, offset, row_size, count, byte_order, fields)?
                    }
                    MemoryMapPolicy::ReadWrite => {
                        MappedElement::open_write(&file, offset, row_size, count, byte_order, fields)?
                    }
                    MemoryMapPolicy::Off => unreachable!("can_map is false when Off"),
                };
                skip_exact(&mut reader, byte_span)?;
                log::trace!(
                    "memory-mapped element '{}': {} rows, {} bytes at offset {}",
                    schema.name, count, byte_span, offset
                );
                RowTable::from_mapped(schema.clone(), mapped)
            } else {
                if options.memory_map != MemoryMapPolicy::Off && header.encoding != Encoding::Ascii && !schema.is_fixed_layout() {
                    log::debug!(
                        "element '{}' is not fixed-layout; memory mapping skipped for it",
                        schema.name
                    );
                }
                read_body_element(&mut reader, schema, header.encoding, options)?
            };
            elements.insert(schema.name.clone(), table);
        }
        Ok(Container::from_header(header, elements))
    }

    /// Writes the header and every element's body to `sink`, in the
    /// container's current format and byte order (spec §4.8).
    pub fn write<W: Write>(&self, sink: &mut W) -> PlyResult<()> {
        let header = self.to_header();
        header.write(sink)?;
        for (name, table) in &self.elements {
            let schema = &header.elements[name];
            match header.encoding {
                Encoding::Ascii => ascii::write_element(sink, schema, table)?,
                Encoding::BinaryLittleEndian => binary::write_element(sink, schema, table, ByteOrderTag::Little)?,
                Encoding::BinaryBigEndian => binary::write_element(sink, schema, table, ByteOrderTag::Big)?,
            }
        }
        Ok(())
    }

    /// Builds the [`Header`] this container would currently write: same
    /// encoding/version/comments/obj_info/element schemas, without a
    /// round trip through bytes.
    fn to_header(&self) -> Header {
        let mut header = Header::new();
        header.encoding = self.encoding();
        header.version = self.version;
        header.comments = self.comments.clone();
        header.obj_info = self.obj_info.clone();
        for (name, table) in &self.elements {
            header.elements.insert(name.clone(), table.schema().clone());
        }
        header
    }

    fn from_header(header: Header, elements: IndexMap<String, RowTable>) -> Container {
        Container {
            version: header.version,
            text: header.encoding == Encoding::Ascii,
            byte_order: match header.encoding {
                Encoding::BinaryBigEndian => ByteOrderTag::Big,
                _ => ByteOrderTag::Little,
            },
            comments: header.comments,
            obj_info: header.obj_info,
            elements,
        }
    }

    /// Looks up an element's row table by name.
    pub fn get_element(&self, name: &str) -> Option<&RowTable> {
        self.elements.get(name)
    }

    /// Looks up an element's row table by name, mutably.
    pub fn get_element_mut(&mut self, name: &str) -> Option<&mut RowTable> {
        self.elements.get_mut(name)
    }

    /// Element names, in declaration order.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// All elements, in declaration order.
    pub fn elements(&self) -> &IndexMap<String, RowTable> {
        &self.elements
    }

    /// Appends a new element, keyed by its schema's name. Errors if an
    /// element by that name already exists (spec §9 "duplicate element
    /// names ... specify as an error") or the name is invalid.
    pub fn push_element(&mut self, table: RowTable) -> PlyResult<()> {
        table.schema().validate()?;
        let name = table.schema().name.clone();
        if self.elements.contains_key(&name) {
            return Err(PlyError::Inconsistent(format!("duplicate element name '{name}'")));
        }
        self.elements.insert(name, table);
        Ok(())
    }

    /// Removes and returns the element by this name, if present.
    pub fn remove_element(&mut self, name: &str) -> Option<RowTable> {
        self.elements.shift_remove(name)
    }

    /// Flushes every memory-mapped, read-write element's pending writes.
    /// A no-op for owned or read-only elements.
    pub fn flush(&self) -> PlyResult<()> {
        for table in self.elements.values() {
            table.flush()?;
        }
        Ok(())
    }
}

fn binary_byte_order(encoding: Encoding) -> ByteOrderTag {
    match encoding {
        Encoding::BinaryBigEndian => ByteOrderTag::Big,
        _ => ByteOrderTag::Little,
    }
}

fn read_body_element<R: BufRead>(
    reader: &mut R,
    schema: &crate::types::element::ElementSchema,
    encoding: Encoding,
    options: &ReadOptions,
) -> PlyResult<RowTable> {
    match encoding {
        Encoding::Ascii => ascii::read_element(reader, schema),
        Encoding::BinaryLittleEndian => {
            binary::read_element(reader, schema, ByteOrderTag::Little, options.known_list_len.get(&schema.name))
        }
        Encoding::BinaryBigEndian => {
            binary::read_element(reader, schema, ByteOrderTag::Big, options.known_list_len.get(&schema.name))
        }
    }
}

/// Discards exactly `n` bytes from `reader`, used to advance past an
/// element's body after it was served by a memory map instead of an
/// actual read (spec §4.6 "advance the file position").
fn skip_exact<R: Read>(reader: &mut R, mut n: usize) -> PlyResult<()> {
    let mut buf = [0u8; 8192];
    while n > 0 {
        let chunk = n.min(buf.len());
        reader.read_exact(&mut buf[..chunk])?;
        n -= chunk;
    }
    Ok(())
}

/// Wraps a [`BufRead`] to track the number of bytes consumed from it,
/// giving [`Container::read_file`] the exact file offset at which each
/// element's body starts, without needing `Seek` (header and ragged
/// bodies are consumed through `fill_buf`/`consume` and `read`, both
/// covered below).
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: BufRead> CountingReader<R> {
    fn new(inner: R) -> Self {
        CountingReader { inner, count: 0 }
    }

    fn position(&self) -> u64 {
        self.count
    }
}

impl<R: BufRead> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.count += amt as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::scalar::ScalarValue;
    use std::io::Cursor;

    const TETRAHEDRON: &str = "ply\nformat ascii 1.0\ncomment single tetrahedron with colored faces\nelement vertex 4\ncomment tetrahedron vertices\nproperty float x\nproperty float y\nproperty float z\nelement face 4\nproperty list uchar int vertex_indices\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nend_header\n0 0 0\n0 1 1\n1 0 1\n1 1 0\n3 0 1 2 255 255 255\n3 0 2 3 255 0 0\n3 0 1 3 0 255 0\n3 1 2 3 0 0 255\n";

    #[test]
    fn scenario_a_tetrahedron_ascii() {
        let container = Container::read(Cursor::new(TETRAHEDRON), &ReadOptions::default()).unwrap();
        assert_eq!(container.element_names().collect::<Vec<_>>(), vec!["vertex", "face"]);
        let vertex = container.get_element("vertex").unwrap();
        assert_eq!(vertex.len(), 4);
        assert_eq!(vertex.row(0).unwrap().get("x").unwrap(), ScalarValue::Float(0.0));
        assert_eq!(vertex.row(2).unwrap().get("x").unwrap(), ScalarValue::Float(1.0));
        let face = container.get_element("face").unwrap();
        assert_eq!(
            face.row(0).unwrap().get_list("vertex_indices").unwrap(),
            vec![ScalarValue::Int(0), ScalarValue::Int(1), ScalarValue::Int(2)]
        );
        assert_eq!(face.row(0).unwrap().get("red").unwrap(), ScalarValue::UChar(255));
        assert_eq!(face.row(2).unwrap().get("red").unwrap(), ScalarValue::UChar(0));
    }

    #[test]
    fn scenario_b_format_switch_round_trip() {
        let mut container = Container::read(Cursor::new(TETRAHEDRON), &ReadOptions::default()).unwrap();
        container.text = false;
        container.byte_order = ByteOrderTag::Little;
        let mut bytes = Vec::new();
        container.write(&mut bytes).unwrap();

        let read_back = Container::read(Cursor::new(bytes), &ReadOptions::default()).unwrap();
        assert!(!read_back.text);
        assert_eq!(read_back.byte_order, ByteOrderTag::Little);
        assert_eq!(
            read_back.get_element("vertex").unwrap().row(1).unwrap().get("y").unwrap(),
            ScalarValue::Float(1.0)
        );
        assert_eq!(
            read_back.get_element("face").unwrap().row(3).unwrap().get_list("vertex_indices").unwrap(),
            vec![ScalarValue::Int(1), ScalarValue::Int(2), ScalarValue::Int(3)]
        );
    }

    #[test]
    fn scenario_c_short_ascii_row_is_an_error() {
        let bad = TETRAHEDRON.replace("3 0 1 2 255 255 255\n", "3 0 1 2 255 255\n");
        let err = Container::read(Cursor::new(bad), &ReadOptions::default()).unwrap_err();
        match err {
            PlyError::Decode { element, row, property, .. } => {
                assert_eq!(element, "face");
                assert_eq!(row, 0);
                assert_eq!(property.as_deref(), Some("blue"));
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn scenario_e_comment_before_format_round_trips_to_canonical_position() {
        let text = "ply\ncomment banner\nformat ascii 1.0\nelement vertex 1\nproperty float x\nend_header\n0\n";
        let container = Container::read(Cursor::new(text), &ReadOptions::default()).unwrap();
        assert_eq!(container.comments, vec!["banner".to_string()]);
        let mut out = Vec::new();
        container.write(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let format_idx = out.find("format").unwrap();
        let comment_idx = out.find("comment banner").unwrap();
        assert!(format_idx < comment_idx, "comment must be canonicalized to after format");
    }

    #[test]
    fn scenario_f_cr_only_header_reads_and_rewrites_as_lf() {
        let text = "ply\rformat ascii 1.0\relement vertex 1\rproperty float x\rend_header\r0\r";
        let container = Container::read(Cursor::new(text), &ReadOptions::default()).unwrap();
        assert_eq!(container.get_element("vertex").unwrap().len(), 1);
        let mut out = Vec::new();
        container.write(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains('\r'));
    }

    #[test]
    fn cross_format_round_trip_preserves_values() {
        let original = Container::read(Cursor::new(TETRAHEDRON), &ReadOptions::default()).unwrap();

        let mut to_be: Vec<u8> = Vec::new();
        {
            let mut switched = Container::read(Cursor::new(TETRAHEDRON), &ReadOptions::default()).unwrap();
            switched.text = false;
            switched.byte_order = ByteOrderTag::Big;
            switched.write(&mut to_be).unwrap();
        }
        let via_be = Container::read(Cursor::new(to_be), &ReadOptions::default()).unwrap();

        for name in ["vertex", "face"] {
            let a = original.get_element(name).unwrap();
            let b = via_be.get_element(name).unwrap();
            assert_eq!(a.len(), b.len());
            for row in 0..a.len() {
                for col in a.schema().properties.keys() {
                    if a.schema().properties[col].data_type.is_fixed_width() {
                        assert_eq!(a.row(row).unwrap().get(col).unwrap(), b.row(row).unwrap().get(col).unwrap());
                    } else {
                        assert_eq!(a.row(row).unwrap().get_list(col).unwrap(), b.row(row).unwrap().get_list(col).unwrap());
                    }
                }
            }
        }
    }

    #[test]
    fn push_element_rejects_duplicate_name() {
        let mut container = Container::read(Cursor::new(TETRAHEDRON), &ReadOptions::default()).unwrap();
        let original = container.remove_element("vertex").unwrap();
        let schema = original.schema().clone();
        container.push_element(original).unwrap();

        let mut empty_cols = IndexMap::new();
        for prop in schema.properties.values() {
            empty_cols.insert(prop.name.clone(), crate::table::Column::new_scalar(ScalarValue::Float(0.0).scalar_type()));
        }
        let duplicate = RowTable::from_columns(schema, empty_cols).unwrap();
        assert!(container.push_element(duplicate).is_err());
    }
}
