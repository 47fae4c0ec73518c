//! PEG grammar for the PLY header and for ASCII payload data lines.
//!
//! This is an internal implementation detail; [`Line`] is the only type
//! that normally crosses the module boundary, consumed line-by-line by
//! [`super::Header::read`].

use crate::types::element::ElementSchema;
use crate::types::property::PropertyType;
use crate::types::scalar::ScalarType;

use super::{Encoding, Version};

/// A single parsed header line.
#[derive(Debug, PartialEq, Clone)]
pub enum Line {
    /// The `ply` magic number line.
    MagicNumber,
    /// A `format <encoding> <version>` line.
    Format((Encoding, Option<Version>)),
    /// A `comment ...` line.
    Comment(String),
    /// An `obj_info ...` line.
    ObjInfo(String),
    /// An `element <name> <count>` line.
    Element(Option<ElementSchema>),
    /// A `property ...` line: name and declared type.
    Property(String, PropertyType),
    /// The `end_header` terminator line.
    EndHeader,
}

peg::parser! {pub grammar grammar() for str {

pub rule number() -> &'input str
    = n:$(['0'..='9']+) { n }

rule space() = [' '|'\t']+

rule uint() -> Option<u64>
    = n:$(['0'..='9']+) {
        n.parse::<u64>().ok()
    }

// Element/property names accept any run of non-whitespace, printable
// characters, not just C-style identifiers: the format itself only
// requires "no embedded whitespace" (control-character and reserved-
// keyword rejection happen after parsing, with full error context).
rule name() -> &'input str
    = s:$((!(" " / "\t" / "\n" / "\r") [_])+) { s }

rule text() -> &'input str
    = s:$((!['\n'|'\r'][_])+) { s }

rule line_break()
    = "\r\n" / ['\n'|'\r']

rule scalar() -> ScalarType
    = "char"    { ScalarType::Char }
    / "int8"    { ScalarType::Char }
    / "uchar"   { ScalarType::UChar }
    / "uint8"   { ScalarType::UChar }
    / "short"   { ScalarType::Short }
    / "int16"   { ScalarType::Short }
    / "uint16"  { ScalarType::UShort }
    / "ushort"  { ScalarType::UShort }
    / "int32"   { ScalarType::Int }
    / "int"     { ScalarType::Int }
    / "uint32"  { ScalarType::UInt }
    / "uint"    { ScalarType::UInt }
    / "float32" { ScalarType::Float }
    / "float64" { ScalarType::Double }
    / "float"   { ScalarType::Float }
    / "double"  { ScalarType::Double }

rule data_type() -> PropertyType
    = s:scalar()   { PropertyType::Scalar(s) }
    / "list" space() it:scalar() space() t:scalar() {
        PropertyType::List { length_type: it, value_type: t }
    }

pub rule magic_number()
    = "ply"

pub rule format() -> (Encoding, Option<Version>)
    = "format" space() "ascii" space() v:version() { (Encoding::Ascii, v) }
    / "format" space() "binary_big_endian" space() v:version() { (Encoding::BinaryBigEndian, v) }
    / "format" space() "binary_little_endian" space() v:version() { (Encoding::BinaryLittleEndian, v) }

rule version() -> Option<Version>
    = maj:uint() "." min:uint() {{
        let maj = maj?;
        let min = min?;
        Some(Version {
            major: u16::try_from(maj).ok()?,
            minor: u8::try_from(min).ok()?,
        })
    }}

pub rule comment() -> String
    = "comment" space() c:text() {
        c.to_string()
    }
    / "comment" space()? {
        String::new()
    }

pub rule obj_info() -> String
    = "obj_info" space() c:text() {
        c.to_string()
    }
    / "obj_info" space()? {
        String::new()
    }

pub rule element() -> Option<ElementSchema>
    = "element" space() id:name() space() n:uint() {
        n.map(|count| ElementSchema::new(id.to_owned(), count))
    }

pub rule property() -> (String, PropertyType)
    = "property" space() data_type:data_type() space() id:name() {
        (id.to_owned(), data_type)
    }

pub rule end_header()
    = "end_header"

pub rule line() -> Line
    = l:trimmed_line() space()? line_break()? { l }

rule trimmed_line() -> Line
    = magic_number() { Line::MagicNumber }
    / end_header() { Line::EndHeader }
    / v:format() { Line::Format(v) }
    / v:obj_info() { Line::ObjInfo(v) }
    / v:comment() { Line::Comment(v) }
    / v:element() { Line::Element(v) }
    / v:property() { Line::Property(v.0, v.1) }

rule any_number() -> &'input str
    = s:$(['-'|'+']? ['0'..='9']+("."['0'..='9']+)?(['e'|'E']['-'|'+']?['0'..='9']+)?) { s }

rule trimmed_data_line() -> Vec<&'input str>
    = any_number() ** space()

pub rule data_line() -> Vec<&'input str>
    = space()? l:trimmed_data_line() space()? line_break()? { l }

}}
