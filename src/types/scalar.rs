//! Scalar type registry.
//!
//! A PLY header spells scalar types with either a short, historical name
//! (`char`, `uchar`, `short`, ...) or an explicit width-bearing name
//! (`int8`, `uint8`, `int16`, ...). Both spellings decode to the same
//! [`ScalarType`]; this module is the single place that knows the mapping,
//! the byte width of each variant, and how to encode/decode a value in
//! binary (native+swapped, via `byteorder`) or ASCII form.

use std::fmt;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::errors::{PlyError, PlyResult};

/// One of the eight scalar types the PLY format defines.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ScalarType {
    /// Signed 8-bit integer, rust: `i8`.
    Char,
    /// Unsigned 8-bit integer, rust: `u8`.
    UChar,
    /// Signed 16-bit integer, rust: `i16`.
    Short,
    /// Unsigned 16-bit integer, rust: `u16`.
    UShort,
    /// Signed 32-bit integer, rust: `i32`.
    Int,
    /// Unsigned 32-bit integer, rust: `u32`.
    UInt,
    /// 32-bit floating point number, rust: `f32`.
    Float,
    /// 64-bit floating point number, rust: `f64`.
    Double,
}

impl ScalarType {
    /// Parses either the short or the explicit width-bearing spelling of a
    /// scalar type name, as found in a header `property` line.
    pub fn parse_name(name: &str) -> PlyResult<ScalarType> {
        Ok(match name {
            "char" | "int8" => ScalarType::Char,
            "uchar" | "uint8" => ScalarType::UChar,
            "short" | "int16" => ScalarType::Short,
            "ushort" | "uint16" => ScalarType::UShort,
            "int" | "int32" => ScalarType::Int,
            "uint" | "uint32" => ScalarType::UInt,
            "float" | "float32" => ScalarType::Float,
            "double" | "float64" => ScalarType::Double,
            other => return Err(PlyError::UnknownScalarType(other.to_string())),
        })
    }

    /// The canonical, explicit width-bearing spelling used for header
    /// emission (`int8`, `uint8`, ..., `float32`, `float64`). Input accepts
    /// either spelling; output always uses this one.
    pub fn canonical_name(self) -> &'static str {
        match self {
            ScalarType::Char => "int8",
            ScalarType::UChar => "uint8",
            ScalarType::Short => "int16",
            ScalarType::UShort => "uint16",
            ScalarType::Int => "int32",
            ScalarType::UInt => "uint32",
            ScalarType::Float => "float32",
            ScalarType::Double => "float64",
        }
    }

    /// Size in bytes of one value of this type in binary encoding.
    pub fn byte_width(self) -> usize {
        match self {
            ScalarType::Char | ScalarType::UChar => 1,
            ScalarType::Short | ScalarType::UShort => 2,
            ScalarType::Int | ScalarType::UInt | ScalarType::Float => 4,
            ScalarType::Double => 8,
        }
    }

    /// Whether this type is one of the signed/unsigned integer variants
    /// (as opposed to `Float`/`Double`). List-length and list-index types
    /// must be integral.
    pub fn is_integral(self) -> bool {
        !matches!(self, ScalarType::Float | ScalarType::Double)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A decoded scalar value, tagged by its [`ScalarType`].
///
/// This is the leaf value type returned by row-oriented accessors; bulk
/// column storage uses plain `Vec<T>` per type instead of this enum.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ScalarValue {
    /// Signed 8-bit integer scalar (`i8`).
    Char(i8),
    /// Unsigned 8-bit integer scalar (`u8`).
    UChar(u8),
    /// Signed 16-bit integer scalar (`i16`).
    Short(i16),
    /// Unsigned 16-bit integer scalar (`u16`).
    UShort(u16),
    /// Signed 32-bit integer scalar (`i32`).
    Int(i32),
    /// Unsigned 32-bit integer scalar (`u32`).
    UInt(u32),
    /// 32-bit floating point scalar (`f32`).
    Float(f32),
    /// 64-bit floating point scalar (`f64`).
    Double(f64),
}

impl ScalarValue {
    /// The type tag of this value.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarValue::Char(_) => ScalarType::Char,
            ScalarValue::UChar(_) => ScalarType::UChar,
            ScalarValue::Short(_) => ScalarType::Short,
            ScalarValue::UShort(_) => ScalarType::UShort,
            ScalarValue::Int(_) => ScalarType::Int,
            ScalarValue::UInt(_) => ScalarType::UInt,
            ScalarValue::Float(_) => ScalarType::Float,
            ScalarValue::Double(_) => ScalarType::Double,
        }
    }

    /// Converts this value to an `i64`, for use as a list length or index.
    /// Returns `None` for `Float`/`Double`.
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            ScalarValue::Char(v) => v as i64,
            ScalarValue::UChar(v) => v as i64,
            ScalarValue::Short(v) => v as i64,
            ScalarValue::UShort(v) => v as i64,
            ScalarValue::Int(v) => v as i64,
            ScalarValue::UInt(v) => v as i64,
            ScalarValue::Float(_) | ScalarValue::Double(_) => return None,
        })
    }

    /// Renders the value in its ASCII form. Integers use plain decimal;
    /// floats use Rust's shortest round-trippable decimal representation.
    pub fn format_ascii(&self) -> String {
        match *self {
            ScalarValue::Char(v) => v.to_string(),
            ScalarValue::UChar(v) => v.to_string(),
            ScalarValue::Short(v) => v.to_string(),
            ScalarValue::UShort(v) => v.to_string(),
            ScalarValue::Int(v) => v.to_string(),
            ScalarValue::UInt(v) => v.to_string(),
            ScalarValue::Float(v) => format_ascii_f32(v),
            ScalarValue::Double(v) => format_ascii_float(v),
        }
    }

    /// Parses an ASCII token into a value of the given scalar type.
    pub fn parse_ascii(ty: ScalarType, token: &str) -> PlyResult<ScalarValue> {
        fn parse<T: FromStr>(token: &str) -> PlyResult<T> {
            token
                .parse::<T>()
                .map_err(|_| PlyError::Inconsistent(format!("cannot parse '{token}'")))
        }
        Ok(match ty {
            ScalarType::Char => ScalarValue::Char(parse(token)?),
            ScalarType::UChar => ScalarValue::UChar(parse(token)?),
            ScalarType::Short => ScalarValue::Short(parse(token)?),
            ScalarType::UShort => ScalarValue::UShort(parse(token)?),
            ScalarType::Int => ScalarValue::Int(parse(token)?),
            ScalarType::UInt => ScalarValue::UInt(parse(token)?),
            ScalarType::Float => ScalarValue::Float(parse(token)?),
            ScalarType::Double => ScalarValue::Double(parse(token)?),
        })
    }

    /// Reads a value of the given scalar type from `bytes` using byte order
    /// `B`. `bytes` must be exactly `ty.byte_width()` long.
    pub fn read_binary<B: ByteOrder>(ty: ScalarType, bytes: &[u8]) -> ScalarValue {
        match ty {
            ScalarType::Char => ScalarValue::Char(bytes[0] as i8),
            ScalarType::UChar => ScalarValue::UChar(bytes[0]),
            ScalarType::Short => ScalarValue::Short(B::read_i16(bytes)),
            ScalarType::UShort => ScalarValue::UShort(B::read_u16(bytes)),
            ScalarType::Int => ScalarValue::Int(B::read_i32(bytes)),
            ScalarType::UInt => ScalarValue::UInt(B::read_u32(bytes)),
            ScalarType::Float => ScalarValue::Float(B::read_f32(bytes)),
            ScalarType::Double => ScalarValue::Double(B::read_f64(bytes)),
        }
    }

    /// Writes this value into `out` using byte order `B`. `out` must be
    /// exactly `self.scalar_type().byte_width()` long.
    pub fn write_binary<B: ByteOrder>(&self, out: &mut [u8]) {
        match *self {
            ScalarValue::Char(v) => out[0] = v as u8,
            ScalarValue::UChar(v) => out[0] = v,
            ScalarValue::Short(v) => B::write_i16(out, v),
            ScalarValue::UShort(v) => B::write_u16(out, v),
            ScalarValue::Int(v) => B::write_i32(out, v),
            ScalarValue::UInt(v) => B::write_u32(out, v),
            ScalarValue::Float(v) => B::write_f32(out, v),
            ScalarValue::Double(v) => B::write_f64(out, v),
        }
    }
}

impl ScalarValue {
    /// Converts this value to `target`, as the binary and ASCII codecs do
    /// when a row table's column type does not match the schema's declared
    /// property type (spec §3 "implicit casts", §4.6/§7 "unrepresentable
    /// cast on write"). Integer-to-integer casts are checked: the result
    /// must round-trip back to the original value, otherwise this is a
    /// value error rather than a silent truncation. Float-to-float and
    /// int-to-float casts always succeed (with the usual `f32` precision
    /// loss); float-to-int casts are rejected outright.
    pub fn cast_to(&self, target: ScalarType) -> PlyResult<ScalarValue> {
        if self.scalar_type() == target {
            return Ok(*self);
        }
        if target.is_integral() {
            let as_i128: i128 = match *self {
                ScalarValue::Char(v) => v as i128,
                ScalarValue::UChar(v) => v as i128,
                ScalarValue::Short(v) => v as i128,
                ScalarValue::UShort(v) => v as i128,
                ScalarValue::Int(v) => v as i128,
                ScalarValue::UInt(v) => v as i128,
                ScalarValue::Float(_) | ScalarValue::Double(_) => {
                    return Err(PlyError::Inconsistent(format!(
                        "cannot cast a floating-point value to {target}"
                    )));
                }
            };
            fn fits<T>(v: i128) -> PlyResult<T>
            where
                T: TryFrom<i128>,
            {
                T::try_from(v).map_err(|_| {
                    PlyError::Inconsistent(format!("value {v} does not fit in the declared property type"))
                })
            }
            Ok(match target {
                ScalarType::Char => ScalarValue::Char(fits(as_i128)?),
                ScalarType::UChar => ScalarValue::UChar(fits(as_i128)?),
                ScalarType::Short => ScalarValue::Short(fits(as_i128)?),
                ScalarType::UShort => ScalarValue::UShort(fits(as_i128)?),
                ScalarType::Int => ScalarValue::Int(fits(as_i128)?),
                ScalarType::UInt => ScalarValue::UInt(fits(as_i128)?),
                ScalarType::Float | ScalarType::Double => unreachable!("target.is_integral() guards this arm"),
            })
        } else {
            let as_f64: f64 = match *self {
                ScalarValue::Char(v) => v as f64,
                ScalarValue::UChar(v) => v as f64,
                ScalarValue::Short(v) => v as f64,
                ScalarValue::UShort(v) => v as f64,
                ScalarValue::Int(v) => v as f64,
                ScalarValue::UInt(v) => v as f64,
                ScalarValue::Float(v) => v as f64,
                ScalarValue::Double(v) => v,
            };
            Ok(match target {
                ScalarType::Float => ScalarValue::Float(as_f64 as f32),
                ScalarType::Double => ScalarValue::Double(as_f64),
                _ => unreachable!("!target.is_integral() guards this arm"),
            })
        }
    }
}

/// Converts a row's list length into a scalar of the declared length type,
/// bounds-checked (spec §4.6 "cast from the actual per-row array length
/// into the declared length-type, bounds-checked"). `ty` must be one of
/// the integral variants; [`PropertySchema::list`] already rejects a
/// floating-point length type at schema-construction time.
pub fn scalar_from_len(n: usize, ty: ScalarType) -> PlyResult<ScalarValue> {
    let v = n as i128;
    fn fits<T: TryFrom<i128>>(v: i128) -> PlyResult<T> {
        T::try_from(v).map_err(|_| PlyError::Inconsistent(format!(
            "list length {v} does not fit in the declared length type"
        )))
    }
    Ok(match ty {
        ScalarType::Char => ScalarValue::Char(fits(v)?),
        ScalarType::UChar => ScalarValue::UChar(fits(v)?),
        ScalarType::Short => ScalarValue::Short(fits(v)?),
        ScalarType::UShort => ScalarValue::UShort(fits(v)?),
        ScalarType::Int => ScalarValue::Int(fits(v)?),
        ScalarType::UInt => ScalarValue::UInt(fits(v)?),
        ScalarType::Float | ScalarType::Double => {
            return Err(PlyError::Inconsistent("list length type must be integral".to_string()));
        }
    })
}

fn format_ascii_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        // Rust's `Display` for floats already produces the shortest string
        // that round-trips back to the same value.
        v.to_string()
    }
}

/// Like [`format_ascii_float`], but formats through `f32`'s own `Display`
/// rather than widening to `f64` first: widening before formatting would
/// print `f64`'s shortest round-trip digits for a value `f32` cannot
/// represent exactly (e.g. `0.1f32` becomes `0.10000000149011612`).
fn format_ascii_f32(v: f32) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        v.to_string()
    }
}

/// Byte order tag used to select between [`LittleEndian`] and [`BigEndian`]
/// at runtime, mirroring the two binary encodings a header may declare.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ByteOrderTag {
    /// `binary_little_endian`
    Little,
    /// `binary_big_endian`
    Big,
}

impl ByteOrderTag {
    /// The byte order of the machine this crate is compiled for.
    #[cfg(target_endian = "little")]
    pub const NATIVE: ByteOrderTag = ByteOrderTag::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: ByteOrderTag = ByteOrderTag::Big;

    /// Reads a scalar value at runtime-selected byte order.
    pub fn read(self, ty: ScalarType, bytes: &[u8]) -> ScalarValue {
        match self {
            ByteOrderTag::Little => ScalarValue::read_binary::<LittleEndian>(ty, bytes),
            ByteOrderTag::Big => ScalarValue::read_binary::<BigEndian>(ty, bytes),
        }
    }

    /// Writes a scalar value at runtime-selected byte order.
    pub fn write(self, value: &ScalarValue, out: &mut [u8]) {
        match self {
            ByteOrderTag::Little => value.write_binary::<LittleEndian>(out),
            ByteOrderTag::Big => value.write_binary::<BigEndian>(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_accepts_both_spellings() {
        assert_eq!(ScalarType::parse_name("char").unwrap(), ScalarType::Char);
        assert_eq!(ScalarType::parse_name("int8").unwrap(), ScalarType::Char);
        assert_eq!(ScalarType::parse_name("uint").unwrap(), ScalarType::UInt);
        assert_eq!(ScalarType::parse_name("uint32").unwrap(), ScalarType::UInt);
        assert_eq!(ScalarType::parse_name("double").unwrap(), ScalarType::Double);
        assert_eq!(ScalarType::parse_name("float64").unwrap(), ScalarType::Double);
    }

    #[test]
    fn parse_name_rejects_unknown() {
        assert!(ScalarType::parse_name("int64").is_err());
    }

    #[test]
    fn canonical_name_is_explicit_width() {
        assert_eq!(ScalarType::Char.canonical_name(), "int8");
        assert_eq!(ScalarType::Float.canonical_name(), "float32");
        assert_eq!(ScalarType::Double.canonical_name(), "float64");
    }

    #[test]
    fn byte_widths() {
        assert_eq!(ScalarType::Char.byte_width(), 1);
        assert_eq!(ScalarType::Short.byte_width(), 2);
        assert_eq!(ScalarType::Int.byte_width(), 4);
        assert_eq!(ScalarType::Double.byte_width(), 8);
    }

    #[test]
    fn ascii_round_trip_integers() {
        let v = ScalarValue::Int(-42);
        let s = v.format_ascii();
        assert_eq!(s, "-42");
        assert_eq!(ScalarValue::parse_ascii(ScalarType::Int, &s).unwrap(), v);
    }

    #[test]
    fn ascii_round_trip_floats() {
        let v = ScalarValue::Double(1.0 / 3.0);
        let s = v.format_ascii();
        assert_eq!(ScalarValue::parse_ascii(ScalarType::Double, &s).unwrap(), v);
    }

    #[test]
    fn ascii_format_float_does_not_widen_to_double_precision() {
        let v = ScalarValue::Float(0.1);
        assert_eq!(v.format_ascii(), "0.1");
    }

    #[test]
    fn binary_round_trip_little_endian() {
        let v = ScalarValue::Float(3.5);
        let mut buf = [0u8; 4];
        v.write_binary::<LittleEndian>(&mut buf);
        assert_eq!(ScalarValue::read_binary::<LittleEndian>(ScalarType::Float, &buf), v);
    }

    #[test]
    fn binary_round_trip_big_endian() {
        let v = ScalarValue::UInt(0xdead_beef);
        let mut buf = [0u8; 4];
        v.write_binary::<BigEndian>(&mut buf);
        assert_eq!(ScalarValue::read_binary::<BigEndian>(ScalarType::UInt, &buf), v);
    }

    #[test]
    fn cast_widens_integer() {
        let v = ScalarValue::UChar(200);
        assert_eq!(v.cast_to(ScalarType::Int).unwrap(), ScalarValue::Int(200));
    }

    #[test]
    fn cast_narrows_when_value_fits() {
        let v = ScalarValue::Int(10);
        assert_eq!(v.cast_to(ScalarType::UChar).unwrap(), ScalarValue::UChar(10));
    }

    #[test]
    fn cast_rejects_narrowing_overflow() {
        let v = ScalarValue::Int(1000);
        assert!(v.cast_to(ScalarType::UChar).is_err());
    }

    #[test]
    fn cast_rejects_float_to_int() {
        let v = ScalarValue::Double(1.5);
        assert!(v.cast_to(ScalarType::Int).is_err());
    }

    #[test]
    fn cast_int_to_float() {
        let v = ScalarValue::Int(7);
        assert_eq!(v.cast_to(ScalarType::Double).unwrap(), ScalarValue::Double(7.0));
    }
}
