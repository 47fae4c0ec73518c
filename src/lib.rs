//! A columnar reader/writer for the PLY (Polygon File Format) interchange
//! format.
//!
//! Unlike a row-of-structs representation, every element's payload is
//! decoded into one [`table::Column`] per property: a dense `Vec<T>` for
//! scalar properties, a `Vec<Vec<T>>` for list properties. Fixed-layout
//! binary elements (those with no list property) can additionally be
//! served directly from a memory map instead of an owned buffer — see
//! [`mmap`] and [`container::MemoryMapPolicy`].
//!
//! The three encodings PLY defines — `ascii`, `binary_little_endian`,
//! `binary_big_endian` — are fully interchangeable on read and write: a
//! [`container::Container`] read from one encoding can be written back out
//! in either of the other two, with values cast to each property's
//! declared type as needed ([`types::scalar::ScalarValue::cast_to`]).
//!
//! ```rust
//! use ply_table_rs::container::{Container, ReadOptions};
//! use ply_table_rs::ScalarValue;
//! use std::io::Cursor;
//!
//! let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 1.5\n";
//! let container = Container::read(Cursor::new(text), &ReadOptions::default()).unwrap();
//! let vertex = container.get_element("vertex").unwrap();
//! assert_eq!(vertex.len(), 1);
//! assert_eq!(vertex.row(0).unwrap().get("z").unwrap(), ScalarValue::Float(1.5));
//! ```

pub mod codec;
pub mod container;
pub mod errors;
pub mod header;
pub mod mmap;
pub mod table;
pub mod types;
mod util;

pub use container::{Container, MemoryMapPolicy, ReadOptions};
pub use errors::{PlyError, PlyResult};
pub use header::{Encoding, Header, Version};
pub use table::{Column, RowTable};
pub use types::element::ElementSchema;
pub use types::property::{PropertySchema, PropertyType};
pub use types::scalar::{ByteOrderTag, ScalarType, ScalarValue};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
