use thiserror::Error;

/// Errors that can occur when reading or writing PLY files.
///
/// Parsing and decoding errors carry as much positional context as is known at
/// the point of failure: which element, which row within that element, which
/// property, and (for header/ASCII text) which input line. Any of these may be
/// absent, e.g. an I/O error has none of them, a header grammar error has only
/// a line.
#[derive(Debug, Error)]
pub enum PlyError {
    /// An I/O error occurred reading or writing the underlying stream/file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The header text did not match the PLY grammar.
    #[error("header parse error at line {line}: {message}")]
    HeaderParse {
        /// 1-based input line at which the grammar rejected the text.
        line: usize,
        /// Human-readable description of what was expected.
        message: String,
    },

    /// The header was grammatically valid but described an inconsistent
    /// document (duplicate element/property names, a list property used as
    /// a list index type with a floating-point type, an unknown scalar type
    /// alias, and so on).
    #[error("inconsistent header: {0}")]
    Inconsistent(String),

    /// A value in the payload could not be decoded according to its
    /// declared scalar type.
    #[error(
        "decode error in element '{element}' row {row}{}: {message}",
        property.as_ref().map(|p| format!(", property '{p}'")).unwrap_or_default()
    )]
    Decode {
        /// Name of the element being decoded.
        element: String,
        /// 0-based row index within the element.
        row: u64,
        /// Name of the offending property, when known.
        property: Option<String>,
        /// Input line, for ASCII payloads.
        line: Option<usize>,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A list property declared with `known_list_len` did not actually hold
    /// a constant length throughout the element, or some other structural
    /// mismatch between a requested fast path and the data was found.
    #[error("list length mismatch in element '{element}' row {row}: expected {expected}, found {found}")]
    ListLengthMismatch {
        /// Name of the element being decoded.
        element: String,
        /// 0-based row index at which the mismatch was detected.
        row: u64,
        /// Expected constant list length.
        expected: u64,
        /// Actual length found at `row`.
        found: u64,
    },

    /// A scalar type name in the header was not a recognized alias.
    #[error("unknown scalar type '{0}'")]
    UnknownScalarType(String),

    /// Memory mapping was requested but cannot be satisfied (e.g. the
    /// element is not fixed-layout, or the source is not backed by a file).
    #[error("cannot memory-map: {0}")]
    MemoryMap(String),
}

/// A specialized `Result` type for PLY operations.
pub type PlyResult<T> = Result<T, PlyError>;

impl PlyError {
    /// Builds a [`PlyError::Decode`] with only the element and row populated.
    pub fn decode(element: impl Into<String>, row: u64, message: impl Into<String>) -> Self {
        PlyError::Decode {
            element: element.into(),
            row,
            property: None,
            line: None,
            message: message.into(),
        }
    }

    /// Attaches a property name to a [`PlyError::Decode`], leaving other
    /// variants untouched.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        if let PlyError::Decode { property: p, .. } = &mut self {
            *p = Some(property.into());
        }
        self
    }

    /// Attaches an input line number to a [`PlyError::Decode`], leaving
    /// other variants untouched.
    pub fn with_line(mut self, line: usize) -> Self {
        if let PlyError::Decode { line: l, .. } = &mut self {
            *l = Some(line);
        }
        self
    }
}
