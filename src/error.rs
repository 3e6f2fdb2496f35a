//! Error types for RBSP decoding.

use thiserror::Error;

use crate::header::LumpKind;

/// Errors produced while tokenizing or parsing entity text.
///
/// Offsets are byte offsets into the entity text after NUL truncation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected token {found:?} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        offset: usize,
        found: String,
        expected: &'static str,
    },

    #[error("quoted string starting at offset {offset} did not end in a quote")]
    UnterminatedString { offset: usize },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    /// The scan position does not fall on a UTF-8 character boundary.
    #[error("scan offset {offset} is inside a multi-byte character")]
    NotCharBoundary { offset: usize },
}

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller asked for a lump this tool does not decode.
    #[error("unrecognized lump name {0:?} (expected one of: ents, entities, shaders)")]
    UnknownLump(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is too short for a BSP header: need {expected} bytes, found {found}")]
    TruncatedHeader { expected: usize, found: usize },

    #[error("invalid header ident (expected {:?}, got {:?})", fourcc(.expected), fourcc(.actual))]
    BadIdent { expected: i32, actual: i32 },

    #[error("invalid header version (expected {expected}, got {actual})")]
    BadVersion { expected: i32, actual: i32 },

    #[error(
        "{lump} lump spans {offset}..{} but the file is only {file_len} bytes long",
        lump_end(.offset, .length)
    )]
    LumpOutOfBounds {
        lump: LumpKind,
        offset: u32,
        length: u32,
        file_len: u64,
    },

    /// A lump's length is not a whole number of records and trailing bytes were rejected.
    #[error("{lump} lump ends with {remainder} bytes that do not form a full {record_size}-byte record")]
    PartialRecord {
        lump: LumpKind,
        remainder: usize,
        record_size: usize,
    },

    #[error("{lump} lump bytes could not be viewed as {record_size}-byte records")]
    RecordLayout { lump: LumpKind, record_size: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Writing a decoded record to the output failed.
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Coarse classification of [`Error`], used by callers that need to tell
/// misuse apart from malformed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Format,
    HeaderValidation,
    Parse,
    Encode,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownLump(_) => ErrorKind::Usage,
            Self::Io(_)
            | Self::TruncatedHeader { .. }
            | Self::LumpOutOfBounds { .. }
            | Self::PartialRecord { .. }
            | Self::RecordLayout { .. } => ErrorKind::Format,
            Self::BadIdent { .. } | Self::BadVersion { .. } => ErrorKind::HeaderValidation,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Encode(_) => ErrorKind::Encode,
        }
    }
}

/// Render a little-endian ident as its four on-disk bytes.
fn fourcc(value: &i32) -> String {
    value.to_le_bytes().escape_ascii().to_string()
}

fn lump_end(offset: &u32, length: &u32) -> u64 {
    u64::from(*offset) + u64::from(*length)
}

/// A convenience `Result` type alias using the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
