use std::fmt;

use thiserror::Error;

/// The element kind a structural error was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    String,
    Integer,
    List,
    Dictionary,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::String => "byte string",
            ElementKind::Integer => "integer",
            ElementKind::List => "list",
            ElementKind::Dictionary => "dictionary",
        };
        f.write_str(name)
    }
}

/// Why an element failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Cause {
    #[error("no digits")]
    Empty,

    #[error("unexpected byte {0:#04x} where a digit was expected")]
    BadDigit(u8),

    #[error("leading zero")]
    LeadingZero,

    #[error("negative zero")]
    NegativeZero,

    #[error("value does not fit in 64 bits")]
    Overflow,

    #[error("missing terminator")]
    MissingTerminator,

    #[error("declared length {expected} but only {actual} bytes available")]
    Truncated { expected: u64, actual: u64 },

    #[error("key is not a byte string")]
    NonStringKey,

    #[error("key without a value")]
    MissingValue,
}

/// Coarse classification of a [`BencodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    String,
    Integer,
    List,
    Dictionary,
    Unsupported,
    UnexpectedEof,
    NestingTooDeep,
    TrailingData,
    Io,
}

impl From<ElementKind> for ErrorKind {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::String => ErrorKind::String,
            ElementKind::Integer => ErrorKind::Integer,
            ElementKind::List => ErrorKind::List,
            ElementKind::Dictionary => ErrorKind::Dictionary,
        }
    }
}

/// Errors produced while decoding bencode.
///
/// Every variant raised by the grammar carries the absolute byte offset at
/// which the failing element started.
#[derive(Debug, Error)]
pub enum BencodeError {
    #[error("invalid {kind} at offset {offset}: {cause}")]
    Malformed {
        kind: ElementKind,
        offset: u64,
        cause: Cause,
    },

    #[error("unsupported element prefix {byte:#04x} at offset {offset}")]
    Unsupported { byte: u8, offset: u64 },

    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("nesting deeper than {limit} levels at offset {offset}")]
    NestingTooDeep { limit: usize, offset: u64 },

    #[error("trailing data after value at offset {offset}")]
    TrailingData { offset: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BencodeError {
    pub(crate) fn malformed(kind: ElementKind, offset: u64, cause: Cause) -> Self {
        BencodeError::Malformed {
            kind,
            offset,
            cause,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BencodeError::Malformed { kind, .. } => (*kind).into(),
            BencodeError::Unsupported { .. } => ErrorKind::Unsupported,
            BencodeError::UnexpectedEof { .. } => ErrorKind::UnexpectedEof,
            BencodeError::NestingTooDeep { .. } => ErrorKind::NestingTooDeep,
            BencodeError::TrailingData { .. } => ErrorKind::TrailingData,
            BencodeError::Io(_) => ErrorKind::Io,
        }
    }

    /// Offset in the input the error refers to, if it came from the grammar.
    pub fn offset(&self) -> Option<u64> {
        match self {
            BencodeError::Malformed { offset, .. }
            | BencodeError::Unsupported { offset, .. }
            | BencodeError::UnexpectedEof { offset }
            | BencodeError::NestingTooDeep { offset, .. }
            | BencodeError::TrailingData { offset } => Some(*offset),
            BencodeError::Io(_) => None,
        }
    }
}
