use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors that can occur when building a torrent descriptor.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The torrent file contains invalid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    /// A required field is missing from the torrent file.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field has an invalid value or type, or conflicts with another field.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// The info hash is not 20 bytes (40 hex characters) long.
    #[error("invalid info hash length")]
    InvalidInfoHashLength,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
