//! bitcheck - Bencode and torrent piece verification
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode encoding/decoding over blocking and async sources
//! - [`metainfo`] - BEP-3 torrent descriptors and info hashes
//! - [`verify`] - Checking on-disk data against a torrent's piece hashes

pub mod bencode;
pub mod metainfo;
pub mod verify;

pub use bencode::{decode, decode_async, encode, BencodeError, Value};
pub use metainfo::{File, Info, InfoHash, Metainfo, MetainfoError};
pub use verify::{Validator, Verification, VerifyError, VerifyOptions};
