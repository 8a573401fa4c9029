//! Bencode encoding and decoding ([BEP-3]).
//!
//! Bencode is the serialization format used throughout BitTorrent for
//! `.torrent` files and tracker responses.
//!
//! # Data Types
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! # Sources
//!
//! Decoding reads from a peekable byte source that offers one byte of
//! lookahead and tracks how many bytes were consumed. Two forms share the same
//! contract:
//!
//! - [`PeekReader`] wraps any [`std::io::Read`] and blocks for data.
//! - [`AsyncPeekReader`] wraps any [`tokio::io::AsyncRead`] and suspends the
//!   task while data is in flight.
//!
//! [`Decoder`] and [`AsyncDecoder`] drive the same grammar over them and
//! produce identical values and errors.
//!
//! # Examples
//!
//! ```
//! use bitcheck::bencode::{decode, encode, Value};
//!
//! let value = decode(b"d4:spaml1:a1:bee").unwrap();
//! let spam = value.get(b"spam").and_then(|v| v.as_list()).unwrap();
//! assert_eq!(spam, &vec![Value::string("a"), Value::string("b")]);
//!
//! assert_eq!(encode(&value), b"d4:spaml1:a1:bee");
//! ```
//!
//! Reading from a stream that arrives in pieces:
//!
//! ```
//! use bitcheck::bencode::{AsyncDecoder, AsyncPeekReader, Value};
//! use tokio::io::AsyncWriteExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut tx, rx) = tokio::io::duplex(4);
//! tokio::spawn(async move {
//!     tx.write_all(b"l4:spam").await.unwrap();
//!     tx.write_all(b"i42ee").await.unwrap();
//! });
//!
//! let mut source = AsyncPeekReader::new(rx);
//! let value = AsyncDecoder::new(&mut source).decode().await.unwrap();
//! assert_eq!(value, Value::List(vec![Value::string("spam"), Value::Integer(42)]));
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every grammar error carries the offset at which the failing element
//! started:
//!
//! - [`BencodeError::Malformed`] - a string, integer, list or dictionary is
//!   invalid (leading zeros, overflow, truncation, missing terminator, ...)
//! - [`BencodeError::Unsupported`] - a byte that starts no element
//! - [`BencodeError::UnexpectedEof`] - input ended where a value was expected
//! - [`BencodeError::NestingTooDeep`] - more than [`DEFAULT_MAX_DEPTH`] levels
//! - [`BencodeError::TrailingData`] - extra data after the value
//!
//! Duplicate dictionary keys are accepted; the last occurrence wins.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod async_decode;
mod async_reader;
mod decode;
mod encode;
mod error;
mod reader;
mod value;

pub use async_decode::{decode_async, AsyncDecoder};
pub use async_reader::AsyncPeekReader;
pub use decode::{decode, decode_reader, Decoder, DEFAULT_MAX_DEPTH};
pub use encode::{encode, encode_into, encode_to};
pub use error::{BencodeError, Cause, ElementKind, ErrorKind};
pub use reader::PeekReader;
pub use value::Value;
