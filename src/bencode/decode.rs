use super::error::{BencodeError, Cause, ElementKind};
use super::reader::PeekReader;
use super::value::Value;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::Read;

/// Maximum number of nested lists/dictionaries accepted by default.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Byte strings are read in chunks of this size so that a hostile length
/// prefix cannot force a single huge allocation up front.
const PAYLOAD_CHUNK: usize = 64 * 1024;

/// Decodes a single bencode value occupying the whole of `data`.
///
/// # Errors
///
/// Returns an error if the input is not valid bencode or if bytes remain
/// after the value.
///
/// # Examples
///
/// ```
/// use bitcheck::bencode::{decode, Value};
///
/// let value = decode(b"l4:spam4:eggse").unwrap();
/// assert_eq!(value, Value::List(vec![Value::string("spam"), Value::string("eggs")]));
///
/// let err = decode(b"i01e").unwrap_err();
/// assert_eq!(err.offset(), Some(0));
/// ```
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    decode_reader(data)
}

/// Decodes a single value from a blocking reader and requires the reader to
/// be exhausted afterwards.
///
/// Use [`Decoder`] directly to read one value and leave the rest of the
/// stream untouched.
pub fn decode_reader<R: Read>(reader: R) -> Result<Value, BencodeError> {
    let mut source = PeekReader::new(reader);
    let value = Decoder::new(&mut source).decode()?;
    if !source.at_end()? {
        return Err(BencodeError::TrailingData {
            offset: source.position(),
        });
    }
    Ok(value)
}

/// Decodes bencode values from a [`PeekReader`].
///
/// Each call to [`decode`](Decoder::decode) consumes exactly one value, so
/// a stream of concatenated values can be read one after another.
///
/// ```
/// use bitcheck::bencode::{Decoder, PeekReader, Value};
///
/// let mut source = PeekReader::new(&b"i1ei2e"[..]);
/// let mut decoder = Decoder::new(&mut source);
/// assert_eq!(decoder.decode().unwrap(), Value::Integer(1));
/// assert_eq!(decoder.decode().unwrap(), Value::Integer(2));
/// ```
pub struct Decoder<'a, R> {
    source: &'a mut PeekReader<R>,
    max_depth: usize,
}

impl<'a, R: Read> Decoder<'a, R> {
    pub fn new(source: &'a mut PeekReader<R>) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the maximum number of nested lists and dictionaries.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn decode(&mut self) -> Result<Value, BencodeError> {
        let mut tree = TreeBuilder::new(self.max_depth);
        loop {
            let offset = self.source.position();
            let next = self.source.peek()?;
            let completed = match tree.classify(next, offset)? {
                Token::End => {
                    self.source.read_byte()?;
                    tree.close()?
                }
                Token::Integer => tree.push(Value::Integer(self.read_integer(offset)?))?,
                Token::String => tree.push(Value::Bytes(self.read_string(offset)?))?,
                Token::List => {
                    self.source.read_byte()?;
                    tree.open(ElementKind::List, offset)?;
                    None
                }
                Token::Dict => {
                    self.source.read_byte()?;
                    tree.open(ElementKind::Dictionary, offset)?;
                    None
                }
            };
            if let Some(value) = completed {
                return Ok(value);
            }
        }
    }

    fn read_integer(&mut self, offset: u64) -> Result<i64, BencodeError> {
        self.source.read_byte()?;
        let mut digits = IntegerDigits::default();
        loop {
            let byte = self.source.read_byte()?.ok_or_else(|| {
                BencodeError::malformed(ElementKind::Integer, offset, Cause::MissingTerminator)
            })?;
            let done = digits
                .push(byte)
                .map_err(|cause| BencodeError::malformed(ElementKind::Integer, offset, cause))?;
            if done {
                return Ok(digits.value());
            }
        }
    }

    fn read_string(&mut self, offset: u64) -> Result<Bytes, BencodeError> {
        let mut length = LengthDigits::default();
        loop {
            let byte = self.source.read_byte()?.ok_or_else(|| {
                BencodeError::malformed(ElementKind::String, offset, Cause::MissingTerminator)
            })?;
            let done = length
                .push(byte)
                .map_err(|cause| BencodeError::malformed(ElementKind::String, offset, cause))?;
            if done {
                break;
            }
        }

        let mut payload = Payload::new(length.value());
        while let Some(chunk) = payload.next_chunk() {
            let got = self.source.read_into(chunk)?;
            payload
                .advance(got)
                .map_err(|cause| BencodeError::malformed(ElementKind::String, offset, cause))?;
        }
        Ok(payload.finish())
    }
}

/// What the next element in the input is, decided from its first byte.
pub(super) enum Token {
    End,
    Integer,
    String,
    List,
    Dict,
}

enum Frame {
    List {
        offset: u64,
        items: Vec<Value>,
    },
    Dict {
        offset: u64,
        entries: BTreeMap<Bytes, Value>,
        key: Option<Bytes>,
    },
}

/// The stack of open lists and dictionaries.
///
/// Both decoders drive the same builder, so nesting, key handling and depth
/// limits behave identically whether bytes come from a blocking or an async
/// source. Using an explicit stack also keeps deeply nested input off the
/// call stack.
pub(super) struct TreeBuilder {
    stack: Vec<Frame>,
    max_depth: usize,
}

impl TreeBuilder {
    pub(super) fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            max_depth,
        }
    }

    pub(super) fn classify(&self, next: Option<u8>, offset: u64) -> Result<Token, BencodeError> {
        let byte = match next {
            Some(byte) => byte,
            None => return Err(self.unexpected_end(offset)),
        };

        if byte == b'e' && !self.stack.is_empty() {
            return Ok(Token::End);
        }

        if let Some(Frame::Dict {
            offset: dict_offset,
            key: None,
            ..
        }) = self.stack.last()
        {
            if !byte.is_ascii_digit() {
                return Err(BencodeError::malformed(
                    ElementKind::Dictionary,
                    *dict_offset,
                    Cause::NonStringKey,
                ));
            }
        }

        match byte {
            b'i' => Ok(Token::Integer),
            b'0'..=b'9' => Ok(Token::String),
            b'l' => Ok(Token::List),
            b'd' => Ok(Token::Dict),
            byte => Err(BencodeError::Unsupported { byte, offset }),
        }
    }

    pub(super) fn open(&mut self, kind: ElementKind, offset: u64) -> Result<(), BencodeError> {
        if self.stack.len() >= self.max_depth {
            return Err(BencodeError::NestingTooDeep {
                limit: self.max_depth,
                offset,
            });
        }
        let frame = match kind {
            ElementKind::Dictionary => Frame::Dict {
                offset,
                entries: BTreeMap::new(),
                key: None,
            },
            _ => Frame::List {
                offset,
                items: Vec::new(),
            },
        };
        self.stack.push(frame);
        Ok(())
    }

    /// Adds a finished element to the innermost container. Returns the value
    /// itself when no container is open, meaning decoding is complete.
    pub(super) fn push(&mut self, value: Value) -> Result<Option<Value>, BencodeError> {
        match self.stack.last_mut() {
            None => Ok(Some(value)),
            Some(Frame::List { items, .. }) => {
                items.push(value);
                Ok(None)
            }
            Some(Frame::Dict {
                offset,
                entries,
                key,
            }) => {
                match key.take() {
                    None => match value {
                        Value::Bytes(k) => *key = Some(k),
                        _ => {
                            return Err(BencodeError::malformed(
                                ElementKind::Dictionary,
                                *offset,
                                Cause::NonStringKey,
                            ))
                        }
                    },
                    Some(k) => {
                        if let Some(k) = insert_last_wins(entries, k, value) {
                            tracing::trace!(
                                "duplicate dictionary key {:?} at offset {}, keeping last value",
                                String::from_utf8_lossy(&k),
                                offset
                            );
                        }
                    }
                }
                Ok(None)
            }
        }
    }

    /// Closes the innermost container on its `e` terminator.
    pub(super) fn close(&mut self) -> Result<Option<Value>, BencodeError> {
        let value = match self.stack.pop() {
            Some(Frame::List { items, .. }) => Value::List(items),
            Some(Frame::Dict {
                offset,
                key: Some(_),
                ..
            }) => {
                return Err(BencodeError::malformed(
                    ElementKind::Dictionary,
                    offset,
                    Cause::MissingValue,
                ))
            }
            Some(Frame::Dict { entries, .. }) => Value::Dict(entries),
            None => return Ok(None),
        };
        self.push(value)
    }

    fn unexpected_end(&self, offset: u64) -> BencodeError {
        match self.stack.last() {
            Some(Frame::List { offset, .. }) => {
                BencodeError::malformed(ElementKind::List, *offset, Cause::MissingTerminator)
            }
            Some(Frame::Dict { offset, .. }) => {
                BencodeError::malformed(ElementKind::Dictionary, *offset, Cause::MissingTerminator)
            }
            None => BencodeError::UnexpectedEof { offset },
        }
    }
}

/// Inserts `value` under `key`, replacing any earlier entry. Returns the key
/// when it was already present.
fn insert_last_wins(entries: &mut BTreeMap<Bytes, Value>, key: Bytes, value: Value) -> Option<Bytes> {
    let duplicate = entries.contains_key(&key).then(|| key.clone());
    entries.insert(key, value);
    duplicate
}

/// Digits of an `i...e` integer, fed one byte at a time after the `i`.
#[derive(Default)]
pub(super) struct IntegerDigits {
    value: i64,
    digits: usize,
    negative: bool,
    leading_zero: bool,
}

impl IntegerDigits {
    /// Returns `Ok(true)` once the terminating `e` has been seen.
    pub(super) fn push(&mut self, byte: u8) -> Result<bool, Cause> {
        match byte {
            b'-' if self.digits == 0 && !self.negative => {
                self.negative = true;
                Ok(false)
            }
            b'0'..=b'9' => {
                if self.leading_zero {
                    return Err(Cause::LeadingZero);
                }
                let digit = i64::from(byte - b'0');
                if self.digits == 0 && digit == 0 {
                    if self.negative {
                        return Err(Cause::NegativeZero);
                    }
                    self.leading_zero = true;
                }
                // Accumulate toward the sign so i64::MIN is representable.
                self.value = self
                    .value
                    .checked_mul(10)
                    .and_then(|v| {
                        if self.negative {
                            v.checked_sub(digit)
                        } else {
                            v.checked_add(digit)
                        }
                    })
                    .ok_or(Cause::Overflow)?;
                self.digits += 1;
                Ok(false)
            }
            b'e' if self.digits > 0 => Ok(true),
            b'e' => Err(Cause::Empty),
            other => Err(Cause::BadDigit(other)),
        }
    }

    pub(super) fn value(&self) -> i64 {
        self.value
    }
}

/// Digits of a byte string length prefix, fed up to and including the `:`.
#[derive(Default)]
pub(super) struct LengthDigits {
    value: u64,
    digits: usize,
    leading_zero: bool,
}

impl LengthDigits {
    /// Returns `Ok(true)` once the `:` separator has been seen.
    pub(super) fn push(&mut self, byte: u8) -> Result<bool, Cause> {
        match byte {
            b'0'..=b'9' => {
                if self.leading_zero {
                    return Err(Cause::LeadingZero);
                }
                let digit = u64::from(byte - b'0');
                if self.digits == 0 && digit == 0 {
                    self.leading_zero = true;
                }
                self.value = self
                    .value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(Cause::Overflow)?;
                self.digits += 1;
                Ok(false)
            }
            b':' if self.digits > 0 => Ok(true),
            b':' => Err(Cause::Empty),
            other => Err(Cause::BadDigit(other)),
        }
    }

    pub(super) fn value(&self) -> u64 {
        self.value
    }
}

/// Buffer for a byte string payload of a declared length.
pub(super) struct Payload {
    buf: Vec<u8>,
    filled: usize,
    expected: u64,
}

impl Payload {
    pub(super) fn new(expected: u64) -> Self {
        Self {
            buf: Vec::with_capacity(expected.min(PAYLOAD_CHUNK as u64) as usize),
            filled: 0,
            expected,
        }
    }

    /// The next region to fill, or `None` once the payload is complete.
    pub(super) fn next_chunk(&mut self) -> Option<&mut [u8]> {
        let remaining = self.expected - self.filled as u64;
        if remaining == 0 {
            return None;
        }
        let step = remaining.min(PAYLOAD_CHUNK as u64) as usize;
        self.buf.resize(self.filled + step, 0);
        Some(&mut self.buf[self.filled..])
    }

    /// Records that `n` bytes of the last chunk were filled. A short fill
    /// means the source ran dry.
    pub(super) fn advance(&mut self, n: usize) -> Result<(), Cause> {
        let requested = self.buf.len() - self.filled;
        self.filled += n;
        if n < requested {
            return Err(Cause::Truncated {
                expected: self.expected,
                actual: self.filled as u64,
            });
        }
        Ok(())
    }

    pub(super) fn finish(self) -> Bytes {
        Bytes::from(self.buf)
    }
}
