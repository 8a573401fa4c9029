use super::async_reader::AsyncPeekReader;
use super::decode::{IntegerDigits, LengthDigits, Payload, Token, TreeBuilder, DEFAULT_MAX_DEPTH};
use super::error::{BencodeError, Cause, ElementKind};
use super::value::Value;
use bytes::Bytes;
use tokio::io::AsyncRead;

/// Decodes a single value from an async reader and requires the reader to be
/// exhausted afterwards.
///
/// # Examples
///
/// ```
/// use bitcheck::bencode::{decode_async, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let value = decode_async(&b"d3:cow3:mooe"[..]).await.unwrap();
/// assert_eq!(value.get(b"cow"), Some(&Value::string("moo")));
/// # }
/// ```
pub async fn decode_async<R: AsyncRead + Unpin>(reader: R) -> Result<Value, BencodeError> {
    let mut source = AsyncPeekReader::new(reader);
    let value = AsyncDecoder::new(&mut source).decode().await?;
    if !source.at_end().await? {
        return Err(BencodeError::TrailingData {
            offset: source.position(),
        });
    }
    Ok(value)
}

/// Decodes bencode values from an [`AsyncPeekReader`].
///
/// Produces exactly the same values and errors as
/// [`Decoder`](super::Decoder); only the fetching of bytes may suspend.
pub struct AsyncDecoder<'a, R> {
    source: &'a mut AsyncPeekReader<R>,
    max_depth: usize,
}

impl<'a, R: AsyncRead + Unpin> AsyncDecoder<'a, R> {
    pub fn new(source: &'a mut AsyncPeekReader<R>) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub async fn decode(&mut self) -> Result<Value, BencodeError> {
        let mut tree = TreeBuilder::new(self.max_depth);
        loop {
            let offset = self.source.position();
            let next = self.source.peek().await?;
            let completed = match tree.classify(next, offset)? {
                Token::End => {
                    self.source.read_byte().await?;
                    tree.close()?
                }
                Token::Integer => tree.push(Value::Integer(self.read_integer(offset).await?))?,
                Token::String => tree.push(Value::Bytes(self.read_string(offset).await?))?,
                Token::List => {
                    self.source.read_byte().await?;
                    tree.open(ElementKind::List, offset)?;
                    None
                }
                Token::Dict => {
                    self.source.read_byte().await?;
                    tree.open(ElementKind::Dictionary, offset)?;
                    None
                }
            };
            if let Some(value) = completed {
                return Ok(value);
            }
        }
    }

    async fn read_integer(&mut self, offset: u64) -> Result<i64, BencodeError> {
        self.source.read_byte().await?;
        let mut digits = IntegerDigits::default();
        loop {
            let byte = self.source.read_byte().await?.ok_or_else(|| {
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

    async fn read_string(&mut self, offset: u64) -> Result<Bytes, BencodeError> {
        let mut length = LengthDigits::default();
        loop {
            let byte = self.source.read_byte().await?.ok_or_else(|| {
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
            let got = self.source.read_into(chunk).await?;
            payload
                .advance(got)
                .map_err(|cause| BencodeError::malformed(ElementKind::String, offset, cause))?;
        }
        Ok(payload.finish())
    }
}
