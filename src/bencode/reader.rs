use std::io::{self, Read};

pub(super) const SKIP_CHUNK: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pending {
    #[default]
    Empty,
    Byte(u8),
    End,
}

/// Single-byte lookahead bookkeeping shared by [`PeekReader`] and
/// [`AsyncPeekReader`](super::AsyncPeekReader).
///
/// The readers only differ in how they fetch bytes from the underlying
/// source; every decision about the pending byte, the position and the
/// previously returned byte is made here.
#[derive(Debug, Default)]
pub(super) struct Lookahead {
    pending: Pending,
    position: u64,
    previous: Option<u8>,
}

impl Lookahead {
    /// Result of an earlier peek, if one is still pending.
    pub(super) fn peeked(&self) -> Option<Option<u8>> {
        match self.pending {
            Pending::Empty => None,
            Pending::Byte(b) => Some(Some(b)),
            Pending::End => Some(None),
        }
    }

    pub(super) fn set_peeked(&mut self, byte: Option<u8>) {
        self.pending = match byte {
            Some(b) => Pending::Byte(b),
            None => Pending::End,
        };
    }

    /// Takes the pending byte for consumption. `Some(None)` means the source
    /// already reported end of input.
    pub(super) fn take(&mut self) -> Option<Option<u8>> {
        match self.pending {
            Pending::Empty => None,
            Pending::Byte(b) => {
                self.pending = Pending::Empty;
                Some(Some(b))
            }
            Pending::End => Some(None),
        }
    }

    pub(super) fn mark_end(&mut self) {
        self.pending = Pending::End;
    }

    pub(super) fn consume(&mut self, bytes: &[u8]) {
        if let Some(&last) = bytes.last() {
            self.position += bytes.len() as u64;
            self.previous = Some(last);
        }
    }

    pub(super) fn position(&self) -> u64 {
        self.position
    }

    pub(super) fn previous(&self) -> Option<u8> {
        self.previous
    }
}

/// A blocking byte source with one byte of lookahead and position tracking.
///
/// # Examples
///
/// ```
/// use bitcheck::bencode::PeekReader;
///
/// let mut reader = PeekReader::new(&b"i42e"[..]);
/// assert_eq!(reader.peek().unwrap(), Some(b'i'));
/// assert_eq!(reader.position(), 0);
/// assert_eq!(reader.read_byte().unwrap(), Some(b'i'));
/// assert_eq!(reader.position(), 1);
/// assert_eq!(reader.previous(), Some(b'i'));
/// ```
#[derive(Debug)]
pub struct PeekReader<R> {
    inner: R,
    state: Lookahead,
}

impl<R: Read> PeekReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            state: Lookahead::default(),
        }
    }

    /// Returns the next byte without consuming it, or `None` at end of input.
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        if let Some(peeked) = self.state.peeked() {
            return Ok(peeked);
        }
        let byte = fetch_byte(&mut self.inner)?;
        self.state.set_peeked(byte);
        Ok(byte)
    }

    /// Consumes and returns the next byte, or `None` at end of input.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.state.take() {
            Some(pending) => pending,
            None => fetch_byte(&mut self.inner)?,
        };
        match byte {
            Some(b) => self.state.consume(&[b]),
            None => self.state.mark_end(),
        }
        Ok(byte)
    }

    /// Fills as much of `buf` as the source can provide.
    ///
    /// Returns fewer than `buf.len()` bytes only when the source is
    /// exhausted. An empty `buf` leaves the reader untouched.
    pub fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut filled = 0;
        match self.state.take() {
            Some(Some(b)) => {
                buf[0] = b;
                filled = 1;
            }
            Some(None) => return Ok(0),
            None => {}
        }

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.state.mark_end();
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.state.consume(&buf[..filled]);
                    return Err(e);
                }
            }
        }

        self.state.consume(&buf[..filled]);
        Ok(filled)
    }

    /// Discards up to `n` bytes and returns how many were actually skipped.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut scratch = [0u8; SKIP_CHUNK];
        let mut skipped = 0u64;
        while skipped < n {
            let want = (n - skipped).min(SKIP_CHUNK as u64) as usize;
            let got = self.read_into(&mut scratch[..want])?;
            skipped += got as u64;
            if got < want {
                break;
            }
        }
        Ok(skipped)
    }

    /// Returns `true` once no more bytes can be read.
    pub fn at_end(&mut self) -> io::Result<bool> {
        Ok(self.peek()?.is_none())
    }

    /// Number of bytes consumed so far. A pending peek does not count.
    pub fn position(&self) -> u64 {
        self.state.position()
    }

    /// The last byte returned by a read, `None` before the first one.
    pub fn previous(&self) -> Option<u8> {
        self.state.previous()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Returns the wrapped source. A pending peeked byte is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

fn fetch_byte<R: Read>(inner: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match inner.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
