use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::reader::{Lookahead, SKIP_CHUNK};

/// The suspend-until-available counterpart of [`PeekReader`](super::PeekReader).
///
/// Every method follows the same contract as the blocking reader. A call that
/// needs bytes the source has not produced yet suspends the task until they
/// arrive or the source reaches end of input; a read served by the pending
/// peeked byte completes without touching the source.
///
/// Dropping a pending future is allowed, but the reader should be discarded
/// afterwards since its position may no longer describe the stream.
///
/// # Examples
///
/// ```
/// use bitcheck::bencode::AsyncPeekReader;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> std::io::Result<()> {
/// let mut reader = AsyncPeekReader::new(&b"4:spam"[..]);
/// assert_eq!(reader.peek().await?, Some(b'4'));
/// assert_eq!(reader.skip(2).await?, 2);
/// assert_eq!(reader.previous(), Some(b':'));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AsyncPeekReader<R> {
    inner: R,
    state: Lookahead,
}

impl<R: AsyncRead + Unpin> AsyncPeekReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            state: Lookahead::default(),
        }
    }

    pub async fn peek(&mut self) -> io::Result<Option<u8>> {
        if let Some(peeked) = self.state.peeked() {
            return Ok(peeked);
        }
        let byte = fetch_byte(&mut self.inner).await?;
        self.state.set_peeked(byte);
        Ok(byte)
    }

    pub async fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.state.take() {
            Some(pending) => pending,
            None => fetch_byte(&mut self.inner).await?,
        };
        match byte {
            Some(b) => self.state.consume(&[b]),
            None => self.state.mark_end(),
        }
        Ok(byte)
    }

    pub async fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
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
            match self.inner.read(&mut buf[filled..]).await {
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

    pub async fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut scratch = [0u8; SKIP_CHUNK];
        let mut skipped = 0u64;
        while skipped < n {
            let want = (n - skipped).min(SKIP_CHUNK as u64) as usize;
            let got = self.read_into(&mut scratch[..want]).await?;
            skipped += got as u64;
            if got < want {
                break;
            }
        }
        Ok(skipped)
    }

    pub async fn at_end(&mut self) -> io::Result<bool> {
        Ok(self.peek().await?.is_none())
    }

    pub fn position(&self) -> u64 {
        self.state.position()
    }

    pub fn previous(&self) -> Option<u8> {
        self.state.previous()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

async fn fetch_byte<R: AsyncRead + Unpin>(inner: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match inner.read(&mut byte).await {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
