//! Bounded-wait duplex byte stream.
//!
//! [`TimedStream`] wraps a raw reader/writer pair that is already bound to
//! an open connection and gives the protocol engine its two contracts:
//!
//! - a single logical read never blocks past the configured timeout
//! - transport closure is observed promptly as [`GnssError::Closed`]
//!
//! Internally the stream keeps one refill chunk in a `BytesMut` so that
//! byte-at-a-time decoding does not turn into byte-at-a-time syscalls.
//! There is no frame-level buffering; framing belongs to the decoders.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{GnssError, Result};

/// Default per-read timeout, matching a typical wireless serial link.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2500);

/// Refill chunk size for the internal read buffer.
const READ_CHUNK: usize = 512;

/// Duplex byte stream with a bounded wait on every read.
pub struct TimedStream<R, W> {
    reader: R,
    writer: W,
    read_timeout: Duration,
    buf: BytesMut,
}

impl<R, W> TimedStream<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap a reader/writer pair with the default read timeout.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_timeout(reader, writer, DEFAULT_READ_TIMEOUT)
    }

    /// Wrap a reader/writer pair with a custom read timeout.
    pub fn with_timeout(reader: R, writer: W, read_timeout: Duration) -> Self {
        Self {
            reader,
            writer,
            read_timeout,
            buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// The configured per-read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Read the next byte, consuming it.
    ///
    /// Fails with [`GnssError::Timeout`] if nothing arrives within the
    /// bound, or [`GnssError::Closed`] if the transport has terminated.
    pub async fn read_byte(&mut self) -> Result<u8> {
        if self.buf.is_empty() {
            self.fill().await?;
        }
        Ok(self.buf.get_u8())
    }

    /// Look at the next byte without consuming it.
    ///
    /// Same wait semantics as [`read_byte`](Self::read_byte).
    pub async fn peek_byte(&mut self) -> Result<u8> {
        if self.buf.is_empty() {
            self.fill().await?;
        }
        Ok(self.buf[0])
    }

    /// Read exactly `out.len()` bytes.
    ///
    /// Each underlying refill is individually bounded by the read timeout.
    pub async fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            if self.buf.is_empty() {
                self.fill().await?;
            }
            let n = self.buf.len().min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&self.buf[..n]);
            self.buf.advance(n);
            filled += n;
        }
        Ok(())
    }

    /// Write all bytes and flush.
    ///
    /// Fails with [`GnssError::Closed`] if the transport has terminated.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).await.map_err(map_io)?;
        self.writer.flush().await.map_err(map_io)?;
        Ok(())
    }

    /// Refill the internal buffer with one bounded read.
    async fn fill(&mut self) -> Result<()> {
        self.buf.reserve(READ_CHUNK);
        let n = match timeout(self.read_timeout, self.reader.read_buf(&mut self.buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(map_io(e)),
            Err(_) => return Err(GnssError::Timeout),
        };
        if n == 0 {
            return Err(GnssError::Closed);
        }
        Ok(())
    }
}

/// Map transport-termination I/O errors to `Closed`, keep the rest as `Io`.
fn map_io(e: std::io::Error) -> GnssError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::UnexpectedEof => GnssError::Closed,
        _ => GnssError::Io(e),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split, AsyncWriteExt};

    fn timed(
        end: tokio::io::DuplexStream,
        ms: u64,
    ) -> TimedStream<tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>>
    {
        let (r, w) = split(end);
        TimedStream::with_timeout(r, w, Duration::from_millis(ms))
    }

    #[tokio::test]
    async fn test_read_and_peek() {
        let (local, mut remote) = duplex(64);
        let mut stream = timed(local, 100);

        remote.write_all(&[0x24, 0x47, 0x50]).await.unwrap();

        assert_eq!(stream.peek_byte().await.unwrap(), 0x24);
        assert_eq!(stream.peek_byte().await.unwrap(), 0x24); // peek does not consume
        assert_eq!(stream.read_byte().await.unwrap(), 0x24);
        assert_eq!(stream.read_byte().await.unwrap(), 0x47);
        assert_eq!(stream.read_byte().await.unwrap(), 0x50);
    }

    #[tokio::test]
    async fn test_read_exact_across_refills() {
        let (local, mut remote) = duplex(64);
        let mut stream = timed(local, 100);

        remote.write_all(b"ab").await.unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.write_all(b"cd").await.unwrap();
        });

        let mut out = [0u8; 4];
        stream.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"abcd");
    }

    #[tokio::test]
    async fn test_timeout_on_silent_peer() {
        let (local, _remote) = duplex(64);
        let mut stream = timed(local, 20);

        let err = stream.read_byte().await.unwrap_err();
        assert!(matches!(err, GnssError::Timeout));
    }

    #[tokio::test]
    async fn test_closed_on_eof() {
        let (local, remote) = duplex(64);
        let mut stream = timed(local, 100);

        drop(remote);

        let err = stream.read_byte().await.unwrap_err();
        assert!(matches!(err, GnssError::Closed));
    }

    #[tokio::test]
    async fn test_buffered_bytes_survive_eof() {
        let (local, mut remote) = duplex(64);
        let mut stream = timed(local, 100);

        remote.write_all(&[0xB5]).await.unwrap();
        remote.shutdown().await.unwrap();
        drop(remote);

        assert_eq!(stream.read_byte().await.unwrap(), 0xB5);
        assert!(matches!(
            stream.read_byte().await.unwrap_err(),
            GnssError::Closed
        ));
    }

    #[tokio::test]
    async fn test_write_roundtrip() {
        let (local, remote) = duplex(64);
        let mut stream = timed(local, 100);
        let (mut rr, _rw) = split(remote);

        stream.write(b"$GPGLL").await.unwrap();

        let mut out = [0u8; 6];
        use tokio::io::AsyncReadExt;
        rr.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"$GPGLL");
    }

    #[tokio::test]
    async fn test_write_after_close() {
        let (local, remote) = duplex(64);
        let mut stream = timed(local, 100);
        drop(remote);

        let err = stream.write(b"data").await.unwrap_err();
        assert!(matches!(err, GnssError::Closed | GnssError::Io(_)));
    }
}
