//! A stock-zlib-backed stream reader with a one-byte look-ahead.
//!
//! `StructParser` schemas occasionally need to peek one byte past the data they've just
//! consumed (to decide whether a following block is present) without committing to consuming
//! it. Rather than model full seekability over a decompressing stream, this wraps a
//! [`flate2`] decoder with a single-byte pushback buffer.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::Error;

/// A forward-only reader over a zlib-compressed byte stream, with a one-byte rewind.
pub struct ZlibStream<R: Read> {
    inner: ZlibDecoder<R>,
    position: usize,
    pushback: Option<u8>,
}

impl<R: Read> ZlibStream<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self { inner: ZlibDecoder::new(reader), position: 0, pushback: None }
    }

    /// Reads exactly `n` decompressed bytes.
    ///
    /// # Errors
    /// [`Error::TruncatedInput`] if the stream ends before `n` bytes are available; [`Error::Io`]
    /// on an underlying I/O failure.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(n);
        if n == 0 {
            return Ok(out);
        }

        if let Some(byte) = self.pushback.take() {
            out.push(byte);
        }

        if out.len() < n {
            let mut buf = vec![0u8; n - out.len()];
            self.inner.read_exact(&mut buf).map_err(|err| {
                if err.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::TruncatedInput
                } else {
                    Error::from(err)
                }
            })?;
            out.extend_from_slice(&buf);
        }

        self.position += out.len();
        Ok(out)
    }

    /// Reads one byte and immediately pushes it back, without advancing [`Self::tell`].
    ///
    /// # Errors
    /// Same as [`Self::read`].
    pub fn peek(&mut self) -> Result<u8, Error> {
        if let Some(byte) = self.pushback {
            return Ok(byte);
        }
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::TruncatedInput
            } else {
                Error::from(err)
            }
        })?;
        self.pushback = Some(buf[0]);
        Ok(buf[0])
    }

    /// Number of decompressed bytes handed out via [`Self::read`] so far (the pending [`peek`]
    /// byte, if any, is not counted until it is actually consumed by a read).
    ///
    /// [`peek`]: Self::peek
    #[must_use]
    pub fn tell(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::*;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn read_returns_requested_bytes_and_advances_tell() {
        let compressed = zlib_compress(b"hello world");
        let mut stream = ZlibStream::new(compressed.as_slice());

        assert_eq!(stream.read(5).unwrap(), b"hello");
        assert_eq!(stream.tell(), 5);
        assert_eq!(stream.read(6).unwrap(), b" world");
        assert_eq!(stream.tell(), 11);
    }

    #[test]
    fn peek_does_not_advance_and_is_consumed_by_next_read() {
        let compressed = zlib_compress(b"ab");
        let mut stream = ZlibStream::new(compressed.as_slice());

        assert_eq!(stream.peek().unwrap(), b'a');
        assert_eq!(stream.tell(), 0);
        assert_eq!(stream.read(2).unwrap(), b"ab");
        assert_eq!(stream.tell(), 2);
    }

    #[test]
    fn read_past_end_is_truncated_input() {
        let compressed = zlib_compress(b"x");
        let mut stream = ZlibStream::new(compressed.as_slice());
        let err = stream.read(2).unwrap_err();
        assert!(matches!(err, Error::TruncatedInput));
    }
}
