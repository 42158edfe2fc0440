use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::warn;

use crate::codec::{Frame, SlipDecoder};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Default cap on a single decoded frame: 16 KiB.
///
/// The SLIP codec itself is unbounded; this reader drops any frame that
/// grows past the cap and resynchronizes on the next delimiter.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024;

/// Reads complete SLIP frames from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete frames.
pub struct SlipReader<T> {
    inner: T,
    decoder: SlipDecoder,
    ready: VecDeque<Frame>,
    max_frame: usize,
    dropped: u64,
}

impl<T: Read> SlipReader<T> {
    /// Create a reader with the default frame cap.
    pub fn new(inner: T) -> Self {
        Self::with_max_frame(inner, DEFAULT_MAX_FRAME)
    }

    /// Create a reader with an explicit frame cap.
    pub fn with_max_frame(inner: T, max_frame: usize) -> Self {
        Self {
            inner,
            decoder: SlipDecoder::new(),
            ready: VecDeque::new(),
            max_frame,
            dropped: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.feed(&chunk[..read]);
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if let Some(frame) = self.decoder.feed(byte) {
                self.ready.push_back(frame);
            }
            if self.decoder.pending_len() > self.max_frame {
                warn!(
                    size = self.decoder.pending_len(),
                    max = self.max_frame,
                    "dropping oversized frame"
                );
                self.decoder.reset();
                self.dropped = self.dropped.saturating_add(1);
            }
        }
    }

    /// Frames dropped for exceeding the cap since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(b"hello", &mut wire);

        let mut reader = SlipReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = BytesMut::new();
        encode_frame(b"one", &mut wire);
        encode_frame(b"two", &mut wire);
        encode_frame(b"three", &mut wire);

        let mut reader = SlipReader::new(Cursor::new(wire.to_vec()));
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"three");
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_frame(b"slow", &mut wire);

        let reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = SlipReader::new(reader);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = SlipReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let wire = vec![crate::codec::END, b'p', b'a', b'r'];
        let mut reader = SlipReader::new(Cursor::new(wire));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn oversized_frame_dropped_then_resync() {
        let mut wire = BytesMut::new();
        encode_frame(&[0xAA; 64], &mut wire);
        encode_frame(b"ok", &mut wire);

        let mut reader = SlipReader::with_max_frame(Cursor::new(wire.to_vec()), 16);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"ok");
        assert_eq!(reader.dropped(), 1);
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(b"ok", &mut wire);

        let reader = InterruptedThenData {
            interrupted: false,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = SlipReader::new(reader);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
