use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;

use crate::error::{RadioError, Result};
use crate::packet::RadioPacket;
use crate::parser::RadioParser;

const READ_CHUNK_SIZE: usize = 256;

/// One packet radio link over a byte transport.
///
/// Owns the parser state; one link has exactly one reader.
pub struct RadioLink<T> {
    io: T,
    parser: RadioParser,
    ready: VecDeque<RadioPacket>,
    scratch: BytesMut,
}

impl<T: Read + Write> RadioLink<T> {
    /// Wrap a byte transport.
    pub fn new(io: T) -> Self {
        Self {
            io,
            parser: RadioParser::new(),
            ready: VecDeque::new(),
            scratch: BytesMut::new(),
        }
    }

    /// Read the next verified packet (blocking).
    ///
    /// Returns `Err(RadioError::ConnectionClosed)` when the transport ends.
    pub fn read_packet(&mut self) -> Result<RadioPacket> {
        loop {
            if let Some(packet) = self.ready.pop_front() {
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.io.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RadioError::Io(err)),
            };

            if read == 0 {
                return Err(RadioError::ConnectionClosed);
            }

            let mut out = Vec::new();
            self.parser.feed_slice(&chunk[..read], &mut out);
            self.ready.extend(out);
        }
    }

    /// Encode and send one packet (blocking).
    pub fn send_packet(&mut self, packet: &RadioPacket) -> Result<()> {
        self.scratch.clear();
        packet.encode(&mut self.scratch);

        let mut offset = 0usize;
        while offset < self.scratch.len() {
            match self.io.write(&self.scratch[offset..]) {
                Ok(0) => return Err(RadioError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RadioError::Io(err)),
            }
        }

        loop {
            match self.io.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RadioError::Io(err)),
            }
        }
    }

    /// Packets discarded by the parser since creation.
    pub fn discarded(&self) -> u64 {
        self.parser.discarded()
    }

    /// Consume the link and return the byte transport.
    pub fn into_inner(self) -> T {
        self.io
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::packet::RadioPayload;

    struct ReadOnly(Cursor<Vec<u8>>);

    impl Read for ReadOnly {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl Write for ReadOnly {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_then_read_back() {
        let tx = RadioPacket::tx16(1, 0x0001, 0, b"ping").unwrap();
        let mut link = RadioLink::new(Cursor::new(Vec::new()));
        link.send_packet(&tx).unwrap();

        let wire = link.into_inner().into_inner();
        let mut link = RadioLink::new(ReadOnly(Cursor::new(wire)));
        let packet = link.read_packet().unwrap();
        assert_eq!(packet, tx);
    }

    #[test]
    fn read_drains_multiple_packets_per_chunk() {
        let a = RadioPacket {
            payload: RadioPayload::TxStatus {
                frame_id: 1,
                status: 0,
            },
        };
        let b = RadioPacket {
            payload: RadioPayload::TxStatus {
                frame_id: 2,
                status: 1,
            },
        };
        let mut wire = BytesMut::new();
        a.encode(&mut wire);
        b.encode(&mut wire);

        let mut link = RadioLink::new(ReadOnly(Cursor::new(wire.to_vec())));
        assert_eq!(link.read_packet().unwrap(), a);
        assert_eq!(link.read_packet().unwrap(), b);
    }

    #[test]
    fn eof_is_connection_closed() {
        let mut link = RadioLink::new(ReadOnly(Cursor::new(Vec::new())));
        let err = link.read_packet().unwrap_err();
        assert!(matches!(err, RadioError::ConnectionClosed));
    }
}
