use tracing::{debug, warn};

use crate::packet::{decode_payload, ApiId, RadioPacket, MAX_FRAME_DATA, START_BYTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    AwaitStart,
    Length1,
    Length2,
    Payload,
    Checksum,
}

/// Byte-at-a-time radio packet parser.
///
/// Driven by exactly one logical owner; not thread-safe by design. A bad
/// checksum, an out-of-range length, an unknown api id, or a payload too
/// short for its variant discards the packet and resets to `AwaitStart`;
/// bytes already consumed are never replayed.
#[derive(Debug)]
pub struct RadioParser {
    state: ParseState,
    expected: usize,
    buf: Vec<u8>,
    discarded: u64,
}

impl Default for RadioParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioParser {
    /// Create a parser awaiting a start byte.
    pub fn new() -> Self {
        Self {
            state: ParseState::AwaitStart,
            expected: 0,
            buf: Vec::with_capacity(MAX_FRAME_DATA),
            discarded: 0,
        }
    }

    /// Feed one byte; returns a verified packet when this byte completes one.
    pub fn feed(&mut self, byte: u8) -> Option<RadioPacket> {
        match self.state {
            ParseState::AwaitStart => {
                if byte == START_BYTE {
                    self.state = ParseState::Length1;
                }
                None
            }
            ParseState::Length1 => {
                self.expected = usize::from(byte) << 8;
                self.state = ParseState::Length2;
                None
            }
            ParseState::Length2 => {
                self.expected |= usize::from(byte);
                if self.expected == 0 || self.expected > MAX_FRAME_DATA {
                    self.discard("length out of range");
                } else {
                    self.buf.clear();
                    self.state = ParseState::Payload;
                }
                None
            }
            ParseState::Payload => {
                self.buf.push(byte);
                if self.buf.len() == self.expected {
                    self.state = ParseState::Checksum;
                }
                None
            }
            ParseState::Checksum => {
                self.state = ParseState::AwaitStart;
                let sum: u32 = self.buf.iter().map(|&b| u32::from(b)).sum();
                if (sum + u32::from(byte)) & 0xFF != 0xFF {
                    self.discard("checksum mismatch");
                    return None;
                }
                let Some(api_id) = ApiId::from_byte(self.buf[0]) else {
                    self.discard("unknown api id");
                    return None;
                };
                match decode_payload(api_id, &self.buf[1..]) {
                    Some(payload) => {
                        debug!(?api_id, len = self.buf.len(), "radio packet parsed");
                        Some(RadioPacket { payload })
                    }
                    None => {
                        self.discard("payload too short for variant");
                        None
                    }
                }
            }
        }
    }

    /// Feed a slice, appending completed packets to `out`.
    pub fn feed_slice(&mut self, bytes: &[u8], out: &mut Vec<RadioPacket>) {
        for &byte in bytes {
            if let Some(packet) = self.feed(byte) {
                out.push(packet);
            }
        }
    }

    /// Packets discarded for checksum/length/type failures since creation.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drop any in-progress packet and await the next start byte.
    pub fn reset(&mut self) {
        self.state = ParseState::AwaitStart;
        self.expected = 0;
        self.buf.clear();
    }

    fn discard(&mut self, reason: &'static str) {
        warn!(reason, "discarding radio packet");
        self.discarded = self.discarded.saturating_add(1);
        self.state = ParseState::AwaitStart;
        self.expected = 0;
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::packet::RadioPayload;

    fn encode(packet: &RadioPacket) -> Vec<u8> {
        let mut wire = BytesMut::new();
        packet.encode(&mut wire);
        wire.to_vec()
    }

    fn rx16_packet() -> RadioPacket {
        RadioPacket {
            payload: RadioPayload::Rx16 {
                source: 0x1234,
                rssi: 0x28,
                options: 0x00,
                data: vec![0xDE, 0xAD],
            },
        }
    }

    #[test]
    fn parse_roundtrip_rx16() {
        let packet = rx16_packet();
        let wire = encode(&packet);

        let mut parser = RadioParser::new();
        let mut out = Vec::new();
        parser.feed_slice(&wire, &mut out);

        assert_eq!(out, vec![packet]);
        assert_eq!(parser.discarded(), 0);
    }

    #[test]
    fn parse_roundtrip_every_variant() {
        let packets = vec![
            RadioPacket::tx16(1, 0xFFFE, 0x04, b"broadcast").unwrap(),
            RadioPacket::tx64(2, 0x0013_A200_4000_0001, 0x00, b"direct").unwrap(),
            RadioPacket::at_command(3, *b"ID", &[0x33, 0x32]).unwrap(),
            RadioPacket::at_command_queue(4, *b"CH", &[0x0E]).unwrap(),
            RadioPacket {
                payload: RadioPayload::Rx64 {
                    source: 42,
                    rssi: 0x40,
                    options: 0x02,
                    data: vec![9],
                },
            },
            rx16_packet(),
            RadioPacket {
                payload: RadioPayload::Io16 {
                    source: 7,
                    rssi: 0x33,
                    options: 0,
                    samples: 2,
                    channel_mask: 0x0E01,
                    data: vec![0, 1, 2, 3],
                },
            },
            RadioPacket {
                payload: RadioPayload::Io64 {
                    source: 99,
                    rssi: 0x21,
                    options: 0,
                    samples: 1,
                    channel_mask: 0x0200,
                    data: vec![1, 0xFF],
                },
            },
            RadioPacket {
                payload: RadioPayload::AtResponse {
                    frame_id: 5,
                    command: *b"MY",
                    status: 0,
                    value: vec![0x14, 0x11],
                },
            },
            RadioPacket {
                payload: RadioPayload::TxStatus {
                    frame_id: 6,
                    status: 0,
                },
            },
        ];

        let mut parser = RadioParser::new();
        let mut out = Vec::new();
        for packet in &packets {
            parser.feed_slice(&encode(packet), &mut out);
        }

        assert_eq!(out, packets);
        assert_eq!(parser.discarded(), 0);
    }

    #[test]
    fn checksum_bit_flips_all_rejected_then_recovers() {
        let packet = rx16_packet();
        let wire = encode(&packet);
        let checksum_at = wire.len() - 1;

        for bit in 0..8 {
            let mut corrupted = wire.clone();
            corrupted[checksum_at] ^= 1 << bit;

            let mut parser = RadioParser::new();
            let mut out = Vec::new();
            parser.feed_slice(&corrupted, &mut out);
            assert!(out.is_empty(), "bit {bit} accepted");
            assert_eq!(parser.discarded(), 1);

            // Parser is ready for the next valid packet.
            parser.feed_slice(&wire, &mut out);
            assert_eq!(out, vec![packet.clone()], "bit {bit} broke resync");
        }
    }

    #[test]
    fn zero_length_discarded() {
        let mut parser = RadioParser::new();
        let mut out = Vec::new();
        parser.feed_slice(&[START_BYTE, 0x00, 0x00], &mut out);
        assert!(out.is_empty());
        assert_eq!(parser.discarded(), 1);
    }

    #[test]
    fn oversized_length_discarded() {
        let mut parser = RadioParser::new();
        let mut out = Vec::new();
        parser.feed_slice(&[START_BYTE, 0x01, 0x00], &mut out);
        assert!(out.is_empty());
        assert_eq!(parser.discarded(), 1);

        let packet = rx16_packet();
        parser.feed_slice(&encode(&packet), &mut out);
        assert_eq!(out, vec![packet]);
    }

    #[test]
    fn unknown_api_id_discarded() {
        // length 1, api id 0x42, checksum 0xFF - 0x42
        let wire = [START_BYTE, 0x00, 0x01, 0x42, 0xFF - 0x42];
        let mut parser = RadioParser::new();
        let mut out = Vec::new();
        parser.feed_slice(&wire, &mut out);
        assert!(out.is_empty());
        assert_eq!(parser.discarded(), 1);
    }

    #[test]
    fn noise_before_start_byte_ignored() {
        let packet = rx16_packet();
        let mut wire = vec![0x00, 0x13, 0x99];
        wire.extend_from_slice(&encode(&packet));

        let mut parser = RadioParser::new();
        let mut out = Vec::new();
        parser.feed_slice(&wire, &mut out);
        assert_eq!(out, vec![packet]);
    }

    #[test]
    fn split_feed_assembles_one_packet() {
        let packet = rx16_packet();
        let wire = encode(&packet);

        for split in 1..wire.len() {
            let mut parser = RadioParser::new();
            let mut out = Vec::new();
            parser.feed_slice(&wire[..split], &mut out);
            parser.feed_slice(&wire[split..], &mut out);
            assert_eq!(out, vec![packet.clone()], "split at {split}");
        }
    }

    #[test]
    fn truncated_variant_payload_discarded() {
        // RX16 needs at least 4 payload bytes after the api id; give it 1.
        let frame_data = [0x81u8, 0x07];
        let mut wire = vec![START_BYTE, 0x00, 0x02];
        wire.extend_from_slice(&frame_data);
        wire.push(crate::packet::checksum(&frame_data));

        let mut parser = RadioParser::new();
        let mut out = Vec::new();
        parser.feed_slice(&wire, &mut out);
        assert!(out.is_empty());
        assert_eq!(parser.discarded(), 1);
    }
}
