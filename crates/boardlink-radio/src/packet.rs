use bytes::{BufMut, BytesMut};

use crate::error::{RadioError, Result};

/// Sentinel opening every radio packet.
pub const START_BYTE: u8 = 0x7E;

/// Maximum api id + payload bytes in one packet.
pub const MAX_FRAME_DATA: usize = 100;

/// API id selecting a packet variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApiId {
    /// Outgoing data packet, 64-bit destination address.
    Tx64 = 0x00,
    /// Outgoing data packet, 16-bit destination address.
    Tx16 = 0x01,
    /// AT command applied immediately.
    AtCommand = 0x08,
    /// AT command queued until applied.
    AtCommandQueue = 0x09,
    /// Incoming data packet, 64-bit source address.
    Rx64 = 0x80,
    /// Incoming data packet, 16-bit source address.
    Rx16 = 0x81,
    /// Incoming sampled IO data, 64-bit source address.
    Io64 = 0x82,
    /// Incoming sampled IO data, 16-bit source address.
    Io16 = 0x83,
    /// Response to an AT command.
    AtResponse = 0x88,
    /// Delivery status for an earlier transmit request.
    TxStatus = 0x89,
}

impl ApiId {
    /// Map a wire byte to an api id.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(ApiId::Tx64),
            0x01 => Some(ApiId::Tx16),
            0x08 => Some(ApiId::AtCommand),
            0x09 => Some(ApiId::AtCommandQueue),
            0x80 => Some(ApiId::Rx64),
            0x81 => Some(ApiId::Rx16),
            0x82 => Some(ApiId::Io64),
            0x83 => Some(ApiId::Io16),
            0x88 => Some(ApiId::AtResponse),
            0x89 => Some(ApiId::TxStatus),
            _ => None,
        }
    }
}

/// Packet contents, tagged by api id.
///
/// Selection is always by explicit tag; a packet is only constructed once
/// its length and checksum have been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioPayload {
    Tx64 {
        frame_id: u8,
        destination: u64,
        options: u8,
        data: Vec<u8>,
    },
    Tx16 {
        frame_id: u8,
        destination: u16,
        options: u8,
        data: Vec<u8>,
    },
    AtCommand {
        frame_id: u8,
        command: [u8; 2],
        parameters: Vec<u8>,
    },
    AtCommandQueue {
        frame_id: u8,
        command: [u8; 2],
        parameters: Vec<u8>,
    },
    Rx64 {
        source: u64,
        rssi: u8,
        options: u8,
        data: Vec<u8>,
    },
    Rx16 {
        source: u16,
        rssi: u8,
        options: u8,
        data: Vec<u8>,
    },
    Io64 {
        source: u64,
        rssi: u8,
        options: u8,
        samples: u8,
        channel_mask: u16,
        data: Vec<u8>,
    },
    Io16 {
        source: u16,
        rssi: u8,
        options: u8,
        samples: u8,
        channel_mask: u16,
        data: Vec<u8>,
    },
    AtResponse {
        frame_id: u8,
        command: [u8; 2],
        status: u8,
        value: Vec<u8>,
    },
    TxStatus {
        frame_id: u8,
        status: u8,
    },
}

/// A complete, checksum-verified radio packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioPacket {
    pub payload: RadioPayload,
}

/// Borrowed fields of an incoming 16-bit-address data packet.
#[derive(Debug, PartialEq, Eq)]
pub struct Rx16View<'a> {
    pub source: u16,
    pub rssi: u8,
    pub options: u8,
    pub data: &'a [u8],
}

/// Borrowed fields of an incoming 64-bit-address data packet.
#[derive(Debug, PartialEq, Eq)]
pub struct Rx64View<'a> {
    pub source: u64,
    pub rssi: u8,
    pub options: u8,
    pub data: &'a [u8],
}

/// Borrowed fields of an incoming IO sample packet.
#[derive(Debug, PartialEq, Eq)]
pub struct IoView<'a> {
    pub source: u64,
    pub rssi: u8,
    pub options: u8,
    pub samples: u8,
    pub channel_mask: u16,
    pub data: &'a [u8],
}

impl IoView<'_> {
    /// Whether any digital channels (mask bits 0-8) were sampled.
    pub fn has_digital(&self) -> bool {
        self.channel_mask & 0x01FF != 0
    }

    /// Bit mask of sampled analog channels (0-5).
    pub fn analog_mask(&self) -> u8 {
        ((self.channel_mask >> 9) & 0x3F) as u8
    }
}

/// Borrowed fields of an AT command response.
#[derive(Debug, PartialEq, Eq)]
pub struct AtResponseView<'a> {
    pub frame_id: u8,
    pub command: [u8; 2],
    pub status: u8,
    pub value: &'a [u8],
}

impl RadioPacket {
    /// The api id tag of this packet.
    pub fn api_id(&self) -> ApiId {
        match &self.payload {
            RadioPayload::Tx64 { .. } => ApiId::Tx64,
            RadioPayload::Tx16 { .. } => ApiId::Tx16,
            RadioPayload::AtCommand { .. } => ApiId::AtCommand,
            RadioPayload::AtCommandQueue { .. } => ApiId::AtCommandQueue,
            RadioPayload::Rx64 { .. } => ApiId::Rx64,
            RadioPayload::Rx16 { .. } => ApiId::Rx16,
            RadioPayload::Io64 { .. } => ApiId::Io64,
            RadioPayload::Io16 { .. } => ApiId::Io16,
            RadioPayload::AtResponse { .. } => ApiId::AtResponse,
            RadioPayload::TxStatus { .. } => ApiId::TxStatus,
        }
    }

    /// Build an outgoing 16-bit-address data packet.
    pub fn tx16(frame_id: u8, destination: u16, options: u8, data: &[u8]) -> Result<Self> {
        // api id + frame id + address + options + data
        check_frame_data(5 + data.len())?;
        Ok(Self {
            payload: RadioPayload::Tx16 {
                frame_id,
                destination,
                options,
                data: data.to_vec(),
            },
        })
    }

    /// Build an outgoing 64-bit-address data packet.
    pub fn tx64(frame_id: u8, destination: u64, options: u8, data: &[u8]) -> Result<Self> {
        check_frame_data(11 + data.len())?;
        Ok(Self {
            payload: RadioPayload::Tx64 {
                frame_id,
                destination,
                options,
                data: data.to_vec(),
            },
        })
    }

    /// Build an AT command packet, e.g. `at_command(1, *b"MY", &[])`.
    pub fn at_command(frame_id: u8, command: [u8; 2], parameters: &[u8]) -> Result<Self> {
        check_frame_data(4 + parameters.len())?;
        Ok(Self {
            payload: RadioPayload::AtCommand {
                frame_id,
                command,
                parameters: parameters.to_vec(),
            },
        })
    }

    /// Build a queued AT command packet.
    pub fn at_command_queue(frame_id: u8, command: [u8; 2], parameters: &[u8]) -> Result<Self> {
        check_frame_data(4 + parameters.len())?;
        Ok(Self {
            payload: RadioPayload::AtCommandQueue {
                frame_id,
                command,
                parameters: parameters.to_vec(),
            },
        })
    }

    /// Typed read of an RX16 packet.
    pub fn rx16(&self) -> Result<Rx16View<'_>> {
        match &self.payload {
            RadioPayload::Rx16 {
                source,
                rssi,
                options,
                data,
            } => Ok(Rx16View {
                source: *source,
                rssi: *rssi,
                options: *options,
                data,
            }),
            _ => Err(self.mismatch(ApiId::Rx16)),
        }
    }

    /// Typed read of an RX64 packet.
    pub fn rx64(&self) -> Result<Rx64View<'_>> {
        match &self.payload {
            RadioPayload::Rx64 {
                source,
                rssi,
                options,
                data,
            } => Ok(Rx64View {
                source: *source,
                rssi: *rssi,
                options: *options,
                data,
            }),
            _ => Err(self.mismatch(ApiId::Rx64)),
        }
    }

    /// Typed read of an IO16 packet (source widened to u64).
    pub fn io16(&self) -> Result<IoView<'_>> {
        match &self.payload {
            RadioPayload::Io16 {
                source,
                rssi,
                options,
                samples,
                channel_mask,
                data,
            } => Ok(IoView {
                source: u64::from(*source),
                rssi: *rssi,
                options: *options,
                samples: *samples,
                channel_mask: *channel_mask,
                data,
            }),
            _ => Err(self.mismatch(ApiId::Io16)),
        }
    }

    /// Typed read of an IO64 packet.
    pub fn io64(&self) -> Result<IoView<'_>> {
        match &self.payload {
            RadioPayload::Io64 {
                source,
                rssi,
                options,
                samples,
                channel_mask,
                data,
            } => Ok(IoView {
                source: *source,
                rssi: *rssi,
                options: *options,
                samples: *samples,
                channel_mask: *channel_mask,
                data,
            }),
            _ => Err(self.mismatch(ApiId::Io64)),
        }
    }

    /// Typed read of an AT command response.
    pub fn at_response(&self) -> Result<AtResponseView<'_>> {
        match &self.payload {
            RadioPayload::AtResponse {
                frame_id,
                command,
                status,
                value,
            } => Ok(AtResponseView {
                frame_id: *frame_id,
                command: *command,
                status: *status,
                value,
            }),
            _ => Err(self.mismatch(ApiId::AtResponse)),
        }
    }

    /// Typed read of a transmit status packet: `(frame_id, status)`.
    pub fn tx_status(&self) -> Result<(u8, u8)> {
        match &self.payload {
            RadioPayload::TxStatus { frame_id, status } => Ok((*frame_id, *status)),
            _ => Err(self.mismatch(ApiId::TxStatus)),
        }
    }

    fn mismatch(&self, expected: ApiId) -> RadioError {
        RadioError::TypeMismatch {
            expected,
            actual: self.api_id(),
        }
    }

    /// Encode to the wire format:
    /// `0x7E len_hi len_lo api_id payload checksum`.
    pub fn encode(&self, dst: &mut BytesMut) {
        let body = self.frame_data();
        dst.reserve(body.len() + 4);
        dst.put_u8(START_BYTE);
        dst.put_u16(body.len() as u16);
        dst.put_slice(&body);
        dst.put_u8(checksum(&body));
    }

    /// Api id byte followed by the variant's payload bytes.
    fn frame_data(&self) -> Vec<u8> {
        let mut body = vec![self.api_id() as u8];
        match &self.payload {
            RadioPayload::Tx64 {
                frame_id,
                destination,
                options,
                data,
            } => {
                body.push(*frame_id);
                body.extend_from_slice(&destination.to_be_bytes());
                body.push(*options);
                body.extend_from_slice(data);
            }
            RadioPayload::Tx16 {
                frame_id,
                destination,
                options,
                data,
            } => {
                body.push(*frame_id);
                body.extend_from_slice(&destination.to_be_bytes());
                body.push(*options);
                body.extend_from_slice(data);
            }
            RadioPayload::AtCommand {
                frame_id,
                command,
                parameters,
            }
            | RadioPayload::AtCommandQueue {
                frame_id,
                command,
                parameters,
            } => {
                body.push(*frame_id);
                body.extend_from_slice(command);
                body.extend_from_slice(parameters);
            }
            RadioPayload::Rx64 {
                source,
                rssi,
                options,
                data,
            } => {
                body.extend_from_slice(&source.to_be_bytes());
                body.push(*rssi);
                body.push(*options);
                body.extend_from_slice(data);
            }
            RadioPayload::Rx16 {
                source,
                rssi,
                options,
                data,
            } => {
                body.extend_from_slice(&source.to_be_bytes());
                body.push(*rssi);
                body.push(*options);
                body.extend_from_slice(data);
            }
            RadioPayload::Io64 {
                source,
                rssi,
                options,
                samples,
                channel_mask,
                data,
            } => {
                body.extend_from_slice(&source.to_be_bytes());
                body.push(*rssi);
                body.push(*options);
                body.push(*samples);
                body.extend_from_slice(&channel_mask.to_be_bytes());
                body.extend_from_slice(data);
            }
            RadioPayload::Io16 {
                source,
                rssi,
                options,
                samples,
                channel_mask,
                data,
            } => {
                body.extend_from_slice(&source.to_be_bytes());
                body.push(*rssi);
                body.push(*options);
                body.push(*samples);
                body.extend_from_slice(&channel_mask.to_be_bytes());
                body.extend_from_slice(data);
            }
            RadioPayload::AtResponse {
                frame_id,
                command,
                status,
                value,
            } => {
                body.push(*frame_id);
                body.extend_from_slice(command);
                body.push(*status);
                body.extend_from_slice(value);
            }
            RadioPayload::TxStatus { frame_id, status } => {
                body.push(*frame_id);
                body.push(*status);
            }
        }
        body
    }
}

/// `0xFF - (sum of api id and payload bytes mod 256)`.
pub fn checksum(frame_data: &[u8]) -> u8 {
    let sum: u32 = frame_data.iter().map(|&b| u32::from(b)).sum();
    0xFF - (sum & 0xFF) as u8
}

fn check_frame_data(len: usize) -> Result<()> {
    if len > MAX_FRAME_DATA {
        return Err(RadioError::PayloadTooLarge {
            size: len,
            max: MAX_FRAME_DATA,
        });
    }
    Ok(())
}

/// Decode verified frame data (api id byte stripped) into a payload.
///
/// Returns `None` when the payload is shorter than the variant's fixed
/// header; the parser treats that as a length failure and discards.
pub(crate) fn decode_payload(api_id: ApiId, bytes: &[u8]) -> Option<RadioPayload> {
    match api_id {
        ApiId::Tx64 => {
            if bytes.len() < 10 {
                return None;
            }
            Some(RadioPayload::Tx64 {
                frame_id: bytes[0],
                destination: u64::from_be_bytes(bytes[1..9].try_into().ok()?),
                options: bytes[9],
                data: bytes[10..].to_vec(),
            })
        }
        ApiId::Tx16 => {
            if bytes.len() < 4 {
                return None;
            }
            Some(RadioPayload::Tx16 {
                frame_id: bytes[0],
                destination: u16::from_be_bytes([bytes[1], bytes[2]]),
                options: bytes[3],
                data: bytes[4..].to_vec(),
            })
        }
        ApiId::AtCommand | ApiId::AtCommandQueue => {
            if bytes.len() < 3 {
                return None;
            }
            let frame_id = bytes[0];
            let command = [bytes[1], bytes[2]];
            let parameters = bytes[3..].to_vec();
            Some(if api_id == ApiId::AtCommand {
                RadioPayload::AtCommand {
                    frame_id,
                    command,
                    parameters,
                }
            } else {
                RadioPayload::AtCommandQueue {
                    frame_id,
                    command,
                    parameters,
                }
            })
        }
        ApiId::Rx64 => {
            if bytes.len() < 10 {
                return None;
            }
            Some(RadioPayload::Rx64 {
                source: u64::from_be_bytes(bytes[0..8].try_into().ok()?),
                rssi: bytes[8],
                options: bytes[9],
                data: bytes[10..].to_vec(),
            })
        }
        ApiId::Rx16 => {
            if bytes.len() < 4 {
                return None;
            }
            Some(RadioPayload::Rx16 {
                source: u16::from_be_bytes([bytes[0], bytes[1]]),
                rssi: bytes[2],
                options: bytes[3],
                data: bytes[4..].to_vec(),
            })
        }
        ApiId::Io64 => {
            if bytes.len() < 13 {
                return None;
            }
            Some(RadioPayload::Io64 {
                source: u64::from_be_bytes(bytes[0..8].try_into().ok()?),
                rssi: bytes[8],
                options: bytes[9],
                samples: bytes[10],
                channel_mask: u16::from_be_bytes([bytes[11], bytes[12]]),
                data: bytes[13..].to_vec(),
            })
        }
        ApiId::Io16 => {
            if bytes.len() < 7 {
                return None;
            }
            Some(RadioPayload::Io16 {
                source: u16::from_be_bytes([bytes[0], bytes[1]]),
                rssi: bytes[2],
                options: bytes[3],
                samples: bytes[4],
                channel_mask: u16::from_be_bytes([bytes[5], bytes[6]]),
                data: bytes[7..].to_vec(),
            })
        }
        ApiId::AtResponse => {
            if bytes.len() < 4 {
                return None;
            }
            Some(RadioPayload::AtResponse {
                frame_id: bytes[0],
                command: [bytes[1], bytes[2]],
                status: bytes[3],
                value: bytes[4..].to_vec(),
            })
        }
        ApiId::TxStatus => {
            if bytes.len() < 2 {
                return None;
            }
            Some(RadioPayload::TxStatus {
                frame_id: bytes[0],
                status: bytes[1],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx16_wire_layout() {
        let packet = RadioPacket::tx16(0x52, 0x1234, 0x01, b"hi").unwrap();
        let mut wire = BytesMut::new();
        packet.encode(&mut wire);

        assert_eq!(
            wire.as_ref(),
            &[
                START_BYTE,
                0x00,
                0x07, // api id + frame id + addr(2) + options + data(2)
                0x01, // TX16
                0x52,
                0x12,
                0x34,
                0x01,
                b'h',
                b'i',
                checksum(&[0x01, 0x52, 0x12, 0x34, 0x01, b'h', b'i']),
            ]
        );
    }

    #[test]
    fn checksum_matches_definition() {
        // 0xFF minus the low byte of the sum.
        assert_eq!(checksum(&[0x01, 0x02, 0x03]), 0xFF - 0x06);
        assert_eq!(checksum(&[0xFF, 0xFF]), 0xFF - 0xFE);
    }

    #[test]
    fn typed_read_succeeds_on_matching_variant() {
        let packet = RadioPacket {
            payload: RadioPayload::Rx16 {
                source: 0x0042,
                rssi: 0x28,
                options: 0x00,
                data: vec![1, 2, 3],
            },
        };
        let view = packet.rx16().unwrap();
        assert_eq!(view.source, 0x0042);
        assert_eq!(view.rssi, 0x28);
        assert_eq!(view.data, &[1, 2, 3]);
    }

    #[test]
    fn typed_read_fails_on_other_variant() {
        let packet = RadioPacket::tx16(1, 2, 0, b"x").unwrap();
        let err = packet.rx16().unwrap_err();
        assert!(matches!(
            err,
            RadioError::TypeMismatch {
                expected: ApiId::Rx16,
                actual: ApiId::Tx16,
            }
        ));
    }

    #[test]
    fn oversized_data_rejected() {
        let data = vec![0u8; MAX_FRAME_DATA];
        let err = RadioPacket::tx16(1, 2, 0, &data).unwrap_err();
        assert!(matches!(err, RadioError::PayloadTooLarge { .. }));
    }

    #[test]
    fn io_view_channel_helpers() {
        let view = IoView {
            source: 7,
            rssi: 0x30,
            options: 0,
            samples: 1,
            // digital channel 0 + analog channels 0 and 2
            channel_mask: 0x0001 | (1 << 9) | (1 << 11),
            data: &[],
        };
        assert!(view.has_digital());
        assert_eq!(view.analog_mask(), 0b101);
    }

    #[test]
    fn at_command_builder_roundtrips_through_decode() {
        let packet = RadioPacket::at_command(3, *b"MY", &[0x14, 0x11]).unwrap();
        let decoded = decode_payload(ApiId::AtCommand, &[3, b'M', b'Y', 0x14, 0x11]).unwrap();
        assert_eq!(packet.payload, decoded);
    }
}
