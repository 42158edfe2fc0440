use bytes::{BufMut, BytesMut};

use crate::error::{DecodeError, EncodeError, Result};
use crate::message::{is_valid_address, OscArg, OscMessage};

/// Marker prefixing a bundle of messages.
pub const BUNDLE_MARKER: &[u8] = b"#bundle";

/// "Immediately" time tag carried by every outgoing bundle.
const TIMETAG_IMMEDIATE: u64 = 1;

/// Encode one message into the wire format.
///
/// Address and type-tag string are NUL-terminated and padded to 4-byte
/// boundaries; each argument follows in tag order, big-endian, itself
/// padded to 4 bytes.
pub fn encode_message(msg: &OscMessage, dst: &mut BytesMut) -> std::result::Result<(), EncodeError> {
    if !is_valid_address(&msg.address) {
        return Err(EncodeError::InvalidAddress(msg.address.clone()));
    }

    put_padded_str(&msg.address, dst);

    let mut tags = String::with_capacity(msg.args.len() + 1);
    tags.push(',');
    for arg in &msg.args {
        tags.push(arg.tag());
    }
    put_padded_str(&tags, dst);

    for arg in &msg.args {
        match arg {
            OscArg::Int(v) => dst.put_i32(*v),
            OscArg::Float(v) => dst.put_f32(*v),
            OscArg::Str(v) => put_padded_str(v, dst),
            OscArg::Blob(v) => {
                dst.put_i32(v.len() as i32);
                dst.put_slice(v);
                let pad = (4 - v.len() % 4) % 4;
                dst.put_bytes(0, pad);
            }
        }
    }
    Ok(())
}

/// Encode a bundle: the `#bundle` marker, an immediate time tag, then each
/// message prefixed with its encoded size.
pub fn encode_bundle(
    msgs: &[OscMessage],
    dst: &mut BytesMut,
) -> std::result::Result<(), EncodeError> {
    put_padded_str("#bundle", dst);
    dst.put_u64(TIMETAG_IMMEDIATE);
    for msg in msgs {
        let mut element = BytesMut::new();
        encode_message(msg, &mut element)?;
        dst.put_i32(element.len() as i32);
        dst.put_slice(&element);
    }
    Ok(())
}

/// Decode a packet into its messages.
///
/// Accepts a single message, a bundle (nested bundles included), or several
/// messages concatenated back-to-back. Never partially succeeds: on any
/// error the whole call fails and no messages are produced.
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<OscMessage>> {
    let mut messages = Vec::new();
    let mut rem = bytes;
    if rem.is_empty() {
        return Err(DecodeError::Malformed("empty packet"));
    }
    while !rem.is_empty() {
        decode_element(&mut rem, &mut messages)?;
    }
    Ok(messages)
}

fn decode_element(rem: &mut &[u8], out: &mut Vec<OscMessage>) -> Result<()> {
    match rem.first() {
        Some(b'#') => decode_bundle(rem, out),
        Some(b'/') => {
            let msg = decode_message(rem)?;
            out.push(msg);
            Ok(())
        }
        Some(_) => Err(DecodeError::Malformed("address pattern must start with '/'")),
        None => Err(DecodeError::Truncated),
    }
}

fn decode_bundle(rem: &mut &[u8], out: &mut Vec<OscMessage>) -> Result<()> {
    let marker = take_padded_str(rem)?;
    if marker.as_bytes() != BUNDLE_MARKER {
        return Err(DecodeError::Malformed("bad bundle marker"));
    }
    // Time tags are not interpreted; every bundle is treated as immediate.
    take_bytes(rem, 8)?;

    while !rem.is_empty() {
        let size = take_i32(rem)?;
        if size < 0 {
            return Err(DecodeError::Malformed("negative bundle element size"));
        }
        let element = take_bytes(rem, size as usize)?;
        let mut element_rem = element;
        decode_element(&mut element_rem, out)?;
        if !element_rem.is_empty() {
            return Err(DecodeError::Malformed("trailing bytes in bundle element"));
        }
    }
    Ok(())
}

fn decode_message(rem: &mut &[u8]) -> Result<OscMessage> {
    let address = take_padded_str(rem)?;
    if !is_valid_address(&address) {
        return Err(DecodeError::Malformed("address pattern must start with '/'"));
    }

    // A missing type-tag string means a zero-argument message; some senders
    // omit it entirely.
    if rem.is_empty() || rem[0] != b',' {
        return Ok(OscMessage {
            address,
            args: Vec::new(),
        });
    }

    let tags = take_padded_str(rem)?;
    let mut args = Vec::with_capacity(tags.len().saturating_sub(1));
    for tag in tags.chars().skip(1) {
        let arg = match tag {
            'i' => OscArg::Int(take_i32(rem)?),
            'f' => OscArg::Float(f32::from_bits(take_i32(rem)? as u32)),
            's' => OscArg::Str(take_padded_str(rem)?),
            'b' => {
                let len = take_i32(rem)?;
                if len < 0 {
                    return Err(DecodeError::Malformed("negative blob length"));
                }
                let data = take_bytes(rem, len as usize)?.to_vec();
                let pad = (4 - data.len() % 4) % 4;
                take_bytes(rem, pad)?;
                OscArg::Blob(data)
            }
            other => return Err(DecodeError::UnknownTag(other)),
        };
        args.push(arg);
    }

    Ok(OscMessage { address, args })
}

fn put_padded_str(s: &str, dst: &mut BytesMut) {
    dst.put_slice(s.as_bytes());
    // At least one NUL, then out to a 4-byte boundary.
    let pad = 4 - s.len() % 4;
    dst.put_bytes(0, pad);
}

fn take_padded_str(rem: &mut &[u8]) -> Result<String> {
    let nul = rem
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::Truncated)?;
    let s = std::str::from_utf8(&rem[..nul])
        .map_err(|_| DecodeError::Malformed("string is not valid UTF-8"))?
        .to_string();
    // Content plus its NUL, rounded out to the 4-byte boundary.
    let consumed = (nul + 4) & !3;
    take_bytes(rem, consumed)?;
    Ok(s)
}

fn take_i32(rem: &mut &[u8]) -> Result<i32> {
    let bytes = take_bytes(rem, 4)?;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn take_bytes<'a>(rem: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if rem.len() < n {
        return Err(DecodeError::Truncated);
    }
    let (head, tail) = rem.split_at(n);
    *rem = tail;
    Ok(head)
}
