use bytes::{BufMut, Bytes, BytesMut};

/// End-of-frame delimiter.
pub const END: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// `ESC ESC_END` carries a literal `END` byte.
pub const ESC_END: u8 = 0xDC;
/// `ESC ESC_ESC` carries a literal `ESC` byte.
pub const ESC_ESC: u8 = 0xDD;

/// One delimited unit of bytes recovered from a stream transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The unescaped frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame from a payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// END [payload with END -> ESC ESC_END, ESC -> ESC ESC_ESC] END
/// ```
/// The leading `END` flushes any line noise the receiver may have
/// accumulated. The codec imposes no payload length limit; readers cap
/// buffer growth (see `SlipReader`).
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + 2);
    dst.put_u8(END);
    for &byte in payload {
        match byte {
            END => {
                dst.put_u8(ESC);
                dst.put_u8(ESC_END);
            }
            ESC => {
                dst.put_u8(ESC);
                dst.put_u8(ESC_ESC);
            }
            other => dst.put_u8(other),
        }
    }
    dst.put_u8(END);
}

/// Incremental SLIP decoder.
///
/// Fed one byte (or one slice) at a time; state persists across calls so
/// a frame split over arbitrary read boundaries assembles correctly.
/// Bytes that arrive before the first `END` are discarded so the decoder
/// resynchronizes on a mid-stream attach. A frame completes exactly when
/// an `END` is seen after at least one payload byte; empty `END END`
/// pairs are sync no-ops.
#[derive(Debug, Default)]
pub struct SlipDecoder {
    buf: BytesMut,
    started: bool,
    escaped: bool,
}

impl SlipDecoder {
    /// Create a decoder waiting for a leading `END`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a completed frame when this byte terminates one.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        if self.escaped {
            self.escaped = false;
            // An escaped delimiter is payload, never a terminator.
            let literal = match byte {
                ESC_END => END,
                ESC_ESC => ESC,
                other => other,
            };
            if self.started {
                self.buf.put_u8(literal);
            }
            return None;
        }

        match byte {
            END => {
                if self.started && !self.buf.is_empty() {
                    self.started = false;
                    return Some(Frame {
                        payload: self.buf.split().freeze(),
                    });
                }
                self.started = true;
                None
            }
            ESC => {
                self.escaped = true;
                None
            }
            other => {
                if self.started {
                    self.buf.put_u8(other);
                }
                None
            }
        }
    }

    /// Feed a slice, appending any completed frames to `out`.
    pub fn feed_slice(&mut self, bytes: &[u8], out: &mut Vec<Frame>) {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte) {
                out.push(frame);
            }
        }
    }

    /// Bytes accumulated for the in-progress frame.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop the in-progress frame and wait for the next leading `END`.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.started = false;
        self.escaped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut SlipDecoder, wire: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        decoder.feed_slice(wire, &mut frames);
        frames
    }

    #[test]
    fn roundtrip_plain_payload() {
        let mut wire = BytesMut::new();
        encode_frame(b"hello board", &mut wire);

        let mut decoder = SlipDecoder::new();
        let frames = decode_all(&mut decoder, &wire);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"hello board");
    }

    #[test]
    fn roundtrip_payload_containing_delimiters() {
        let payload = [0x01, END, 0x02, ESC, END, ESC, 0x03];
        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire);

        let mut decoder = SlipDecoder::new();
        let frames = decode_all(&mut decoder, &wire);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), payload);
    }

    #[test]
    fn escaped_end_is_not_a_terminator() {
        // END 'a' ESC ESC_END 'b' END  ->  ['a', 0xC0, 'b']
        let wire = [END, b'a', ESC, ESC_END, b'b', END];
        let mut decoder = SlipDecoder::new();
        let frames = decode_all(&mut decoder, &wire);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), &[b'a', 0xC0, b'b']);
    }

    #[test]
    fn split_feed_matches_slice_feed() {
        let payload = [END, ESC, 0x00, 0x7F, ESC_END, ESC_ESC, b'z'];
        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire);

        let mut whole = SlipDecoder::new();
        let expected = decode_all(&mut whole, &wire);

        // Every split point, one byte at a time.
        let mut bytewise = SlipDecoder::new();
        let mut frames = Vec::new();
        for &byte in wire.iter() {
            if let Some(frame) = bytewise.feed(byte) {
                frames.push(frame);
            }
        }
        assert_eq!(frames, expected);

        // Two-part splits at every boundary.
        for split in 0..wire.len() {
            let mut decoder = SlipDecoder::new();
            let mut frames = Vec::new();
            decoder.feed_slice(&wire[..split], &mut frames);
            decoder.feed_slice(&wire[split..], &mut frames);
            assert_eq!(frames, expected, "split at {split}");
        }
    }

    #[test]
    fn leading_end_bytes_are_skipped() {
        let wire = [END, END, END, b'x', END];
        let mut decoder = SlipDecoder::new();
        let frames = decode_all(&mut decoder, &wire);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"x");
    }

    #[test]
    fn garbage_before_first_end_is_discarded() {
        let mut wire = vec![0xDE, 0xAD, 0xBE];
        let mut framed = BytesMut::new();
        encode_frame(b"ok", &mut framed);
        wire.extend_from_slice(&framed);

        let mut decoder = SlipDecoder::new();
        let frames = decode_all(&mut decoder, &wire);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"ok");
    }

    #[test]
    fn back_to_back_frames() {
        let mut wire = BytesMut::new();
        encode_frame(b"first", &mut wire);
        encode_frame(b"second", &mut wire);

        let mut decoder = SlipDecoder::new();
        let frames = decode_all(&mut decoder, &wire);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload.as_ref(), b"first");
        assert_eq!(frames[1].payload.as_ref(), b"second");
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut decoder = SlipDecoder::new();
        assert!(decoder.feed(END).is_none());
        assert!(decoder.feed(b'p').is_none());
        assert_eq!(decoder.pending_len(), 1);

        decoder.reset();
        assert_eq!(decoder.pending_len(), 0);

        // Decoder resyncs on the next framed payload.
        let mut wire = BytesMut::new();
        encode_frame(b"next", &mut wire);
        let frames = decode_all(&mut decoder, &wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"next");
    }

    #[test]
    fn escape_survives_split_across_reads() {
        let mut decoder = SlipDecoder::new();
        let mut frames = Vec::new();
        decoder.feed_slice(&[END, b'a', ESC], &mut frames);
        assert!(frames.is_empty());
        decoder.feed_slice(&[ESC_ESC, END], &mut frames);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), &[b'a', ESC]);
    }
}
