//! Checksummed API packet format for the packet radio link.
//!
//! Wire format: `0x7E len_hi len_lo api_id payload checksum`, with the
//! checksum covering the api id and payload. [`RadioParser`] is the
//! byte-at-a-time state machine; [`RadioLink`] drives it over a blocking
//! byte transport. Packet contents are a tagged [`RadioPayload`] selected
//! by api id, with typed builders and read views per variant.

pub mod error;
pub mod link;
pub mod packet;
pub mod parser;

pub use error::{RadioError, Result};
pub use link::RadioLink;
pub use packet::{
    checksum, ApiId, AtResponseView, IoView, RadioPacket, RadioPayload, Rx16View, Rx64View,
    MAX_FRAME_DATA, START_BYTE,
};
pub use parser::RadioParser;
