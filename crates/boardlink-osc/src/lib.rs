//! Typed, address-patterned messages for board communication.
//!
//! Messages carry a `/`-separated address pattern plus an ordered list of
//! typed arguments (int32, float32, string, blob), encoded with 4-byte
//! alignment. Zero or more messages can be packed into one on-wire packet,
//! either concatenated or wrapped in a `#bundle`. Decoding is strict and
//! all-or-nothing.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode_packet, encode_bundle, encode_message, BUNDLE_MARKER};
pub use error::{DecodeError, EncodeError, Result};
pub use message::{OscArg, OscMessage};
