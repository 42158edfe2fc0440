/// Errors from decoding a message packet.
///
/// Decoding is all-or-nothing: any of these means the whole packet is
/// rejected and no messages are produced.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A declared length ran past the end of the buffer.
    #[error("truncated packet")]
    Truncated,

    /// The type tag string contained an unrecognized tag.
    #[error("unknown type tag '{0}'")]
    UnknownTag(char),

    /// The packet structure is invalid.
    #[error("malformed packet: {0}")]
    Malformed(&'static str),
}

/// Errors from encoding a message.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The address pattern is empty or not `/`-prefixed.
    #[error("invalid address pattern: {0:?}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
