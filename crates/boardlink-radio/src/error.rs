use crate::packet::ApiId;

/// Errors from building, reading, or transporting radio packets.
///
/// Checksum and length failures inside the parser are not surfaced here;
/// the parser discards the packet, resets, and counts the discard.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    /// A typed read was attempted on a packet of a different kind.
    #[error("packet type mismatch (expected {expected:?}, got {actual:?})")]
    TypeMismatch { expected: ApiId, actual: ApiId },

    /// Outgoing packet data exceeds the fixed payload bound.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred on the underlying byte transport.
    #[error("radio I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte transport ended.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, RadioError>;
