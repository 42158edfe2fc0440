/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] boardlink_transport::TransportError),

    /// A packet could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] boardlink_osc::DecodeError),

    /// An outgoing message could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] boardlink_osc::EncodeError),

    /// No session exists for the given key.
    #[error("unknown board {0:?}")]
    UnknownBoard(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
