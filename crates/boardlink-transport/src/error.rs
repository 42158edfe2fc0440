/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the underlying byte link.
    #[error("failed to open link {key}: {source}")]
    Open {
        key: String,
        source: std::io::Error,
    },

    /// Failed to bind the datagram receive port.
    #[error("failed to bind udp port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },

    /// A write to the link failed; the device is treated as removed.
    #[error("link write failed: {0}")]
    Send(#[source] std::io::Error),

    /// The transport is closed or not yet open.
    #[error("transport closed")]
    Closed,

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
