//! Transports carrying framed board traffic.
//!
//! Two kinds of link: [`StreamTransport`] wraps a serial/USB byte link
//! with SLIP framing and a dedicated reader thread; [`DatagramTransport`]
//! is broadcast-capable UDP where datagrams are already delimited. The
//! byte link itself is abstracted behind [`SerialPort`]; [`MemoryPort`]
//! is the in-process implementation used by tests.

pub mod datagram;
pub mod error;
pub mod port;
pub mod stream;

pub use datagram::{DatagramConfig, DatagramTransport, DISCOVERY_PORT};
pub use error::{Result, TransportError};
pub use port::{MemoryPort, MemoryPortPeer, SerialPort};
pub use stream::{StreamConfig, StreamTransport, TransportNotice};
