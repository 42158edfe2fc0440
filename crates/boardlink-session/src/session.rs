use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use boardlink_transport::{DatagramTransport, StreamTransport, TransportError};

use crate::identity::BoardIdentity;

/// The link a session's outbound traffic goes over.
pub enum SessionTransport {
    /// A serial/USB link owned exclusively by this session.
    Stream(StreamTransport),
    /// A shared UDP socket plus this board's address.
    Datagram {
        socket: Arc<DatagramTransport>,
        peer: SocketAddr,
    },
}

impl SessionTransport {
    /// Send one encoded packet to the board.
    pub fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        match self {
            SessionTransport::Stream(transport) => transport.send(payload),
            SessionTransport::Datagram { socket, peer } => socket.send_to(payload, *peer),
        }
    }

    pub(crate) fn close(&mut self) {
        if let SessionTransport::Stream(transport) = self {
            transport.close();
        }
    }
}

/// The live record of one reachable board.
pub struct BoardSession {
    pub(crate) key: String,
    pub(crate) transport: SessionTransport,
    pub(crate) identity: BoardIdentity,
    pub(crate) last_seen: Instant,
}

impl BoardSession {
    pub(crate) fn new(key: String, transport: SessionTransport, now: Instant) -> Self {
        Self {
            key,
            transport,
            identity: BoardIdentity::default(),
            last_seen: now,
        }
    }

    /// The session key, unique per transport and address.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last-known identity of the board.
    pub fn identity(&self) -> &BoardIdentity {
        &self.identity
    }

    /// When a packet from this board last decoded successfully.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }
}
