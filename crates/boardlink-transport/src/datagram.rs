use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Well-known discovery port boards listen and answer on.
pub const DISCOVERY_PORT: u16 = 10000;

const MAX_DATAGRAM: usize = 64 * 1024;

/// Configuration for a datagram transport.
#[derive(Debug, Clone)]
pub struct DatagramConfig {
    /// Local receive port. `0` picks an ephemeral port.
    pub listen_port: u16,
    /// Port boards receive on; broadcasts go here.
    pub send_port: u16,
    /// Drop inbound datagrams from this address (the host's own, so the
    /// host does not discover itself via its broadcast echo).
    pub ignore_source: Option<IpAddr>,
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self {
            listen_port: DISCOVERY_PORT,
            send_port: DISCOVERY_PORT,
            ignore_source: None,
        }
    }
}

/// A broadcast-capable UDP transport.
///
/// Datagrams are already delimited, so no framing codec is involved.
/// Delivery is pull-based and never blocks the caller.
pub struct DatagramTransport {
    socket: UdpSocket,
    send_port: u16,
    ignore_source: Option<IpAddr>,
}

impl DatagramTransport {
    /// Bind the receive port and enable broadcast.
    pub fn bind(config: DatagramConfig) -> Result<Self> {
        let bind_err = |source| TransportError::Bind {
            port: config.listen_port,
            source,
        };
        let socket =
            UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.listen_port)).map_err(bind_err)?;
        socket.set_broadcast(true).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        debug!(port = config.listen_port, "udp transport bound");

        Ok(Self {
            socket,
            send_port: config.send_port,
            ignore_source: config.ignore_source,
        })
    }

    /// Take the next pending datagram, if any. Never blocks.
    pub fn poll(&self) -> Option<(Bytes, SocketAddr)> {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((0, _)) => continue,
                Ok((n, addr)) => {
                    if self.ignore_source == Some(addr.ip()) {
                        continue;
                    }
                    return Some((Bytes::copy_from_slice(&buf[..n]), addr));
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return None,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(error = %err, "udp receive failed");
                    return None;
                }
            }
        }
    }

    /// Send one datagram to a specific board.
    pub fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, addr)
            .map_err(TransportError::Send)?;
        Ok(())
    }

    /// Broadcast one datagram to the well-known send port.
    pub fn broadcast(&self, data: &[u8]) -> Result<()> {
        self.socket
            .send_to(data, (Ipv4Addr::BROADCAST, self.send_port))
            .map_err(TransportError::Send)?;
        Ok(())
    }

    /// The port boards receive on.
    pub fn send_port(&self) -> u16 {
        self.send_port
    }

    /// The locally bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}
