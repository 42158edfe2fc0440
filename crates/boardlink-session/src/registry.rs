use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, warn};

use boardlink_osc::{
    decode_packet, encode_bundle, encode_message, OscMessage,
};
use boardlink_transport::{DatagramTransport, TransportNotice};

use crate::error::{Result, SessionError};
use crate::event::BoardEvent;
use crate::identity::{SYSTEM_INFO_A, SYSTEM_INFO_B, SYSTEM_INFO_PROBE};
use crate::session::{BoardSession, SessionTransport};

/// Configuration for the session registry.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum time since last contact before a session is stale.
    pub liveness_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            liveness_window: Duration::from_secs(10),
        }
    }
}

/// Stable handle to a session slot; valid until the session is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle(usize);

/// An outgoing unit of application data.
pub enum Outgoing {
    /// One message.
    Message(OscMessage),
    /// Several messages packed into one bundle packet.
    Bundle(Vec<OscMessage>),
    /// A text command, e.g. `/led/0/state 1`.
    Raw(String),
}

/// Owns the set of known boards, performs discovery, dispatches inbound
/// messages, and expires stale entries.
///
/// Sessions live in an arena of slots addressed by stable handles, with a
/// key→handle index on top. All session mutation happens on the context
/// that calls [`poll_transports`](Self::poll_transports); the registry
/// itself takes no locks beyond each stream transport's frame queue.
pub struct SessionRegistry {
    slots: Vec<Option<BoardSession>>,
    free: Vec<usize>,
    index: HashMap<String, SessionHandle>,
    datagrams: Vec<Arc<DatagramTransport>>,
    notices: Receiver<TransportNotice>,
    notices_tx: Sender<TransportNotice>,
    events: Sender<BoardEvent>,
    probe: Vec<u8>,
    pending_new: Vec<String>,
    config: SessionConfig,
}

impl SessionRegistry {
    /// Create a registry and the event receiver for the collaborator side.
    pub fn new(config: SessionConfig) -> (Self, Receiver<BoardEvent>) {
        let (events, event_rx) = channel();
        let (notices_tx, notices) = channel();

        let mut probe = BytesMut::new();
        let ping = OscMessage {
            address: SYSTEM_INFO_PROBE.to_string(),
            args: Vec::new(),
        };
        encode_message(&ping, &mut probe).expect("probe address is static and valid");

        (
            Self {
                slots: Vec::new(),
                free: Vec::new(),
                index: HashMap::new(),
                datagrams: Vec::new(),
                notices,
                notices_tx,
                events,
                probe: probe.to_vec(),
                pending_new: Vec::new(),
                config,
            },
            event_rx,
        )
    }

    /// Sender to hand to every `StreamTransport::spawn` so link failures
    /// flow back into [`poll_transports`](Self::poll_transports).
    pub fn notice_sender(&self) -> Sender<TransportNotice> {
        self.notices_tx.clone()
    }

    /// Register a datagram transport for discovery and inbound matching.
    pub fn add_datagram_transport(&mut self, transport: Arc<DatagramTransport>) {
        self.datagrams.push(transport);
    }

    /// The encoded discovery probe packet.
    pub fn probe(&self) -> &[u8] {
        &self.probe
    }

    /// Insert a session, or refresh `last_seen` if the key already exists.
    ///
    /// Idempotent: an existing key keeps its session and handle; the
    /// offered transport is dropped in that case.
    pub fn upsert(
        &mut self,
        key: impl Into<String>,
        transport: SessionTransport,
        now: Instant,
    ) -> SessionHandle {
        let key = key.into();
        if let Some(&handle) = self.index.get(&key) {
            if let Some(session) = self.slots[handle.0].as_mut() {
                session.last_seen = now;
            }
            return handle;
        }

        let session = BoardSession::new(key.clone(), transport, now);
        let handle = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(session);
                SessionHandle(slot)
            }
            None => {
                self.slots.push(Some(session));
                SessionHandle(self.slots.len() - 1)
            }
        };
        self.index.insert(key.clone(), handle);
        debug!(key, "board session added");
        let _ = self.events.send(BoardEvent::Added { key });
        handle
    }

    /// Remove a session, closing its transport. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(handle) = self.index.remove(key) else {
            return false;
        };
        if let Some(mut session) = self.slots[handle.0].take() {
            session.transport.close();
        }
        self.free.push(handle.0);
        debug!(key, "board session removed");
        let _ = self.events.send(BoardEvent::Removed {
            key: key.to_string(),
        });
        true
    }

    /// Look up a session by key.
    pub fn get(&self, key: &str) -> Option<&BoardSession> {
        let handle = self.index.get(key)?;
        self.slots[handle.0].as_ref()
    }

    /// Look up a session by handle.
    pub fn session(&self, handle: SessionHandle) -> Option<&BoardSession> {
        self.slots.get(handle.0)?.as_ref()
    }

    /// Iterate over live sessions.
    pub fn iter(&self) -> impl Iterator<Item = &BoardSession> {
        self.slots.iter().flatten()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no sessions exist.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Broadcast the discovery probe and return the keys newly confirmed
    /// since the previous scan.
    ///
    /// Responses are matched asynchronously as datagrams arrive in
    /// [`poll_transports`](Self::poll_transports); this never waits.
    pub fn scan(&mut self) -> Vec<String> {
        for socket in &self.datagrams {
            if let Err(err) = socket.broadcast(&self.probe) {
                warn!(error = %err, "discovery broadcast failed");
            }
        }
        std::mem::take(&mut self.pending_new)
    }

    /// Drain pending transport activity: device-removed notices, inbound
    /// datagrams (new senders become sessions), and queued stream frames.
    pub fn poll_transports(&mut self, now: Instant) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice {
                TransportNotice::DeviceRemoved { key } => {
                    warn!(key, "device removed");
                    self.remove(&key);
                }
            }
        }

        let mut inbound = Vec::new();
        for socket in &self.datagrams {
            while let Some((data, from)) = socket.poll() {
                inbound.push((Arc::clone(socket), data, from));
            }
        }
        for (socket, data, from) in inbound {
            let key = from.ip().to_string();
            if !self.index.contains_key(&key) {
                let peer = SocketAddr::new(from.ip(), socket.send_port());
                self.upsert(
                    key.clone(),
                    SessionTransport::Datagram { socket, peer },
                    now,
                );
                self.pending_new.push(key.clone());
            }
            self.on_frame_received(&key, &data, now);
        }

        let mut frames = Vec::new();
        for session in self.slots.iter().flatten() {
            if let SessionTransport::Stream(transport) = &session.transport {
                while let Some(frame) = transport.poll() {
                    frames.push((session.key.clone(), frame));
                }
            }
        }
        for (key, frame) in frames {
            self.on_frame_received(&key, &frame.payload, now);
        }
    }

    /// Decode one inbound packet from `key` and dispatch its messages.
    ///
    /// System-info messages update the board identity positionally, with
    /// at most one `InfoChanged` event per packet; everything else is
    /// delivered as `Message` events. Undecodable packets are logged and
    /// dropped; `last_seen` refreshes only on successful decode.
    pub fn on_frame_received(&mut self, key: &str, packet: &[u8], now: Instant) {
        let Some(&handle) = self.index.get(key) else {
            warn!(key, "packet from unknown session");
            return;
        };
        let messages = match decode_packet(packet) {
            Ok(messages) => messages,
            Err(err) => {
                warn!(key, error = %err, "dropping undecodable packet");
                return;
            }
        };

        let Some(session) = self.slots[handle.0].as_mut() else {
            return;
        };
        session.last_seen = now;

        let mut info_changed = false;
        for message in messages {
            match message.address.as_str() {
                SYSTEM_INFO_A => {
                    info_changed |= session.identity.apply_info_a(&message.args);
                }
                SYSTEM_INFO_B => {
                    info_changed |= session.identity.apply_info_b(&message.args);
                }
                address if address.to_ascii_lowercase().contains("error") => {
                    warn!(key, message = %message, "board reported an error");
                }
                _ => {
                    let _ = self.events.send(BoardEvent::Message {
                        key: key.to_string(),
                        message,
                    });
                }
            }
        }

        if info_changed {
            let _ = self.events.send(BoardEvent::InfoChanged {
                key: key.to_string(),
            });
        }
    }

    /// Encode and send application data to a board.
    pub fn send_message(&self, key: &str, outgoing: Outgoing) -> Result<()> {
        let session = self
            .get(key)
            .ok_or_else(|| SessionError::UnknownBoard(key.to_string()))?;

        let mut wire = BytesMut::new();
        match outgoing {
            Outgoing::Message(message) => encode_message(&message, &mut wire)?,
            Outgoing::Bundle(messages) => encode_bundle(&messages, &mut wire)?,
            Outgoing::Raw(command) => {
                let message = OscMessage::from_command(&command)?;
                encode_message(&message, &mut wire)?;
            }
        }

        session.transport.send(&wire)?;
        Ok(())
    }

    /// Remove every session whose last contact is older than the liveness
    /// window. Returns the expired keys.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let window = self.config.liveness_window;
        let stale: Vec<String> = self
            .iter()
            .filter(|session| session.last_seen + window < now)
            .map(|session| session.key.clone())
            .collect();
        for key in &stale {
            debug!(key, "session expired");
            self.remove(key);
        }
        stale
    }

    /// Close every session.
    pub fn shutdown(&mut self) {
        for slot in &mut self.slots {
            if let Some(mut session) = slot.take() {
                session.transport.close();
            }
        }
        self.index.clear();
        self.free.clear();
        self.slots.clear();
    }
}
