use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, warn};

use boardlink_slip::{encode_frame, Frame, SlipDecoder, DEFAULT_MAX_FRAME};

use crate::error::{Result, TransportError};
use crate::port::SerialPort;

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Raised by a transport toward the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportNotice {
    /// The underlying link failed hard; the board is gone.
    DeviceRemoved { key: String },
}

/// Configuration for a stream transport.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Cap on one decoded frame; larger in-progress frames are dropped.
    pub max_frame_size: usize,
    /// Cap on queued undelivered frames; the oldest is dropped when full.
    pub queue_capacity: usize,
    /// Delay before retrying a failed open.
    pub reopen_delay: Duration,
    /// Delay when the link is open but idle.
    pub idle_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
            queue_capacity: 256,
            reopen_delay: Duration::from_millis(50),
            idle_delay: Duration::from_millis(1),
        }
    }
}

/// A serial/USB byte link carrying SLIP frames.
///
/// A dedicated reader thread opens the link (retrying while it is
/// unavailable), feeds received bytes through the SLIP decoder, and
/// queues completed frames for [`poll`](Self::poll). A hard read or
/// write failure marks the transport closed and raises
/// [`TransportNotice::DeviceRemoved`] instead of retrying.
pub struct StreamTransport {
    key: String,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    frames: Arc<Mutex<VecDeque<Frame>>>,
    closing: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    notices: Sender<TransportNotice>,
    reader: Option<JoinHandle<()>>,
}

impl StreamTransport {
    /// Start the reader thread over `port`.
    pub fn spawn(
        key: impl Into<String>,
        port: Box<dyn SerialPort>,
        config: StreamConfig,
        notices: Sender<TransportNotice>,
    ) -> Self {
        let key = key.into();
        let port = Arc::new(Mutex::new(port));
        let frames = Arc::new(Mutex::new(VecDeque::new()));
        let closing = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        let reader = {
            let key = key.clone();
            let port = Arc::clone(&port);
            let frames = Arc::clone(&frames);
            let closing = Arc::clone(&closing);
            let closed = Arc::clone(&closed);
            let notices = notices.clone();
            std::thread::Builder::new()
                .name(format!("boardlink-read-{key}"))
                .spawn(move || {
                    read_loop(&key, &port, &frames, &closing, &closed, &notices, &config);
                })
                .expect("spawn reader thread")
        };

        Self {
            key,
            port,
            frames,
            closing,
            closed,
            notices,
            reader: Some(reader),
        }
    }

    /// The unique key of the board behind this link.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// SLIP-encode and write one packet to the link.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut wire = BytesMut::new();
        encode_frame(payload, &mut wire);

        let mut port = self.port.lock().expect("port lock");
        if !port.is_open() {
            return Err(TransportError::Closed);
        }
        if let Err(err) = port.write_all(&wire) {
            port.close();
            drop(port);
            self.closed.store(true, Ordering::SeqCst);
            let _ = self.notices.send(TransportNotice::DeviceRemoved {
                key: self.key.clone(),
            });
            return Err(TransportError::Send(err));
        }
        Ok(())
    }

    /// Take the next completed inbound frame, if any. Never blocks.
    pub fn poll(&self) -> Option<Frame> {
        self.frames.lock().expect("frame queue lock").pop_front()
    }

    /// Whether the link failed or was closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.closing.load(Ordering::SeqCst)
    }

    /// Stop the reader (cooperatively) and close the link.
    pub fn close(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        self.port.lock().expect("port lock").close();
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_loop(
    key: &str,
    port: &Mutex<Box<dyn SerialPort>>,
    frames: &Mutex<VecDeque<Frame>>,
    closing: &AtomicBool,
    closed: &AtomicBool,
    notices: &Sender<TransportNotice>,
    config: &StreamConfig,
) {
    let mut decoder = SlipDecoder::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        // Cancellation is checked before every blocking step.
        if closing.load(Ordering::SeqCst) || closed.load(Ordering::SeqCst) {
            return;
        }

        let read = {
            let mut port = port.lock().expect("port lock");
            if !port.is_open() {
                if let Err(err) = port.open() {
                    drop(port);
                    debug!(key, error = %err, "link not available, will retry");
                    std::thread::sleep(config.reopen_delay);
                    continue;
                }
                debug!(key, "link opened");
            }
            match port.read_available(&mut chunk) {
                Ok(n) => n,
                Err(err) => {
                    port.close();
                    drop(port);
                    warn!(key, error = %err, "link read failed, device removed");
                    closed.store(true, Ordering::SeqCst);
                    let _ = notices.send(TransportNotice::DeviceRemoved {
                        key: key.to_string(),
                    });
                    return;
                }
            }
        };

        if read == 0 {
            std::thread::sleep(config.idle_delay);
            continue;
        }

        for &byte in &chunk[..read] {
            if let Some(frame) = decoder.feed(byte) {
                let mut queue = frames.lock().expect("frame queue lock");
                if queue.len() >= config.queue_capacity {
                    warn!(key, capacity = config.queue_capacity, "frame queue full");
                    queue.pop_front();
                }
                queue.push_back(frame);
            }
            if decoder.pending_len() > config.max_frame_size {
                warn!(
                    key,
                    size = decoder.pending_len(),
                    max = config.max_frame_size,
                    "dropping oversized frame"
                );
                decoder.reset();
            }
        }
    }
}
