use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

/// A byte link to one board (serial port, USB-CDC endpoint, pty).
///
/// This is the boundary to the out-of-scope peripheral layer: the stack
/// only needs "send these bytes" and "these bytes arrived". Reads are
/// non-blocking; `Ok(0)` means nothing is pending right now.
pub trait SerialPort: Send {
    /// Open the link. Called repeatedly by the reader until it succeeds.
    fn open(&mut self) -> io::Result<()>;

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;

    /// Read whatever bytes are pending, without blocking.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all bytes.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the link.
    fn close(&mut self);
}

#[derive(Default)]
struct MemoryState {
    to_host: VecDeque<u8>,
    to_board: Vec<u8>,
    open: bool,
    fail_opens: bool,
    fail_reads: bool,
}

/// In-process loopback implementation of [`SerialPort`].
///
/// [`MemoryPort::pair`] returns the host end plus a peer handle that
/// plays the board side: inject inbound bytes, inspect outbound bytes,
/// and trip open/read failures.
pub struct MemoryPort {
    state: Arc<Mutex<MemoryState>>,
}

/// Board-side handle of a [`MemoryPort`].
#[derive(Clone)]
pub struct MemoryPortPeer {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPort {
    pub fn pair() -> (Self, MemoryPortPeer) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MemoryPortPeer { state },
        )
    }
}

impl SerialPort for MemoryPort {
    fn open(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().expect("memory port lock");
        if state.fail_opens {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such device"));
        }
        state.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().expect("memory port lock").open
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().expect("memory port lock");
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device removed"));
        }
        let n = state.to_host.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.to_host.pop_front().expect("byte available");
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().expect("memory port lock");
        if !state.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port not open"));
        }
        state.to_board.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().expect("memory port lock").open = false;
    }
}

impl MemoryPortPeer {
    /// Queue bytes for the host to read.
    pub fn inject(&self, bytes: &[u8]) {
        self.state
            .lock()
            .expect("memory port lock")
            .to_host
            .extend(bytes.iter().copied());
    }

    /// Take everything the host has written so far.
    pub fn sent(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().expect("memory port lock").to_board)
    }

    /// Whether the host end currently has the port open.
    pub fn is_open(&self) -> bool {
        self.state.lock().expect("memory port lock").open
    }

    /// Make every subsequent open attempt fail.
    pub fn fail_opens(&self, fail: bool) {
        self.state.lock().expect("memory port lock").fail_opens = fail;
    }

    /// Make every subsequent read fail hard (device removed).
    pub fn fail_reads(&self) {
        self.state.lock().expect("memory port lock").fail_reads = true;
    }
}
