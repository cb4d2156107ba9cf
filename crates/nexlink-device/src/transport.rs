//! Byte transports to the panel.
//!
//! A transport writes encoded instructions and hands back complete frames,
//! one per call, splitting the incoming byte stream with a
//! [`FrameBuffer`](nexlink_protocol::FrameBuffer). All methods take `&self`
//! and serialize access internally so a transport can be shared with the
//! poller thread.

use std::io;
use std::sync::Arc;

use nexlink_protocol::{display_wire, FrameBuffer};
use parking_lot::Mutex;

/// Half-duplex link to a panel.
pub trait Transport: Send {
    /// Write encoded bytes.
    fn write(&self, data: &[u8]) -> io::Result<usize>;

    /// Next complete frame, or `None` if nothing is pending.
    fn read_next(&self) -> io::Result<Option<Vec<u8>>>;

    /// Discard anything received but not yet read.
    fn flush_pending(&self) -> io::Result<()>;
}

impl<T: Transport + Sync + ?Sized> Transport for Arc<T> {
    fn write(&self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn read_next(&self) -> io::Result<Option<Vec<u8>>> {
        (**self).read_next()
    }

    fn flush_pending(&self) -> io::Result<()> {
        (**self).flush_pending()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn read_next(&self) -> io::Result<Option<Vec<u8>>> {
        (**self).read_next()
    }

    fn flush_pending(&self) -> io::Result<()> {
        (**self).flush_pending()
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Produces the frames the panel would send in reply to one instruction.
pub type Responder = Box<dyn FnMut(&str) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct MockState {
    incoming: FrameBuffer,
    written: Vec<Vec<u8>>,
    responder: Option<Responder>,
}

/// In-memory transport for tests and dry runs.
///
/// Clones share state, so a test can keep one clone to inject frames and
/// inspect writes while the device owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that answers each written instruction with `responder`.
    ///
    /// The responder receives the instruction text without the terminator.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> Vec<Vec<u8>> + Send + 'static,
    {
        let transport = Self::new();
        transport.state.lock().responder = Some(Box::new(responder));
        transport
    }

    /// Queue raw bytes as if received from the panel.
    pub fn inject(&self, bytes: &[u8]) {
        self.state.lock().incoming.push(bytes);
    }

    /// Every write so far, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// Every write so far as instruction text.
    pub fn written_text(&self) -> Vec<String> {
        self.state.lock().written.iter().map(|w| display_wire(w)).collect()
    }

    /// Take and clear the recorded writes.
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().written)
    }

    /// Bytes received but not yet read.
    pub fn pending(&self) -> usize {
        self.state.lock().incoming.buffered_len()
    }
}

impl Transport for MockTransport {
    fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.written.push(data.to_vec());
        let text = display_wire(data);
        let replies = match state.responder.as_mut() {
            Some(responder) => responder(&text),
            None => Vec::new(),
        };
        for reply in replies {
            state.incoming.push(&reply);
        }
        Ok(data.len())
    }

    fn read_next(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.state.lock().incoming.next_frame())
    }

    fn flush_pending(&self) -> io::Result<()> {
        self.state.lock().incoming.clear();
        Ok(())
    }
}

// ============================================================================
// Serial
// ============================================================================

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "serial")]
mod serial {
    use std::io::{self, Read, Write};
    use std::time::Duration;

    use nexlink_protocol::FrameBuffer;
    use parking_lot::Mutex;
    use serialport::{ClearBuffer, SerialPort};
    use tracing::{debug, trace};

    use super::Transport;

    const READ_CHUNK: usize = 256;

    /// Transport over a serial port.
    pub struct SerialTransport {
        port: Mutex<Box<dyn SerialPort>>,
        buffer: Mutex<FrameBuffer>,
    }

    impl SerialTransport {
        /// Open `path` at `baud` with a short internal read timeout.
        pub fn open(path: &str, baud: u32) -> io::Result<Self> {
            let port = serialport::new(path, baud)
                .timeout(Duration::from_millis(50))
                .open()
                .map_err(io::Error::from)?;
            debug!(path, baud, "Opened serial port");
            Ok(Self {
                port: Mutex::new(port),
                buffer: Mutex::new(FrameBuffer::new()),
            })
        }
    }

    impl Transport for SerialTransport {
        fn write(&self, data: &[u8]) -> io::Result<usize> {
            let mut port = self.port.lock();
            port.write_all(data)?;
            port.flush()?;
            Ok(data.len())
        }

        fn read_next(&self) -> io::Result<Option<Vec<u8>>> {
            let mut buffer = self.buffer.lock();
            if let Some(frame) = buffer.next_frame() {
                return Ok(Some(frame));
            }

            let mut port = self.port.lock();
            let available = port.bytes_to_read().map_err(io::Error::from)? as usize;
            if available == 0 {
                return Ok(None);
            }

            let mut chunk = vec![0u8; available.min(READ_CHUNK)];
            let n = match port.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
                Err(e) => return Err(e),
            };
            trace!(bytes = n, "Read from serial port");
            buffer.push(&chunk[..n]);
            Ok(buffer.next_frame())
        }

        fn flush_pending(&self) -> io::Result<()> {
            self.port
                .lock()
                .clear(ClearBuffer::Input)
                .map_err(io::Error::from)?;
            self.buffer.lock().clear();
            Ok(())
        }
    }
}
