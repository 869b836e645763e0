//! Byte transport collaborators
//!
//! A [`Transport`] is the device's view of the physical link: a
//! non-blocking byte source and a flow-controlled byte sink. The host
//! signals read- and write-availability by calling
//! [`Device::on_bytes_available`](crate::device::Device::on_bytes_available)
//! and [`Device::on_write_ready`](crate::device::Device::on_write_ready).
//!
//! Two implementations are bundled:
//!
//! - [`MemoryTransport`]: an in-memory link shared between the device and
//!   the host, used by the drivers and by tests
//! - [`IoTransport`]: adapts any `std::io::Read + Write`

use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::config::TransportConfig;
use crate::error::GpsError;

/// Device-facing side of a byte link
pub trait Transport: Send {
    /// Applies line settings; an error aborts device creation
    fn configure(&mut self, config: &TransportConfig) -> io::Result<()>;

    /// Reads bytes that are already available; never waits for more
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Number of bytes the link can accept right now
    fn write_available(&mut self) -> usize;

    /// Writes up to `buf.len()` bytes, returning how many were accepted
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct Link {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    write_window: usize,
    config: Option<TransportConfig>,
    reject_config: bool,
}

/// In-memory [`Transport`]
///
/// Clones share one link. The device owns one clone; the host keeps another
/// to [`inject`](Self::inject) received bytes and
/// [`take_written`](Self::take_written) transmitted ones. The write window
/// bounds how much a single [`Transport::write`] accepts, modelling a UART
/// FIFO.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    link: Arc<Mutex<Link>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates a link with an unbounded write window
    pub fn new() -> Self {
        MemoryTransport {
            link: Arc::new(Mutex::new(Link {
                rx: VecDeque::new(),
                tx: Vec::new(),
                write_window: usize::MAX,
                config: None,
                reject_config: false,
            })),
        }
    }

    fn link(&self) -> std::sync::MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues bytes for the device to read
    pub fn inject(&self, bytes: &[u8]) {
        self.link().rx.extend(bytes);
    }

    /// Bytes injected but not yet read by the device
    pub fn rx_available(&self) -> usize {
        self.link().rx.len()
    }

    /// Removes and returns everything the device has written
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.link().tx)
    }

    /// Limits how many bytes each write may accept
    pub fn set_write_window(&self, window: usize) {
        self.link().write_window = window;
    }

    /// Makes subsequent `configure` calls fail, even for valid settings
    pub fn reject_configuration(&self, reject: bool) {
        self.link().reject_config = reject;
    }

    /// The settings most recently applied
    pub fn applied_config(&self) -> Option<TransportConfig> {
        self.link().config.clone()
    }
}

impl Transport for MemoryTransport {
    fn configure(&mut self, config: &TransportConfig) -> io::Result<()> {
        let mut link = self.link();
        if link.reject_config {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "configuration rejected by link",
            ));
        }
        config
            .validate()
            .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;
        link.config = Some(config.clone());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut link = self.link();
        let n = buf.len().min(link.rx.len());
        for (dst, src) in buf.iter_mut().zip(link.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write_available(&mut self) -> usize {
        self.link().write_window
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut link = self.link();
        let n = buf.len().min(link.write_window);
        link.tx.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// [`Transport`] over a `std::io` stream
///
/// Reads go straight to the stream, so it should be non-blocking or have a
/// read timeout; `WouldBlock` and `TimedOut` are reported as zero bytes.
/// Line settings are validated but otherwise not applied.
#[derive(Debug)]
pub struct IoTransport<S> {
    stream: S,
}

impl<S> IoTransport<S> {
    pub fn new(stream: S) -> Self {
        IoTransport { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Transport for IoTransport<S>
where
    S: io::Read + io::Write + Send,
{
    fn configure(&mut self, config: &TransportConfig) -> io::Result<()> {
        config
            .validate()
            .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn write_available(&mut self) -> usize {
        usize::MAX
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

fn bound_ids() -> &'static Mutex<HashSet<String>> {
    static BOUND: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    BOUND.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exclusive claim on a transport id, released on drop
///
/// At most one live binding exists per id in the process.
#[derive(Debug)]
pub struct TransportBinding {
    id: String,
}

impl TransportBinding {
    pub fn acquire(id: &str) -> Result<Self, GpsError> {
        let mut ids = bound_ids().lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.to_string()) {
            return Err(GpsError::TransportInUse(id.to_string()));
        }
        Ok(TransportBinding { id: id.to_string() })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for TransportBinding {
    fn drop(&mut self) {
        bound_ids()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
