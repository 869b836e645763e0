//! Asynchronous driver that pumps a byte stream through a [`Device`]
//!
//! The [`Device`] itself never performs I/O on its own schedule; something
//! has to call its hooks. [`AsyncDriver`] does that for any
//! `futures_io::AsyncRead + AsyncWrite` stream: bytes read from the stream are
//! fed to the device, queued commands are written back, and the watchdog
//! timer is fired on time.
//!
//! For synchronous I/O, see the `blocking` submodule.
//!
//! # Example
//!
//! ```no_run
//! use nmea_receiver::config::DeviceConfig;
//! use nmea_receiver::device::{Device, Event};
//! use nmea_receiver::driver::AsyncDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeviceConfig::default().with_watchdog_timeout(std::time::Duration::from_secs(2));
//! let mut driver = AsyncDriver::connect("127.0.0.1:10110", config, |device: &Device, event: Event| {
//!     if event == Event::LocationUpdate {
//!         println!("{:?}", device.get_location());
//!     }
//! })
//! .await?;
//!
//! driver.run().await?;
//! # Ok(())
//! # }
//! ```

use std::time::{Duration, Instant};

use crate::Result;
use crate::config::DeviceConfig;
use crate::device::{Device, EventSink};
use crate::protocol::NmeaRequest;
use crate::timer::{SharedScheduler, TimerId};
use crate::transport::MemoryTransport;

/// Blocking (synchronous) driver
pub mod blocking;

const READ_CHUNK: usize = 1024;

/// Tracks when the armed watchdog timer is next due
///
/// The device arms at most one periodic timer through a [`SharedScheduler`];
/// drivers poll the scheduler and ask this ticker when to fire it.
#[derive(Debug, Default)]
pub(crate) struct Ticker {
    current: Option<(TimerId, Instant)>,
}

impl Ticker {
    /// Deadline of the next tick, restarting the period if the timer changed
    pub(crate) fn deadline(
        &mut self,
        armed: Option<(TimerId, Duration)>,
        now: Instant,
    ) -> Option<Instant> {
        match (armed, self.current) {
            (None, _) => {
                self.current = None;
                None
            }
            (Some((id, _)), Some((current, due))) if id == current => Some(due),
            (Some((id, period)), _) => {
                let due = now + period;
                self.current = Some((id, due));
                Some(due)
            }
        }
    }

    /// Returns the timer id if its tick is due, and schedules the next one
    pub(crate) fn poll(
        &mut self,
        armed: Option<(TimerId, Duration)>,
        now: Instant,
    ) -> Option<TimerId> {
        let due = self.deadline(armed, now)?;
        let (id, period) = armed?;
        if now < due {
            return None;
        }
        let mut next = due + period;
        // skip ticks missed while the host was busy
        while next <= now {
            next += period;
        }
        self.current = Some((id, next));
        Some(id)
    }
}

/// Drives a [`Device`] over an asynchronous byte stream
///
/// The device sees an in-memory transport; the driver moves bytes between
/// that transport and `Stream`.
///
/// # Type Parameters
/// * `Stream` - The underlying async I/O stream type (e.g., a compat TcpStream)
#[derive(Debug)]
pub struct AsyncDriver<Stream> {
    stream: Stream,
    device: Device,
    link: MemoryTransport,
    scheduler: SharedScheduler,
    ticker: Ticker,
    buf: Vec<u8>,
    // taken from the link but not yet accepted by the stream
    tx_pending: Vec<u8>,
}

impl<Stream> AsyncDriver<Stream>
where
    Stream: futures_io::AsyncRead + futures_io::AsyncWrite + Unpin,
{
    /// Creates a device bound to `transport_id` and attaches it to `stream`
    ///
    /// # Returns
    /// * `Ok(driver)` - The device was created and `Initialized` emitted
    /// * `Err(_)` - The transport id is in use or the configuration was rejected
    pub fn open(
        stream: Stream,
        transport_id: &str,
        config: DeviceConfig,
        sink: impl EventSink + 'static,
    ) -> Result<Self> {
        let link = MemoryTransport::new();
        let scheduler = SharedScheduler::new();
        let device = Device::builder(transport_id, link.clone())
            .config(config)
            .event_sink(sink)
            .scheduler(scheduler.clone())
            .build()?;

        Ok(AsyncDriver {
            stream,
            device,
            link,
            scheduler,
            ticker: Ticker::default(),
            buf: vec![0; READ_CHUNK],
            tx_pending: Vec::new(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Reads once from the stream and processes what arrived
    ///
    /// Returns the number of bytes read; `0` means the stream is closed.
    pub async fn pump(&mut self) -> Result<usize> {
        use futures_util::AsyncReadExt;

        let n = self.stream.read(&mut self.buf).await?;
        if n > 0 {
            self.link.inject(&self.buf[..n]);
            self.device.on_bytes_available(n)?;
            self.flush().await?;
        }
        Ok(n)
    }

    /// Writes every queued command to the stream
    ///
    /// Bytes leave the driver only once the stream has accepted them, so a
    /// flush that is dropped part way resumes where it stopped on the next
    /// call.
    pub async fn flush(&mut self) -> Result<()> {
        use futures_util::AsyncWriteExt;

        self.device.on_write_ready()?;
        self.tx_pending.extend(self.link.take_written());
        if self.tx_pending.is_empty() {
            return Ok(());
        }
        while !self.tx_pending.is_empty() {
            let n = self.stream.write(&self.tx_pending).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            self.tx_pending.drain(..n);
        }
        self.stream.flush().await?;
        Ok(())
    }

    /// Bytes already drained from the device that the stream has not accepted
    pub fn pending_bytes(&self) -> usize {
        self.tx_pending.len()
    }

    /// Sends a raw command and flushes it to the stream
    pub async fn send_command(&mut self, command: impl AsRef<[u8]>) -> Result<()> {
        self.device.send_command(command)?;
        self.flush().await
    }

    /// Sends a typed request and flushes it to the stream
    pub async fn send_request(&mut self, request: &impl NmeaRequest) -> Result<()> {
        self.device.send_request(request)?;
        self.flush().await
    }

    /// Fires the watchdog timer if its period has elapsed
    pub fn tick(&mut self) {
        if let Some(id) = self.ticker.poll(self.scheduler.armed(), Instant::now()) {
            self.device.on_timer(id);
        }
    }

    /// Destroys the device and returns the stream
    pub fn close(self) -> Stream {
        self.device.destroy();
        self.stream
    }
}

#[cfg(feature = "tokio")]
impl<Stream> AsyncDriver<Stream>
where
    Stream: futures_io::AsyncRead + futures_io::AsyncWrite + Unpin,
{
    /// Pumps the stream until it closes, firing the watchdog on schedule
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// future loses no outbound bytes; a later [`flush`](Self::flush) picks
    /// them up.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let deadline = self
                .ticker
                .deadline(self.scheduler.armed(), Instant::now());

            let step = async {
                // leftovers from a write the deadline cut short
                self.flush().await?;
                self.pump().await
            };
            let read = match deadline {
                Some(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    tokio::time::timeout_at(deadline, step).await.ok()
                }
                None => Some(step.await),
            };

            match read {
                Some(Ok(0)) => {
                    tracing::info!("Stream for {} closed", self.device.transport_id());
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => {}
            }
            self.tick();
        }
    }
}

#[cfg(feature = "tokio")]
impl AsyncDriver<tokio_util::compat::Compat<tokio::net::TcpStream>> {
    /// Connects to an NMEA-over-TCP source
    ///
    /// The device is bound under the transport id `tcp://<peer address>`.
    ///
    /// # Arguments
    /// * `addr` - Socket address of the source (e.g., "127.0.0.1:10110")
    pub async fn connect<A: tokio::net::ToSocketAddrs>(
        addr: A,
        config: DeviceConfig,
        sink: impl EventSink + 'static,
    ) -> Result<Self> {
        use tokio_util::compat::TokioAsyncReadCompatExt;

        let stream = tokio::net::TcpStream::connect(addr).await?;
        let transport_id = format!("tcp://{}", stream.peer_addr()?);
        tracing::info!("Connected to {}", transport_id);
        AsyncDriver::open(stream.compat(), &transport_id, config, sink)
    }
}
