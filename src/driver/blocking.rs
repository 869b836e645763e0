//! Blocking (synchronous) driver
//!
//! Same job as [`AsyncDriver`](super::AsyncDriver) for plain `std::io`
//! streams. Give the stream a read timeout shorter than the watchdog period,
//! otherwise the timer can only fire when data arrives.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use super::{READ_CHUNK, Ticker};
use crate::Result;
use crate::config::DeviceConfig;
use crate::device::{Device, EventSink};
use crate::protocol::NmeaRequest;
use crate::timer::SharedScheduler;
use crate::transport::MemoryTransport;

/// Read timeout applied by [`Driver::connect`]
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drives a [`Device`] over a blocking byte stream
///
/// # Type Parameters
/// * `Stream` - The underlying I/O stream type (e.g., TcpStream)
#[derive(Debug)]
pub struct Driver<Stream> {
    stream: Stream,
    device: Device,
    link: MemoryTransport,
    scheduler: SharedScheduler,
    ticker: Ticker,
    buf: Vec<u8>,
    tx_pending: Vec<u8>,
}

impl<Stream> Driver<Stream>
where
    Stream: Read + Write,
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

        Ok(Driver {
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

    /// Reads once from the stream, processes what arrived and fires the timer
    ///
    /// A read timeout counts as an empty read. Returns `false` once the
    /// stream has reached end of file.
    pub fn pump(&mut self) -> Result<bool> {
        let open = match self.stream.read(&mut self.buf) {
            Ok(0) => false,
            Ok(n) => {
                self.link.inject(&self.buf[..n]);
                self.device.on_bytes_available(n)?;
                self.flush()?;
                true
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                true
            }
            Err(e) => return Err(e.into()),
        };
        self.tick();
        Ok(open)
    }

    /// Pumps until the stream closes
    pub fn run(&mut self) -> Result<()> {
        while self.pump()? {}
        tracing::info!("Stream for {} closed", self.device.transport_id());
        Ok(())
    }

    /// Writes every queued command to the stream
    ///
    /// On a write error the bytes the stream did not accept are kept and
    /// retried by the next flush.
    pub fn flush(&mut self) -> Result<()> {
        self.device.on_write_ready()?;
        self.tx_pending.extend(self.link.take_written());
        if self.tx_pending.is_empty() {
            return Ok(());
        }
        while !self.tx_pending.is_empty() {
            match self.stream.write(&self.tx_pending) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => {
                    self.tx_pending.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Bytes already drained from the device that the stream has not accepted
    pub fn pending_bytes(&self) -> usize {
        self.tx_pending.len()
    }

    pub fn send_command(&mut self, command: impl AsRef<[u8]>) -> Result<()> {
        self.device.send_command(command)?;
        self.flush()
    }

    pub fn send_request(&mut self, request: &impl NmeaRequest) -> Result<()> {
        self.device.send_request(request)?;
        self.flush()
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

impl Driver<TcpStream> {
    /// Connects to an NMEA-over-TCP source
    ///
    /// The device is bound under the transport id `tcp://<peer address>` and
    /// the socket gets a [`POLL_INTERVAL`] read timeout.
    ///
    /// # Example
    /// ```no_run
    /// # use nmea_receiver::config::DeviceConfig;
    /// # use nmea_receiver::device::{Device, Event};
    /// # use nmea_receiver::driver::blocking::Driver;
    /// let mut driver = Driver::connect(
    ///     "127.0.0.1:10110",
    ///     DeviceConfig::default(),
    ///     |_: &Device, event: Event| println!("{:?}", event),
    /// )
    /// .unwrap();
    /// driver.run().unwrap();
    /// ```
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        config: DeviceConfig,
        sink: impl EventSink + 'static,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(POLL_INTERVAL))?;
        let transport_id = format!("tcp://{}", stream.peer_addr()?);
        tracing::info!("Connected to {}", transport_id);
        Self::open(stream, &transport_id, config, sink)
    }
}
