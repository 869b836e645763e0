//! The receiver device: framing, routing, caches and events
//!
//! A [`Device`] owns everything attached to one receiver link: the receive
//! framer, the outbound command queue, the reading caches, the fix and
//! connection state machines, and the event sink. The host drives it by
//! calling three hooks, one at a time:
//!
//! - [`Device::on_bytes_available`] when the transport has data to read
//! - [`Device::on_write_ready`] when the transport can accept more bytes
//! - [`Device::on_timer`] when the watchdog timer fires
//!
//! Nothing here blocks or spawns; every event is delivered synchronously
//! from inside one of these hooks.
//!
//! # Example
//!
//! ```
//! use nmea_receiver::config::DeviceConfig;
//! use nmea_receiver::device::{Device, Event};
//! use nmea_receiver::transport::MemoryTransport;
//!
//! # fn main() -> nmea_receiver::Result<()> {
//! let link = MemoryTransport::new();
//! let mut device = Device::create(
//!     "doc-uart1",
//!     DeviceConfig::default(),
//!     link.clone(),
//!     |device: &Device, event: Event| {
//!         if event == Event::LocationUpdate {
//!             let (location, _age) = device.get_location();
//!             println!("at {}, {}", location.latitude, location.longitude);
//!         }
//!     },
//! )?;
//!
//! link.inject(b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n");
//! device.on_bytes_available(link.rx_available())?;
//! assert!(device.get_location().1.is_some());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::Result;
use crate::config::DeviceConfig;
use crate::error::GpsError;
use crate::framer::LineFramer;
use crate::protocol::nmea::NmeaDecoder;
use crate::protocol::types::{Gga, Rmc};
use crate::protocol::{NmeaRequest, RawLine, Sentence, SentenceDecoder};
use crate::timer::{Clock, MonotonicClock, Scheduler, SharedScheduler, TimerId};
use crate::transport::{Transport, TransportBinding};

/// Latest-value caches
pub mod cache;
/// Event tags and sinks
pub mod event;
/// Outbound command queue
pub mod transmit;
/// Fix and connection state machines
pub mod watchdog;

pub use cache::{DateTimeReading, LocationReading, ReadingCache, ReadingKind, SatelliteReading};
pub use event::{Event, EventRecorder, EventSink};
pub use transmit::CommandQueue;
pub use watchdog::{ConnectionState, ConnectionWatchdog, FixState};

/// Century added to the two-digit RMC year
///
/// Fixed rather than inferred: RMC dates from 2100 onwards will be reported
/// as 20xx.
pub const CENTURY: i32 = 2000;

/// Upper bound on bytes read per `on_bytes_available` call
const MAX_READ_CHUNK: usize = 4096;

/// Extension hook for vendor `$P...` sentences
///
/// Receives the raw line and exclusive access to the device, so it can
/// queue replies or publish readings of its own. Closures of the form
/// `|line: &RawLine, device: &mut Device| { ... }` implement this trait.
pub trait ProprietaryHandler: Send {
    fn handle(&mut self, line: &RawLine, device: &mut Device);
}

impl<F> ProprietaryHandler for F
where
    F: FnMut(&RawLine, &mut Device) + Send,
{
    fn handle(&mut self, line: &RawLine, device: &mut Device) {
        self(line, device)
    }
}

/// Configures and creates a [`Device`]
///
/// Defaults: [`DeviceConfig::default`], no event sink, [`NmeaDecoder`],
/// [`MonotonicClock`] and a fresh [`SharedScheduler`].
pub struct DeviceBuilder {
    transport_id: String,
    transport: Box<dyn Transport>,
    config: DeviceConfig,
    sink: Option<Box<dyn EventSink>>,
    proprietary: Option<Box<dyn ProprietaryHandler>>,
    decoder: Box<dyn SentenceDecoder>,
    clock: Box<dyn Clock>,
    scheduler: Box<dyn Scheduler>,
}

impl DeviceBuilder {
    pub fn config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn proprietary_handler(mut self, handler: impl ProprietaryHandler + 'static) -> Self {
        self.proprietary = Some(Box::new(handler));
        self
    }

    pub fn decoder(mut self, decoder: impl SentenceDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    /// Binds the transport id, configures the transport and emits `Initialized`
    ///
    /// Fails if the id is already bound or the transport rejects its
    /// configuration; nothing stays bound after a failure.
    pub fn build(self) -> Result<Device> {
        let DeviceBuilder {
            transport_id,
            mut transport,
            config,
            sink,
            proprietary,
            decoder,
            clock,
            scheduler,
        } = self;

        let binding = TransportBinding::acquire(&transport_id)?;
        if let Err(err) = transport.configure(&config.transport) {
            tracing::warn!("Transport {} rejected configuration: {}", transport_id, err);
            return Err(GpsError::TransportConfig(err.to_string()));
        }

        let mut device = Device {
            binding,
            transport,
            framer: LineFramer::new(config.rx_buffer_limit, config.overflow_policy),
            commands: CommandQueue::new(),
            cache: ReadingCache::new(),
            watchdog: ConnectionWatchdog::new(),
            sink,
            proprietary,
            proprietary_generation: 0,
            decoder,
            clock,
            scheduler,
            read_buf: Vec::new(),
            config,
        };

        let t = &device.config.transport;
        tracing::info!(
            "Transport {} initialized {},{}{:?}{}",
            device.binding.id(),
            t.baud_rate,
            t.data_bits,
            t.parity,
            t.stop_bits
        );

        device.emit(Event::Initialized);
        if let Some(timeout) = device.config.watchdog_timeout {
            device.arm_watchdog(timeout);
        }
        Ok(device)
    }
}

/// One receiver attached to one transport
pub struct Device {
    binding: TransportBinding,
    transport: Box<dyn Transport>,
    config: DeviceConfig,
    framer: LineFramer,
    commands: CommandQueue,
    cache: ReadingCache,
    watchdog: ConnectionWatchdog,
    sink: Option<Box<dyn EventSink>>,
    proprietary: Option<Box<dyn ProprietaryHandler>>,
    // bumped on every set/clear so dispatch can tell if the handler changed itself
    proprietary_generation: u64,
    decoder: Box<dyn SentenceDecoder>,
    clock: Box<dyn Clock>,
    scheduler: Box<dyn Scheduler>,
    read_buf: Vec<u8>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("transport_id", &self.binding.id())
            .field("config", &self.config)
            .field("connection", &self.watchdog.state())
            .field("fix", &self.fix_state())
            .field("pending_rx", &self.framer.pending().len())
            .field("pending_tx", &self.commands.len())
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Starts building a device on `transport`, bound under `transport_id`
    pub fn builder(transport_id: &str, transport: impl Transport + 'static) -> DeviceBuilder {
        DeviceBuilder {
            transport_id: transport_id.to_string(),
            transport: Box::new(transport),
            config: DeviceConfig::default(),
            sink: None,
            proprietary: None,
            decoder: Box::new(NmeaDecoder::new()),
            clock: Box::new(MonotonicClock::new()),
            scheduler: Box::new(SharedScheduler::new()),
        }
    }

    /// Creates a device with the default decoder, clock and scheduler
    ///
    /// # Returns
    /// * `Ok(device)` - transport configured, `Initialized` already emitted
    /// * `Err(GpsError::TransportInUse)` - another device holds `transport_id`
    /// * `Err(GpsError::TransportConfig)` - the transport rejected `config.transport`
    pub fn create(
        transport_id: &str,
        config: DeviceConfig,
        transport: impl Transport + 'static,
        sink: impl EventSink + 'static,
    ) -> Result<Device> {
        Device::builder(transport_id, transport)
            .config(config)
            .event_sink(sink)
            .build()
    }

    /// Cancels the watchdog and releases the transport binding
    pub fn destroy(self) {
        tracing::info!("Destroying device on {}", self.binding.id());
        drop(self);
    }

    pub fn transport_id(&self) -> &str {
        self.binding.id()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn now(&self) -> Duration {
        self.clock.uptime()
    }

    /// Latest location and its age; age is `None` if no valid RMC has arrived
    pub fn get_location(&self) -> (LocationReading, Option<Duration>) {
        self.cache.location(self.now())
    }

    /// Latest UTC date/time and its age; age is `None` if never updated
    pub fn get_datetime(&self) -> (DateTimeReading, Option<Duration>) {
        self.cache.datetime(self.now())
    }

    /// Latest satellite reading and its age; age is `None` if no GGA has arrived
    pub fn get_satellites(&self) -> (SatelliteReading, Option<Duration>) {
        self.cache.satellites(self.now())
    }

    /// Fix quality from the latest GGA and its age
    pub fn get_fix_quality(&self) -> (u8, Option<Duration>) {
        let (reading, age) = self.get_satellites();
        (reading.fix_quality, age)
    }

    /// Current UTC estimate from the latest RMC advanced by its age
    ///
    /// Returns the estimate and the age added to it, or `None` if no valid
    /// RMC has arrived yet.
    pub fn get_wallclock_now(&self) -> Option<(DateTime<Utc>, Duration)> {
        self.cache.wallclock(self.now())
    }

    /// Age of one reading kind, `None` if it was never updated
    pub fn age(&self, kind: ReadingKind) -> Option<Duration> {
        self.cache.age(kind, self.now())
    }

    pub fn fix_state(&self) -> FixState {
        FixState::from_quality(self.cache.satellites(self.now()).0.fix_quality)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.watchdog.state()
    }

    /// The armed watchdog timeout, `None` while disabled
    pub fn watchdog_timeout(&self) -> Option<Duration> {
        self.watchdog.timeout()
    }

    /// Outbound bytes not yet accepted by the transport
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn set_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_event_sink(&mut self) {
        self.sink = None;
    }

    /// Registers the handler for proprietary sentences, replacing any previous one
    pub fn set_proprietary_handler(&mut self, handler: impl ProprietaryHandler + 'static) {
        self.proprietary = Some(Box::new(handler));
        self.proprietary_generation += 1;
    }

    pub fn clear_proprietary_handler(&mut self) {
        self.proprietary = None;
        self.proprietary_generation += 1;
    }

    /// Queues a command (CR LF appended) and writes as much as the transport accepts
    ///
    /// The command stays queued if the write fails; the error is returned
    /// and the next [`on_write_ready`](Self::on_write_ready) retries.
    pub fn send_command(&mut self, command: impl AsRef<[u8]>) -> Result<()> {
        self.commands.enqueue(command.as_ref())?;
        self.on_write_ready()?;
        Ok(())
    }

    /// Renders and sends a typed request
    pub fn send_request(&mut self, request: &impl NmeaRequest) -> Result<()> {
        self.send_command(request.to_command())
    }

    /// Sets the watchdog timeout in milliseconds; 0 disables it
    ///
    /// Negative values are rejected with [`GpsError::InvalidTimeout`].
    pub fn set_watchdog_timeout(&mut self, millis: i64) -> Result<()> {
        let millis = u64::try_from(millis).map_err(|_| GpsError::InvalidTimeout(millis))?;
        self.arm_watchdog(Duration::from_millis(millis));
        Ok(())
    }

    fn arm_watchdog(&mut self, timeout: Duration) {
        let now = self.now();
        self.watchdog
            .set_timeout(timeout, now, self.scheduler.as_mut());
        match self.watchdog.timeout() {
            Some(timeout) => tracing::info!("Watchdog armed: {:?}", timeout),
            None => tracing::info!("Watchdog disabled"),
        }
    }

    /// Reconfigures the transport for a new baud rate
    ///
    /// On success the link is treated as disconnected until the next line,
    /// which then reports `Connected`. On failure the stored configuration is
    /// left unchanged.
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        let mut transport_config = self.config.transport.clone();
        transport_config.baud_rate = baud_rate;

        if let Err(err) = self.transport.configure(&transport_config) {
            tracing::warn!("Baud rate {} rejected: {}", baud_rate, err);
            return Err(GpsError::TransportConfig(err.to_string()));
        }
        self.config.transport = transport_config;
        self.watchdog.reset();
        self.framer.clear();
        Ok(())
    }

    /// Reads up to `byte_count` bytes, then frames and dispatches every complete line
    ///
    /// Returns the number of bytes read. A transport read error is returned
    /// only after the bytes already read have been processed. Sentence
    /// problems never surface as errors.
    pub fn on_bytes_available(&mut self, byte_count: usize) -> Result<usize> {
        let mut total = 0;
        let mut remaining = byte_count;
        let mut buf = std::mem::take(&mut self.read_buf);
        buf.resize(byte_count.clamp(1, MAX_READ_CHUNK), 0);

        let result = loop {
            if remaining == 0 {
                break Ok(total);
            }
            let want = remaining.min(buf.len());
            match self.transport.read(&mut buf[..want]) {
                Ok(0) => break Ok(total),
                Ok(n) => {
                    total += n;
                    remaining -= n.min(remaining);
                    self.feed(&buf[..n]);
                }
                Err(err) => {
                    tracing::warn!("Read from {} failed: {}", self.binding.id(), err);
                    break Err(GpsError::IoError(err));
                }
            }
        };

        self.read_buf = buf;
        result
    }

    /// Frames and dispatches bytes the host has already read
    pub fn feed(&mut self, bytes: &[u8]) {
        self.framer.push(bytes);
        while let Some(line) = self.framer.next_line() {
            self.process_line(line);
        }
    }

    /// Writes queued command bytes up to the transport's current window
    ///
    /// Returns the number of bytes written. Remaining bytes stay queued for
    /// the next call.
    pub fn on_write_ready(&mut self) -> Result<usize> {
        self.commands.drain(self.transport.as_mut()).map_err(|err| {
            tracing::warn!("Write to {} failed: {}", self.binding.id(), err);
            GpsError::IoError(err)
        })
    }

    /// Watchdog timer callback
    ///
    /// Emits `TimedOut` if the link was connected and silent for longer
    /// than the timeout. Ticks from a cancelled timer are ignored.
    pub fn on_timer(&mut self, id: TimerId) {
        let now = self.now();
        if self.watchdog.on_timer(id, now) {
            tracing::info!("No sentence from {} within {:?}", self.binding.id(), self.watchdog.timeout());
            self.emit(Event::TimedOut);
        }
    }

    fn process_line(&mut self, line: RawLine) {
        let now = self.now();
        tracing::debug!("RX line {:?}", String::from_utf8_lossy(line.body()));

        if self.watchdog.line_received(now) {
            tracing::info!("Receiver connected on {}", self.binding.id());
            self.emit(Event::Connected);
        }
        self.dispatch(&line, now);
    }

    /// Routes one framed line to its handler
    fn dispatch(&mut self, line: &RawLine, now: Duration) {
        if line.is_blank() {
            return;
        }
        let Some(text) = line.as_str() else {
            tracing::debug!("Dropping non UTF-8 line");
            return;
        };

        match self.decoder.decode(text) {
            Sentence::PrimaryFix(rmc) => self.handle_rmc(rmc, now),
            Sentence::SecondaryFix(gga) => self.handle_gga(gga, now),
            Sentence::Proprietary => self.handle_proprietary(line),
            Sentence::Unrecognized => tracing::debug!("Sentence not tracked"),
            Sentence::Malformed => tracing::debug!("Failed to parse sentence"),
        }
    }

    fn handle_rmc(&mut self, rmc: Rmc, now: Duration) {
        if !rmc.valid {
            tracing::debug!("RMC without fix, keeping previous reading");
            return;
        }
        let (Some(latitude), Some(longitude), Some(date), Some(time)) =
            (rmc.latitude, rmc.longitude, rmc.date, rmc.time)
        else {
            tracing::debug!("RMC marked valid but incomplete, ignoring");
            return;
        };
        let Some(date) = NaiveDate::from_ymd_opt(
            CENTURY + i32::from(date.year),
            u32::from(date.month),
            u32::from(date.day),
        ) else {
            tracing::debug!("RMC date {:?} is not a calendar date", date);
            return;
        };

        let location = LocationReading {
            latitude,
            longitude,
            speed: rmc.speed,
            course: rmc.course,
            variation: rmc.variation,
        };
        self.cache
            .update_fix(location, DateTimeReading { date, time }, now);

        self.emit(Event::LocationUpdate);
        self.emit(Event::DateTimeUpdate);
    }

    fn handle_gga(&mut self, gga: Gga, now: Duration) {
        let reading = SatelliteReading {
            satellites_tracked: gga.satellites_tracked,
            fix_quality: gga.fix_quality,
            hdop: gga.hdop,
            altitude: gga.altitude,
        };
        let previous = self.cache.update_satellites(reading, now);
        self.emit(Event::SatelliteUpdate);

        if let Some(edge) = watchdog::fix_transition(previous, gga.fix_quality) {
            tracing::info!("{:?} (quality {} -> {})", edge, previous, gga.fix_quality);
            self.emit(edge);
        }
    }

    fn handle_proprietary(&mut self, line: &RawLine) {
        match self.proprietary.take() {
            Some(mut handler) => {
                let generation = self.proprietary_generation;
                handler.handle(line, self);
                // a handler that replaced or cleared itself stays replaced
                if self.proprietary_generation == generation {
                    self.proprietary = Some(handler);
                }
            }
            None => {
                tracing::debug!("Proprietary sentence without handler, discarding");
                self.emit(Event::UnknownSentence);
            }
        }
    }

    fn emit(&mut self, event: Event) {
        tracing::trace!("Event {:?}", event);
        if let Some(mut sink) = self.sink.take() {
            sink.on_event(self, event);
            self.sink = Some(sink);
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.watchdog.cancel(self.scheduler.as_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::with_checksum;
    use crate::timer::ManualClock;
    use crate::transport::MemoryTransport;

    struct Harness {
        device: Device,
        link: MemoryTransport,
        clock: ManualClock,
        events: EventRecorder,
    }

    fn harness(id: &str) -> Harness {
        let link = MemoryTransport::new();
        let clock = ManualClock::new();
        let events = EventRecorder::new();
        let device = Device::builder(id, link.clone())
            .clock(clock.clone())
            .event_sink(events.clone())
            .build()
            .unwrap();
        events.drain();
        Harness {
            device,
            link,
            clock,
            events,
        }
    }

    impl Harness {
        fn send(&mut self, payload: &str) {
            let line = format!("{}\r\n", with_checksum(payload));
            self.link.inject(line.as_bytes());
            self.device.on_bytes_available(line.len()).unwrap();
        }
    }

    const RMC: &str = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
    const RMC_VOID: &str = "GPRMC,123520,V,,,,,,,230394,,";

    #[test]
    fn test_rmc_updates_location_and_datetime() {
        let mut h = harness("device-test-rmc");
        h.clock.advance(Duration::from_secs(3));
        h.send(RMC);

        assert_eq!(
            h.events.drain(),
            vec![Event::Connected, Event::LocationUpdate, Event::DateTimeUpdate]
        );

        h.clock.advance(Duration::from_millis(250));
        let (location, age) = h.device.get_location();
        assert!((location.latitude - 48.1173).abs() < 1e-6);
        assert_eq!(location.speed, Some(22.4));
        assert_eq!(age, Some(Duration::from_millis(250)));

        let (datetime, age) = h.device.get_datetime();
        assert_eq!(datetime.date, NaiveDate::from_ymd_opt(2094, 3, 23).unwrap());
        assert_eq!(age, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_void_rmc_keeps_previous_reading() {
        let mut h = harness("device-test-void");
        h.send(RMC);
        let before = h.device.get_location().0;
        h.events.drain();

        h.clock.advance(Duration::from_secs(1));
        h.send(RMC_VOID);
        assert!(h.events.drain().is_empty());
        assert_eq!(h.device.get_location(), (before, Some(Duration::from_secs(1))));
    }

    #[test]
    fn test_void_rmc_before_any_fix_leaves_cache_empty() {
        let mut h = harness("device-test-void-first");
        h.send(RMC_VOID);
        assert_eq!(h.device.get_location().1, None);
        assert_eq!(h.device.get_wallclock_now(), None);
    }

    #[test]
    fn test_unknown_proprietary_without_handler() {
        let mut h = harness("device-test-prop");
        h.send("PMTK001,220,3");
        assert_eq!(h.events.drain(), vec![Event::Connected, Event::UnknownSentence]);
    }

    #[test]
    fn test_proprietary_handler_can_reply() {
        let mut h = harness("device-test-prop-reply");
        h.device
            .set_proprietary_handler(|line: &RawLine, device: &mut Device| {
                assert!(line.as_bytes().ends_with(b"\r\n"));
                device.send_command("$PMTK605*31").unwrap();
            });
        h.send("PMTK010,001");
        assert_eq!(h.link.take_written(), b"$PMTK605*31\r\n");
        assert_eq!(h.events.drain(), vec![Event::Connected]);

        // handler stays registered
        h.send("PMTK010,001");
        assert_eq!(h.link.take_written(), b"$PMTK605*31\r\n");
    }

    #[test]
    fn test_proprietary_handler_can_clear_itself() {
        let mut h = harness("device-test-prop-once");
        h.device
            .set_proprietary_handler(|_: &RawLine, device: &mut Device| {
                device.clear_proprietary_handler();
            });
        h.send("PMTK010,001");
        assert_eq!(h.events.drain(), vec![Event::Connected]);

        h.send("PMTK010,001");
        assert_eq!(h.events.drain(), vec![Event::UnknownSentence]);
    }

    #[test]
    fn test_proprietary_handler_can_replace_itself() {
        let mut h = harness("device-test-prop-swap");
        h.device
            .set_proprietary_handler(|_: &RawLine, device: &mut Device| {
                device.set_proprietary_handler(|_: &RawLine, device: &mut Device| {
                    device.send_command("$PMTK605*31").unwrap();
                });
            });
        h.send("PMTK010,001");
        assert!(h.link.take_written().is_empty());

        h.send("PMTK010,001");
        assert_eq!(h.link.take_written(), b"$PMTK605*31\r\n");
    }

    #[test]
    fn test_malformed_and_blank_lines_are_silent() {
        let mut h = harness("device-test-malformed");
        h.link.inject(b"\r\n   \r\n$GPGGA,bad*00\r\n\xff\xfe\r\n$GPGSV,1,1,00\r\n");
        h.device.on_bytes_available(64).unwrap();
        assert_eq!(h.events.drain(), vec![Event::Connected]);
        assert_eq!(h.device.get_satellites().1, None);
    }

    #[test]
    fn test_malformed_line_does_not_block_later_sentences() {
        let mut h = harness("device-test-malformed-then-valid");
        let gga = format!(
            "{}\r\n",
            with_checksum("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,")
        );
        let mut batch = b"$GPGGA,bad*00\r\n".to_vec();
        batch.extend_from_slice(gga.as_bytes());
        h.link.inject(&batch);
        h.device.on_bytes_available(batch.len()).unwrap();

        assert_eq!(
            h.events.drain(),
            vec![Event::Connected, Event::SatelliteUpdate, Event::FixAcquired]
        );
        assert_eq!(h.device.get_satellites().0.satellites_tracked, 8);
        assert_eq!(h.device.get_fix_quality(), (1, Some(Duration::ZERO)));
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let mut h = harness("device-test-timeout");
        assert!(matches!(
            h.device.set_watchdog_timeout(-1),
            Err(GpsError::InvalidTimeout(-1))
        ));
        assert_eq!(h.device.watchdog_timeout(), None);
        h.device.set_watchdog_timeout(500).unwrap();
        assert_eq!(h.device.watchdog_timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_embedded_terminator_command_rejected() {
        let mut h = harness("device-test-embedded");
        assert!(h.device.send_command("$A\r\n$B").is_err());
        assert_eq!(h.device.pending_commands(), 0);
    }
}
