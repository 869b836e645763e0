use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use nmea_receiver::config::DeviceConfig;
use nmea_receiver::device::{
    ConnectionState, Device, Event, EventRecorder, FixState, LocationReading, ReadingKind,
};
use nmea_receiver::error::GpsError;
use nmea_receiver::framer::OverflowPolicy;
use nmea_receiver::protocol::with_checksum;
use nmea_receiver::timer::{ManualClock, SharedScheduler};
use nmea_receiver::transport::MemoryTransport;

const RMC: &str = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
const RMC_VOID: &str = "GPRMC,123520,V,,,,,,,230394,,";
const GGA_FIX: &str = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
const GGA_DGPS: &str = "GPGGA,123520,4807.038,N,01131.000,E,2,09,0.8,545.1,M,46.9,M,,";
const GGA_NOFIX: &str = "GPGGA,123521,,,,,0,00,,,M,,M,,";

fn sentence(payload: &str) -> Vec<u8> {
    format!("{}\r\n", with_checksum(payload)).into_bytes()
}

struct Rig {
    device: Device,
    link: MemoryTransport,
    clock: ManualClock,
    scheduler: SharedScheduler,
    events: EventRecorder,
}

impl Rig {
    fn new(id: &str) -> Self {
        Self::with_config(id, DeviceConfig::default())
    }

    fn with_config(id: &str, config: DeviceConfig) -> Self {
        let link = MemoryTransport::new();
        let clock = ManualClock::new();
        let scheduler = SharedScheduler::new();
        let events = EventRecorder::new();
        let device = Device::builder(id, link.clone())
            .config(config)
            .clock(clock.clone())
            .scheduler(scheduler.clone())
            .event_sink(events.clone())
            .build()
            .unwrap();
        Rig {
            device,
            link,
            clock,
            scheduler,
            events,
        }
    }

    fn receive(&mut self, bytes: &[u8]) {
        self.link.inject(bytes);
        self.device.on_bytes_available(bytes.len()).unwrap();
    }

    fn fire_timer(&mut self) {
        let (id, _) = self.scheduler.armed().unwrap();
        self.device.on_timer(id);
    }
}

#[test]
fn initialized_is_first_event() {
    let rig = Rig::new("rx-initialized");
    assert_eq!(rig.events.drain(), vec![Event::Initialized]);
    assert_eq!(rig.device.connection_state(), ConnectionState::Disconnected);
    assert_eq!(rig.device.transport_id(), "rx-initialized");
}

#[test]
fn readings_report_never_updated() {
    let rig = Rig::new("rx-never-updated");
    rig.clock.advance(Duration::from_secs(60));

    assert_eq!(rig.device.get_location().1, None);
    assert_eq!(rig.device.get_datetime().1, None);
    assert_eq!(rig.device.get_satellites().1, None);
    assert_eq!(rig.device.get_fix_quality(), (0, None));
    assert_eq!(rig.device.get_wallclock_now(), None);
    assert_eq!(rig.device.fix_state(), FixState::NoFix);
}

#[test]
fn framing_is_chunk_invariant() {
    let mut stream = Vec::new();
    for payload in [RMC, GGA_FIX, "PMTK001,220,3", "GPGSV,3,1,11,03,03,111,00", GGA_NOFIX] {
        stream.extend_from_slice(&sentence(payload));
    }
    stream.extend_from_slice(b"$GPRMC,1235");

    let expected = vec![
        Event::Connected,
        Event::LocationUpdate,
        Event::DateTimeUpdate,
        Event::SatelliteUpdate,
        Event::FixAcquired,
        Event::UnknownSentence,
        Event::SatelliteUpdate,
        Event::FixLost,
    ];

    for size in 1..=stream.len() {
        let mut rig = Rig::new(&format!("rx-chunk-{}", size));
        rig.events.drain();
        for chunk in stream.chunks(size) {
            rig.receive(chunk);
        }

        assert_eq!(rig.events.drain(), expected, "chunk size {}", size);
        let (location, _) = rig.device.get_location();
        assert!((location.longitude - 11.516_666).abs() < 1e-5);
        assert_eq!(rig.device.get_fix_quality().0, 0);
    }
}

#[test]
fn rmc_events_in_order_and_sink_sees_fresh_data() {
    let seen: Arc<Mutex<Option<LocationReading>>> = Arc::default();
    let slot = seen.clone();
    let link = MemoryTransport::new();
    let mut device = Device::create(
        "rx-sink-requery",
        DeviceConfig::default(),
        link.clone(),
        move |device: &Device, event: Event| {
            if event == Event::LocationUpdate {
                *slot.lock().unwrap() = Some(device.get_location().0);
            }
        },
    )
    .unwrap();

    let line = sentence(RMC);
    link.inject(&line);
    device.on_bytes_available(line.len()).unwrap();

    let location = seen.lock().unwrap().take().unwrap();
    assert!((location.latitude - 48.1173).abs() < 1e-9);
    assert_eq!(location.course, Some(84.4));
    assert_eq!(location.variation, Some(-3.1));
}

#[test]
fn void_rmc_preserves_cached_fix() {
    let mut rig = Rig::new("rx-void-rmc");
    rig.receive(&sentence(RMC));
    let (location, _) = rig.device.get_location();
    let (datetime, _) = rig.device.get_datetime();
    rig.events.drain();

    rig.clock.advance(Duration::from_secs(2));
    rig.receive(&sentence(RMC_VOID));

    assert!(rig.events.drain().is_empty());
    assert_eq!(
        rig.device.get_location(),
        (location, Some(Duration::from_secs(2)))
    );
    assert_eq!(
        rig.device.get_datetime(),
        (datetime, Some(Duration::from_secs(2)))
    );
}

#[test]
fn fix_edges_fire_once() {
    let mut rig = Rig::new("rx-fix-edges");
    rig.receive(&sentence(GGA_NOFIX));
    rig.receive(&sentence(GGA_FIX));
    rig.receive(&sentence(GGA_DGPS));
    rig.receive(&sentence(GGA_DGPS));
    rig.receive(&sentence(GGA_NOFIX));
    rig.receive(&sentence(GGA_NOFIX));

    assert_eq!(rig.events.count(Event::SatelliteUpdate), 6);
    assert_eq!(rig.events.count(Event::FixAcquired), 1);
    assert_eq!(rig.events.count(Event::FixLost), 1);

    let events = rig.events.drain();
    let acquired = events.iter().position(|e| *e == Event::FixAcquired).unwrap();
    let lost = events.iter().position(|e| *e == Event::FixLost).unwrap();
    assert!(acquired < lost);
    assert_eq!(events[acquired - 1], Event::SatelliteUpdate);
    assert_eq!(rig.device.fix_state(), FixState::NoFix);
}

#[test]
fn satellite_reading_fields() {
    let mut rig = Rig::new("rx-satellites");
    rig.clock.advance(Duration::from_secs(5));
    rig.receive(&sentence(GGA_FIX));
    rig.clock.advance(Duration::from_millis(300));

    let (sats, age) = rig.device.get_satellites();
    assert_eq!(sats.satellites_tracked, 8);
    assert_eq!(sats.fix_quality, 1);
    assert_eq!(sats.hdop, Some(0.9));
    assert_eq!(sats.altitude, Some(545.4));
    assert_eq!(age, Some(Duration::from_millis(300)));
    assert_eq!(rig.device.age(ReadingKind::Location), None);
}

#[test]
fn wallclock_advances_by_age() {
    let mut rig = Rig::new("rx-wallclock");
    rig.clock.advance(Duration::from_secs(10));
    rig.receive(&sentence(RMC));
    rig.clock.advance(Duration::from_millis(1500));

    let (now, age) = rig.device.get_wallclock_now().unwrap();
    assert_eq!(age, Duration::from_millis(1500));
    assert_eq!(
        now.naive_utc(),
        NaiveDate::from_ymd_opt(2094, 3, 23)
            .unwrap()
            .and_time(NaiveTime::from_hms_milli_opt(12, 35, 20, 500).unwrap())
    );
}

#[test]
fn watchdog_times_out_and_reconnects() {
    let config = DeviceConfig::default().with_watchdog_timeout(Duration::from_secs(1));
    let mut rig = Rig::with_config("rx-watchdog", config);
    assert_eq!(
        rig.scheduler.armed().map(|(_, period)| period),
        Some(Duration::from_secs(1))
    );

    rig.receive(&sentence(GGA_FIX));
    assert_eq!(rig.device.connection_state(), ConnectionState::Connected);

    rig.clock.advance(Duration::from_secs(1));
    rig.fire_timer();
    assert_eq!(rig.events.count(Event::TimedOut), 0);

    rig.clock.advance(Duration::from_millis(500));
    rig.fire_timer();
    rig.fire_timer();
    assert_eq!(rig.events.count(Event::TimedOut), 1);
    assert_eq!(rig.device.connection_state(), ConnectionState::Disconnected);

    rig.receive(&sentence(GGA_FIX));
    let events = rig.events.drain();
    assert_eq!(
        &events[events.len() - 3..],
        &[Event::TimedOut, Event::Connected, Event::SatelliteUpdate]
    );
    assert_eq!(events.iter().filter(|e| **e == Event::Connected).count(), 2);
}

#[test]
fn watchdog_disable_and_invalid_timeout() {
    let mut rig = Rig::new("rx-watchdog-disable");
    assert_eq!(rig.scheduler.armed(), None);

    rig.device.set_watchdog_timeout(200).unwrap();
    let (stale, _) = rig.scheduler.armed().unwrap();
    rig.receive(&sentence(RMC));

    rig.device.set_watchdog_timeout(0).unwrap();
    assert_eq!(rig.scheduler.armed(), None);
    rig.clock.advance(Duration::from_secs(10));
    rig.device.on_timer(stale);
    assert_eq!(rig.events.count(Event::TimedOut), 0);

    assert!(matches!(
        rig.device.set_watchdog_timeout(-5),
        Err(GpsError::InvalidTimeout(-5))
    ));
    assert_eq!(rig.device.watchdog_timeout(), None);
}

#[test]
fn command_drains_through_one_byte_window() {
    let mut rig = Rig::new("rx-one-byte-window");
    rig.link.set_write_window(1);

    rig.device.send_command("$CMD").unwrap();
    assert_eq!(rig.device.pending_commands(), 5);

    let mut calls = 0;
    while rig.device.pending_commands() > 0 {
        assert_eq!(rig.device.on_write_ready().unwrap(), 1);
        calls += 1;
    }
    assert_eq!(calls, 5);
    assert_eq!(rig.link.take_written(), b"$CMD\r\n");
    assert_eq!(rig.device.on_write_ready().unwrap(), 0);
}

#[test]
fn commands_keep_order_across_windows() {
    let mut rig = Rig::new("rx-command-order");
    rig.link.set_write_window(0);
    rig.device.send_command("$A").unwrap();
    rig.device.send_command(b"$B\r\n").unwrap();
    assert_eq!(rig.device.pending_commands(), 8);

    rig.link.set_write_window(3);
    rig.device.on_write_ready().unwrap();
    rig.link.set_write_window(usize::MAX);
    rig.device.on_write_ready().unwrap();
    assert_eq!(rig.link.take_written(), b"$A\r\n$B\r\n");
}

#[test]
fn transport_id_is_exclusive() {
    let first = Device::create(
        "rx-exclusive",
        DeviceConfig::default(),
        MemoryTransport::new(),
        EventRecorder::new(),
    )
    .unwrap();

    let err = Device::create(
        "rx-exclusive",
        DeviceConfig::default(),
        MemoryTransport::new(),
        EventRecorder::new(),
    )
    .unwrap_err();
    assert!(matches!(err, GpsError::TransportInUse(ref id) if id == "rx-exclusive"));

    first.destroy();
    Device::create(
        "rx-exclusive",
        DeviceConfig::default(),
        MemoryTransport::new(),
        EventRecorder::new(),
    )
    .unwrap();
}

#[test]
fn rejected_configuration_releases_transport() {
    let link = MemoryTransport::new();
    link.reject_configuration(true);
    let events = EventRecorder::new();

    let err = Device::create("rx-rejected", DeviceConfig::default(), link, events.clone())
        .unwrap_err();
    assert!(matches!(err, GpsError::TransportConfig(_)));
    assert!(events.drain().is_empty());

    Device::create(
        "rx-rejected",
        DeviceConfig::default(),
        MemoryTransport::new(),
        events.clone(),
    )
    .unwrap();
    assert_eq!(events.drain(), vec![Event::Initialized]);
}

#[test]
fn baud_rate_change() {
    let mut rig = Rig::new("rx-baud");
    rig.receive(&sentence(GGA_FIX));
    assert_eq!(rig.link.applied_config().unwrap().baud_rate, 9600);

    rig.device.set_baud_rate(115_200).unwrap();
    assert_eq!(rig.link.applied_config().unwrap().baud_rate, 115_200);
    assert_eq!(rig.device.config().transport.baud_rate, 115_200);
    assert_eq!(rig.device.connection_state(), ConnectionState::Disconnected);

    rig.events.drain();
    rig.receive(&sentence(GGA_FIX));
    assert_eq!(rig.events.drain(), vec![Event::Connected, Event::SatelliteUpdate]);

    rig.link.reject_configuration(true);
    assert!(matches!(
        rig.device.set_baud_rate(4800),
        Err(GpsError::TransportConfig(_))
    ));
    assert_eq!(rig.device.config().transport.baud_rate, 115_200);
    assert_eq!(rig.device.connection_state(), ConnectionState::Connected);
}

#[test]
fn overflow_resets_unterminated_tail() {
    let config = DeviceConfig::default().with_rx_buffer_limit(32, OverflowPolicy::Reset);
    let mut rig = Rig::with_config("rx-overflow", config);

    rig.receive(&[b'x'; 100]);
    assert!(rig.events.drain().iter().all(|e| *e == Event::Initialized));

    rig.receive(&sentence(GGA_FIX));
    assert_eq!(rig.events.drain(), vec![Event::Connected, Event::SatelliteUpdate, Event::FixAcquired]);
}

#[test]
fn sink_can_be_replaced_and_cleared() {
    let mut rig = Rig::new("rx-sink-swap");
    let other = EventRecorder::new();
    rig.device.set_event_sink(other.clone());
    rig.receive(&sentence(GGA_FIX));
    assert_eq!(rig.events.drain(), vec![Event::Initialized]);
    assert_eq!(other.count(Event::SatelliteUpdate), 1);

    rig.device.clear_event_sink();
    rig.receive(&sentence(GGA_NOFIX));
    assert_eq!(other.count(Event::FixLost), 0);
    assert_eq!(rig.device.get_fix_quality().0, 0);
}

#[test]
fn proprietary_without_handler_is_reported() {
    let mut rig = Rig::new("rx-proprietary");
    rig.events.drain();
    rig.receive(&sentence("PGRME,15.0,M,45.0,M,25.0,M"));
    assert_eq!(rig.events.drain(), vec![Event::Connected, Event::UnknownSentence]);

    let lines: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
    let sink = lines.clone();
    rig.device
        .set_proprietary_handler(move |line: &nmea_receiver::protocol::RawLine, _: &mut Device| {
            sink.lock().unwrap().push(line.body().to_vec());
        });
    rig.receive(&sentence("PGRME,15.0,M,45.0,M,25.0,M"));
    assert!(rig.events.drain().is_empty());
    assert_eq!(lines.lock().unwrap().len(), 1);
    assert!(lines.lock().unwrap()[0].starts_with(b"$PGRME,"));

    rig.device.clear_proprietary_handler();
    rig.receive(&sentence("PGRME,15.0,M,45.0,M,25.0,M"));
    assert_eq!(rig.events.drain(), vec![Event::UnknownSentence]);
}

#[cfg(feature = "pmtk")]
#[test]
fn pmtk_acknowledgements() {
    use nmea_receiver::protocol::pmtk::{
        AckFlag, PmtkAck, PmtkCommand, PmtkHandler, PmtkSentence, SystemMessage,
    };

    let mut rig = Rig::new("rx-pmtk");
    let replies: Arc<Mutex<Vec<PmtkSentence>>> = Arc::default();
    let sink = replies.clone();
    rig.device
        .set_proprietary_handler(PmtkHandler::new(move |reply: PmtkSentence, device: &mut Device| {
            if reply == PmtkSentence::System(SystemMessage::Startup) {
                device
                    .send_request(&PmtkCommand::SetNmeaUpdateRate(1000))
                    .unwrap();
            }
            sink.lock().unwrap().push(reply);
        }));

    rig.receive(b"$PMTK010,001*2E\r\n");
    assert_eq!(rig.link.take_written(), b"$PMTK220,1000*1F\r\n");

    rig.receive(b"$PMTK001,220,3*30\r\n");
    assert_eq!(
        *replies.lock().unwrap(),
        vec![
            PmtkSentence::System(SystemMessage::Startup),
            PmtkSentence::Ack(PmtkAck {
                command: 220,
                flag: AckFlag::ActionSucceeded
            }),
        ]
    );
    assert_eq!(rig.events.count(Event::UnknownSentence), 0);
}

#[test]
fn config_from_json_arms_watchdog() {
    let config = DeviceConfig::from_json(
        r#"{
            "transport": { "baud_rate": 38400, "parity": "E" },
            "watchdog_timeout": 2500
        }"#,
    )
    .unwrap();
    let rig = Rig::with_config("rx-json-config", config);

    assert_eq!(rig.link.applied_config().unwrap().baud_rate, 38400);
    assert_eq!(
        rig.scheduler.armed().map(|(_, period)| period),
        Some(Duration::from_millis(2500))
    );
    assert_eq!(rig.device.watchdog_timeout(), Some(Duration::from_millis(2500)));
}

#[test]
fn destroy_cancels_watchdog() {
    let config = DeviceConfig::default().with_watchdog_timeout(Duration::from_secs(1));
    let rig = Rig::with_config("rx-destroy", config);
    assert!(rig.scheduler.armed().is_some());

    let Rig { device, scheduler, .. } = rig;
    device.destroy();
    assert_eq!(scheduler.armed(), None);
}
