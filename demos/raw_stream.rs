use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use nmea_receiver::{
    config::DeviceConfig,
    device::{Device, Event, ReadingKind},
    protocol::RawLine,
    transport::IoTransport,
};

const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Replays a captured NMEA log (or reads a serial device node) through a device
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    path: PathBuf,
    /// Print every proprietary sentence
    #[arg(long)]
    proprietary: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    // captures are replayed read-only; device nodes also take commands
    let replay = std::fs::metadata(&args.path).unwrap().is_file();
    let file = OpenOptions::new()
        .read(true)
        .write(!replay)
        .open(&args.path)
        .unwrap();

    let sink = |device: &Device, event: Event| {
        let kind = match event {
            Event::LocationUpdate => ReadingKind::Location,
            Event::SatelliteUpdate => ReadingKind::Satellite,
            _ => return println!("{:?}", event),
        };
        println!("{:?} (age {:?})", event, device.age(kind));
    };

    let mut device = Device::create(
        &args.path.display().to_string(),
        DeviceConfig::default(),
        IoTransport::new(file),
        sink,
    )
    .unwrap();

    if args.proprietary {
        device.set_proprietary_handler(|line: &RawLine, _: &mut Device| {
            println!("{}", String::from_utf8_lossy(line.body()));
        });
    }

    loop {
        match device.on_bytes_available(4096) {
            // end of a capture; a device node is just idle
            Ok(0) if replay => break,
            Ok(0) => std::thread::sleep(IDLE_WAIT),
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading: {e}");
                break;
            }
        }
    }

    println!("Location:  {:?}", device.get_location());
    println!("Date/time: {:?}", device.get_datetime());
    println!("Satellite: {:?}", device.get_satellites());
    device.destroy();
}
