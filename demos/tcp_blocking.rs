use std::net::IpAddr;

use clap::Parser;
use nmea_receiver::{
    config::DeviceConfig,
    device::{Device, Event},
    driver::blocking::Driver,
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: IpAddr,
    #[arg(short, long, default_value = "10110")]
    port: u16,
    /// Device configuration as a JSON file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = match args.config {
        Some(path) => DeviceConfig::from_json(&std::fs::read_to_string(path).unwrap()).unwrap(),
        None => DeviceConfig::default(),
    };

    let sink = |device: &Device, event: Event| match event {
        Event::DateTimeUpdate => {
            if let Some((now, age)) = device.get_wallclock_now() {
                println!("UTC {} (fix {:?} old)", now, age);
            }
        }
        Event::LocationUpdate => {
            let (location, _) = device.get_location();
            println!(
                "Current position: lat {:9.5}, lon {:10.5}, speed {:?} kn",
                location.latitude, location.longitude, location.speed
            );
        }
        Event::FixAcquired | Event::FixLost => {
            let (quality, _) = device.get_fix_quality();
            println!("{:?}, quality {}", event, quality);
        }
        _ => { /* ignore other events */ }
    };

    let mut driver = Driver::connect(format!("{}:{}", args.addr, args.port), config, sink).unwrap();
    if let Err(e) = driver.run() {
        eprintln!("Error receiving data: {e}");
    }
}
