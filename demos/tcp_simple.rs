use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use nmea_receiver::{
    config::DeviceConfig,
    device::{Device, Event},
    driver::AsyncDriver,
    protocol::pmtk::{PmtkCommand, SentenceOutput},
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: IpAddr,
    #[arg(short, long, default_value = "10110")]
    port: u16,
    /// Watchdog timeout in milliseconds, 0 to disable
    #[arg(short, long, default_value = "3000")]
    timeout: u64,
}

fn on_event(device: &Device, event: Event) {
    match event {
        Event::LocationUpdate => {
            let (location, _) = device.get_location();
            println!(
                "Current position: lat {:9.5}, lon {:10.5}",
                location.latitude, location.longitude
            );
        }
        Event::SatelliteUpdate => {
            let (sats, _) = device.get_satellites();
            println!(
                "Satellites tracked: {}, quality: {}",
                sats.satellites_tracked, sats.fix_quality
            );
        }
        Event::FixAcquired | Event::FixLost | Event::Connected | Event::TimedOut => {
            println!("{:?}", event)
        }
        _ => { /* ignore other events */ }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = DeviceConfig::default().with_watchdog_timeout(Duration::from_millis(args.timeout));

    let mut driver = AsyncDriver::connect(format!("{}:{}", args.addr, args.port), config, on_event)
        .await
        .unwrap();

    let output = SentenceOutput::RMC | SentenceOutput::GGA;
    driver
        .send_request(&PmtkCommand::SetNmeaOutput(output))
        .await
        .unwrap();

    if let Err(e) = driver.run().await {
        eprintln!("Error receiving data: {e}");
    }
}
