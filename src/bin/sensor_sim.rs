//! Field device simulator
//!
//! Posts readings to a running AgriCool server the way the shed controller
//! does: temperature follows a slow day curve, the pump runs its own
//! threshold logic and cools the shed while it is on, and the water tank
//! drains while misting.

use agricool::climate::heat_index_celsius;
use agricool::models::IngestReading;
use anyhow::Context;
use clap::Parser;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agricool-sensor-sim")]
#[command(about = "Post simulated shed readings to an AgriCool server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://localhost:8081", env = "AGRICOOL_URL")]
    url: String,

    /// Seconds between readings
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// Stop after this many readings (runs forever when omitted)
    #[arg(long)]
    count: Option<u64>,

    /// Heat index at which the simulated controller starts the pump
    #[arg(long, default_value_t = 32.0)]
    on_threshold: f64,

    /// Heat index at which it stops the pump
    #[arg(long, default_value_t = 29.0)]
    off_threshold: f64,
}

/// Shed state between ticks
struct Shed {
    temperature: f64,
    humidity: f64,
    water_level: f64,
    pump_on: bool,
    /// Position on the day curve, radians
    phase: f64,
}

impl Shed {
    fn new() -> Self {
        Self {
            temperature: 29.0,
            humidity: 65.0,
            water_level: 100.0,
            pump_on: false,
            phase: 0.0,
        }
    }

    fn tick(&mut self, rng: &mut impl Rng, args: &Args) -> IngestReading {
        self.phase += 0.05;
        let ambient = 31.0 + 4.0 * self.phase.sin();

        if self.pump_on {
            self.temperature -= rng.gen_range(0.2..0.6);
            self.humidity = (self.humidity + rng.gen_range(0.5..1.5)).min(95.0);
            self.water_level = (self.water_level - rng.gen_range(0.3..1.0)).max(0.0);
        } else {
            self.temperature += (ambient - self.temperature) * 0.2 + rng.gen_range(-0.2..0.2);
            self.humidity = (self.humidity - rng.gen_range(0.0..0.8)).max(40.0);
            if self.water_level < 20.0 {
                self.water_level = 100.0;
            }
        }

        let heat_index = heat_index_celsius(self.temperature, self.humidity);
        if !self.pump_on && heat_index >= args.on_threshold && self.water_level > 0.0 {
            self.pump_on = true;
        } else if self.pump_on && (heat_index <= args.off_threshold || self.water_level <= 0.0) {
            self.pump_on = false;
        }

        IngestReading::new(
            (self.temperature * 10.0).round() / 10.0,
            (self.humidity * 10.0).round() / 10.0,
            self.water_level.round(),
            self.pump_on,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let args = Args::parse();
    let endpoint = format!("{}/api/sensors", args.url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("cannot build HTTP client")?;

    info!(
        "Posting simulated readings to {endpoint} every {}s",
        args.interval_secs
    );

    let mut shed = Shed::new();
    let mut sent = 0u64;
    let mut interval = tokio::time::interval(Duration::from_secs(args.interval_secs.max(1)));

    loop {
        interval.tick().await;
        let reading = shed.tick(&mut rand::thread_rng(), &args);

        match client.post(&endpoint).json(&reading).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    temperature = shed.temperature,
                    humidity = shed.humidity,
                    pump_on = shed.pump_on,
                    "Reading accepted"
                );
            }
            Ok(response) => warn!("Server rejected reading: {}", response.status()),
            Err(e) => warn!("Cannot reach server: {e}"),
        }

        sent += 1;
        if args.count.is_some_and(|count| sent >= count) {
            info!("Sent {sent} readings, stopping");
            return Ok(());
        }
    }
}
