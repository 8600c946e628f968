//! Prints the raw pulse train of a DHT sensor, one duration per line.
//!
//! # Usage
//!
//! ```bash
//! # BCM pin 25
//! sudo dht-pulses
//!
//! # another pin, with capture diagnostics on stderr
//! sudo dht-pulses 4 --log-level debug
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dht_pulse::rpi::read_sensor;

/// Capture the pulse widths sent by a DHT11/DHT22 sensor
#[derive(Parser)]
#[command(name = "dht-pulses")]
#[command(version)]
struct Cli {
    /// BCM number of the data pin
    #[arg(default_value_t = 25)]
    pin: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    match read_sensor(cli.pin) {
        Ok(pulses) => {
            for duration in &pulses {
                println!("{}", duration);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the durations
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
