//! Core application runner (business logic) for `vantage-hr-listener`.
//!
//! This module is intentionally decoupled from CLI parsing, logger setup and
//! process exit codes so it can be tested deterministically with a fake
//! advertisement source.

use crate::advertisement::DiscoveryEvent;
use crate::decoder::{DecodeError, HeartRateReading};
use crate::duration::parse_duration;
use crate::mac_address::MacAddress;
use crate::monitor::HeartRateMonitor;
use crate::output::influxdb::InfluxDbFormatter;
use crate::output::text::TextFormatter;
use crate::output::{OutputFormat, OutputFormatter};
use crate::scanner::{AdvertisementSource, Backend, DiscoveryHandler, ScanError};
use crate::selector::DEVICE_NAME_PREFIX;
use clap::Parser;
use log::{error, info};
use std::io;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

/// BLE heart rate monitor for Polar Vantage watches.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// MAC address of the watch (default: discover by advertised name)
    #[arg(short = 'm', long = "mac", value_name = "MAC")]
    pub mac: Option<MacAddress>,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,

    /// How long each scan listens for advertisements.
    /// Accepts duration with suffix: 10s, 1m, 500ms.
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub scan_window: Duration,

    /// Pause between two scans.
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub pause: Duration,

    /// Stop after this many scans (default: run until interrupted)
    #[arg(long)]
    pub cycles: Option<u64>,

    /// How readings are emitted
    #[arg(long, default_value_t, value_enum)]
    pub format: OutputFormat,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "heart_rate")]
    pub influxdb_measurement: String,

    /// Verbose output, log every received advertisement field
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// The target sent manufacturer data in an unknown format.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Feeds discovery events to the monitor and emits the decoded readings.
struct ReadingWriter<'a> {
    monitor: HeartRateMonitor,
    format: OutputFormat,
    formatter: Box<dyn OutputFormatter>,
    out: &'a mut dyn Write,
}

impl ReadingWriter<'_> {
    fn emit(&mut self, reading: &HeartRateReading) -> io::Result<()> {
        let line = self.formatter.format(reading);
        match self.format {
            OutputFormat::Log => {
                info!("{line}");
                Ok(())
            }
            OutputFormat::Influxdb => writeln!(self.out, "{line}"),
        }
    }
}

impl DiscoveryHandler for ReadingWriter<'_> {
    fn on_discovery(&mut self, event: &DiscoveryEvent) -> Result<(), ScanError> {
        for reading in self.monitor.process(event)? {
            self.emit(&reading)?;
        }
        Ok(())
    }
}

fn formatter(options: &Options) -> Box<dyn OutputFormatter> {
    match options.format {
        OutputFormat::Log => Box::new(TextFormatter),
        OutputFormat::Influxdb => Box::new(InfluxDbFormatter::new(
            options.influxdb_measurement.clone(),
        )),
    }
}

/// Run scan windows on `source` until interrupted or `options.cycles` is reached.
///
/// - Readings are logged, or written to `out` for line protocol output.
/// - Bluetooth errors during a scan are logged and scanning continues.
/// - A format violation from the target ends the loop with [`RunError::Decode`].
pub async fn run_with_io(
    options: Options,
    source: &mut dyn AdvertisementSource,
    out: &mut dyn Write,
) -> Result<(), RunError> {
    match options.mac {
        Some(mac) => info!("Listening for heart rate from {mac}"),
        None => info!("Looking for a device named \"{DEVICE_NAME_PREFIX}...\""),
    }

    let mut handler = ReadingWriter {
        monitor: HeartRateMonitor::new(options.mac),
        format: options.format,
        formatter: formatter(&options),
        out,
    };

    let mut completed = 0;
    while options.cycles.is_none_or(|cycles| completed < cycles) {
        match source.scan(options.scan_window, &mut handler).await {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => error!("{e}"),
            Err(ScanError::Decode(e)) => return Err(RunError::Decode(e)),
            Err(e) => return Err(e.into()),
        }
        handler.out.flush()?;

        completed += 1;
        if options.cycles != Some(completed) {
            tokio::time::sleep(options.pause).await;
        }
    }

    Ok(())
}
