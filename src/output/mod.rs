//! Output formatters for heart rate readings.
//!
//! Readings are either logged as `HR: <bpm> bpm` lines through the logger, or
//! written to stdout in InfluxDB line protocol for consumers such as Telegraf.

pub mod influxdb;
pub mod text;

use crate::decoder::HeartRateReading;

/// Trait for formatting readings into output lines.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading as a single line, without the trailing newline.
    fn format(&self, reading: &HeartRateReading) -> String;
}

/// Where and how readings are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Timestamped `HR: <bpm> bpm` log lines
    #[default]
    Log,
    /// InfluxDB line protocol on stdout
    Influxdb,
}
