//! `vantage-hr-listener` library.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, logger setup and
//! process exit codes. Target resolution and payload decoding live in
//! [`crate::monitor`] and [`crate::decoder`]; [`crate::app`] drives them from
//! an injected advertisement source so the whole loop can be tested without
//! Bluetooth hardware.

pub mod advertisement;
pub mod app;
pub mod decoder;
pub mod duration;
pub mod mac_address;
pub mod monitor;
pub mod output;
pub mod scanner;
pub mod selector;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::{AdvertisementField, DiscoveryEvent, FieldKind};
pub use decoder::{DecodeError, HeartRateReading, decode_heart_rate};
pub use mac_address::MacAddress;
pub use monitor::HeartRateMonitor;
pub use output::OutputFormatter;
pub use scanner::{AdvertisementSource, Backend, DiscoveryHandler, ScanError};
pub use selector::TargetSelector;
