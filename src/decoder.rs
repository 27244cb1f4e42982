//! Heart rate decoding for Polar Vantage manufacturer advertisements.
//!
//! Polar Vantage M (firmware 5.1.8) broadcasts manufacturer data of the form
//!
//! ```text
//! 6b00720872acf50200000000XX00YY
//! ```
//!
//! where `6b00` is the Polar company identifier (0x006B, little-endian) and
//! `YY` is the heart rate in beats per minute. `XX` changes constantly but its
//! meaning is unknown (expended energy or the interval between two
//! measurements are guesses), so nothing before `YY` is interpreted.

use crate::mac_address::MacAddress;
use std::time::SystemTime;
use thiserror::Error;

/// Hex prefix every heart rate advertisement from the watch starts with.
pub const PAYLOAD_PREFIX: &str = "6b00720872acf50200000000";

/// Errors returned when a manufacturer value cannot be decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The value does not carry the expected vendor prefix. Either a different
    /// device or firmware, or the wrong device was picked as target.
    #[error("Format violation: unexpected manufacturer data '{0}'")]
    FormatViolation(String),
    /// The trailing heart rate byte is not valid hex.
    #[error("Invalid heart rate in manufacturer data '{0}'")]
    InvalidHeartRate(String),
}

/// A heart rate decoded from one advertisement.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateReading {
    /// Address of the watch that sent the advertisement
    pub mac: MacAddress,
    /// When the advertisement was decoded
    pub timestamp: SystemTime,
    /// Heart rate in beats per minute
    pub bpm: u8,
}

/// Decode the heart rate from a hex manufacturer value.
///
/// Only the last two hex characters are read. No range check is applied.
pub fn decode_heart_rate(value: &str) -> Result<u8, DecodeError> {
    if !value.starts_with(PAYLOAD_PREFIX) {
        return Err(DecodeError::FormatViolation(value.to_string()));
    }

    let tail = value
        .len()
        .checked_sub(2)
        .filter(|&start| start >= PAYLOAD_PREFIX.len())
        .and_then(|start| value.get(start..))
        .filter(|tail| tail.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| DecodeError::InvalidHeartRate(value.to_string()))?;

    u8::from_str_radix(tail, 16).map_err(|_| DecodeError::InvalidHeartRate(value.to_string()))
}

/// Decode a manufacturer value from `mac` into a timestamped reading.
pub fn decode_reading(mac: MacAddress, value: &str) -> Result<HeartRateReading, DecodeError> {
    let bpm = decode_heart_rate(value)?;
    Ok(HeartRateReading {
        mac,
        timestamp: SystemTime::now(),
        bpm,
    })
}
