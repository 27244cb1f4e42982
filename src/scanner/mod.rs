//! Advertisement sources.
//!
//! A source runs one bounded scan window at a time and hands every discovery
//! event to a [`DiscoveryHandler`] as soon as it arrives, in arrival order.
//! Two backends are available: BlueZ over D-Bus and raw HCI sockets.

#[cfg(feature = "bluer")]
pub mod bluer;

#[cfg(feature = "hci")]
pub mod hci;

use crate::advertisement::DiscoveryEvent;
use crate::decoder::DecodeError;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Longest scan window a source will honour, roughly thirty years.
const MAX_WINDOW: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// End of a scan window of length `window` starting now.
fn window_deadline(window: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(window)
        .unwrap_or_else(|| now + window.min(MAX_WINDOW))
}

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth adapter or management error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// The local controller went away during a scan
    #[error("Bluetooth controller disconnected: {0}")]
    Disconnected(String),
    /// A handler could not decode an advertisement
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    /// A handler could not write its output
    #[error("Output error: {0}")]
    Io(#[from] io::Error),
}

impl ScanError {
    /// Transport hiccups that the scan loop logs and rides out.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScanError::Bluetooth(_) | ScanError::Disconnected(_))
    }
}

/// Receives discovery events from a source.
pub trait DiscoveryHandler {
    /// Called once per discovery event, synchronously within the scan.
    ///
    /// Returning an error ends the current scan window with that error.
    fn on_discovery(&mut self, event: &DiscoveryEvent) -> Result<(), ScanError>;
}

/// A live source of advertisement events.
pub trait AdvertisementSource {
    /// Listen for `window`, passing every event to `handler`.
    fn scan<'a>(
        &'a mut self,
        window: Duration,
        handler: &'a mut dyn DiscoveryHandler,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScanError>> + 'a>>;
}

/// Available scanner backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// BlueZ D-Bus backend (requires bluetoothd daemon)
    #[cfg(feature = "bluer")]
    Bluer,
    /// Raw HCI socket backend (direct kernel access, no daemon required)
    #[cfg(feature = "hci")]
    Hci,
}

impl Default for Backend {
    fn default() -> Self {
        #[cfg(feature = "bluer")]
        return Backend::Bluer;
        #[cfg(all(feature = "hci", not(feature = "bluer")))]
        return Backend::Hci;
        #[cfg(not(any(feature = "bluer", feature = "hci")))]
        compile_error!("At least one backend feature must be enabled");
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "bluer")]
            Backend::Bluer => write!(f, "bluer"),
            #[cfg(feature = "hci")]
            Backend::Hci => write!(f, "hci"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "bluer")]
            "bluer" | "bluez" => Ok(Backend::Bluer),
            #[cfg(feature = "hci")]
            "hci" | "raw" => Ok(Backend::Hci),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// Open the adapter for `backend`.
///
/// The returned source holds the adapter until it is dropped.
pub async fn open(backend: Backend) -> Result<Box<dyn AdvertisementSource>, ScanError> {
    match backend {
        #[cfg(feature = "bluer")]
        Backend::Bluer => Ok(Box::new(bluer::BluerSource::open().await?)),
        #[cfg(feature = "hci")]
        Backend::Hci => Ok(Box::new(hci::HciSource::open(hci::DEFAULT_DEVICE)?)),
    }
}
