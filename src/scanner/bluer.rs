//! BlueZ D-Bus backend.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{AdvertisementSource, DiscoveryHandler, ScanError, window_deadline};
use crate::advertisement::{AdvertisementField, DiscoveryEvent};
use crate::mac_address::MacAddress;
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
use futures::{StreamExt, pin_mut};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::timeout_at;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Advertisement source backed by the default BlueZ adapter.
pub struct BluerSource {
    _session: Session,
    adapter: Adapter,
}

impl BluerSource {
    /// Connect to bluetoothd and power on the default adapter.
    pub async fn open() -> Result<Self, ScanError> {
        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;

        // Report every advertisement, not only the first one per device.
        adapter
            .set_discovery_filter(DiscoveryFilter {
                transport: DiscoveryTransport::Le,
                duplicate_data: true,
                ..Default::default()
            })
            .await?;

        debug!("Using adapter {}", adapter.name());

        Ok(Self {
            _session: session,
            adapter,
        })
    }

    async fn scan_window(
        &self,
        window: Duration,
        handler: &mut dyn DiscoveryHandler,
    ) -> Result<(), ScanError> {
        let deadline = window_deadline(window);
        let mut cached = CachedDevices::new(self.adapter.device_addresses().await?);
        let events = self.adapter.discover_devices_with_changes().await?;
        pin_mut!(events);

        // Discovery stops when the stream is dropped at the end of the window.
        while let Ok(Some(event)) = timeout_at(deadline, events.next()).await {
            if let AdapterEvent::DeviceAdded(address) = event {
                if cached.is_replay(address) {
                    continue;
                }
                match self.discovery_event(address).await {
                    Ok(event) => handler.on_discovery(&event)?,
                    // The device may already be gone again.
                    Err(e) => debug!("Skipping {address}: {e}"),
                }
            }
        }

        Ok(())
    }

    /// Read the advertised properties of `address` into a discovery event.
    async fn discovery_event(&self, address: Address) -> Result<DiscoveryEvent, ScanError> {
        let device = self.adapter.device(address)?;
        let name = device.name().await?;
        let manufacturer_data = device.manufacturer_data().await?;

        Ok(DiscoveryEvent::new(
            MacAddress::from(address),
            device_fields(name, manufacturer_data),
        ))
    }
}

/// Devices BlueZ already knew about when a discovery session started.
///
/// The session opens with one `DeviceAdded` per known device, carrying the
/// properties from the last time it was seen. That first event is skipped;
/// later ones are property changes from fresh advertisements.
struct CachedDevices(HashSet<Address>);

impl CachedDevices {
    fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self(addresses.into_iter().collect())
    }

    fn is_replay(&mut self, address: Address) -> bool {
        self.0.remove(&address)
    }
}

/// Turn device properties into advertisement fields.
///
/// Manufacturer entries are ordered by company ID.
fn device_fields(
    name: Option<String>,
    manufacturer_data: Option<HashMap<u16, Vec<u8>>>,
) -> Vec<AdvertisementField> {
    let mut fields = Vec::new();

    if let Some(name) = name {
        fields.push(AdvertisementField::local_name(&name));
    }

    if let Some(manufacturer_data) = manufacturer_data {
        let mut entries: Vec<_> = manufacturer_data.into_iter().collect();
        entries.sort_by_key(|(company_id, _)| *company_id);
        fields.extend(
            entries
                .iter()
                .map(|(company_id, data)| AdvertisementField::manufacturer(*company_id, data)),
        );
    }

    fields
}

impl AdvertisementSource for BluerSource {
    fn scan<'a>(
        &'a mut self,
        window: Duration,
        handler: &'a mut dyn DiscoveryHandler,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScanError>> + 'a>> {
        Box::pin(self.scan_window(window, handler))
    }
}
