use crate::advertisement::{AdvertisementField, DiscoveryEvent};
use crate::mac_address::MacAddress;

/// A stable MAC address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// A second device that is never the target.
pub const OTHER_MAC: MacAddress = MacAddress([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

/// Polar company identifier.
pub const POLAR_COMPANY_ID: u16 = 0x006B;

/// Build a Polar Vantage heart rate field with the given unknown byte and bpm.
pub fn heart_rate_field(unknown: u8, bpm: u8) -> AdvertisementField {
    AdvertisementField::manufacturer(
        POLAR_COMPANY_ID,
        &[
            0x72, 0x08, 0x72, 0xac, 0xf5, 0x02, 0x00, 0x00, 0x00, 0x00, unknown, 0x00, bpm,
        ],
    )
}

/// An event carrying only a Complete Local Name.
pub fn name_event(mac: MacAddress, name: &str) -> DiscoveryEvent {
    DiscoveryEvent::new(mac, vec![AdvertisementField::local_name(name)])
}
