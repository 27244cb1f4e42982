//! Target resolution and heart rate decoding for discovery events.
//!
//! [`HeartRateMonitor`] is fed every discovery event in arrival order. It owns
//! the [`TargetSelector`] and is the only thing that changes it.

use crate::advertisement::{DiscoveryEvent, FieldKind};
use crate::decoder::{DecodeError, HeartRateReading, decode_reading};
use crate::mac_address::MacAddress;
use crate::selector::{TargetSelector, is_target_name};
use log::{debug, info};

#[derive(Debug, Default)]
pub struct HeartRateMonitor {
    selector: TargetSelector,
}

impl HeartRateMonitor {
    /// Monitor `mac`, or discover the watch by name when `None`.
    pub fn new(mac: Option<MacAddress>) -> Self {
        Self {
            selector: TargetSelector::new(mac),
        }
    }

    pub fn selector(&self) -> TargetSelector {
        self.selector
    }

    /// Process one discovery event and return the readings it carried.
    ///
    /// Events from devices other than the target are skipped without looking
    /// at their fields. While unresolved, only Complete Local Name fields are
    /// inspected; a match fixes the target and the remaining fields of the
    /// same event are then handled as coming from the target.
    ///
    /// # Errors
    /// Returns the first [`DecodeError`] hit by a target manufacturer field.
    /// Readings decoded earlier in the same event are dropped with it.
    pub fn process(
        &mut self,
        event: &DiscoveryEvent,
    ) -> Result<Vec<HeartRateReading>, DecodeError> {
        let mut readings = Vec::new();

        if !self.selector.accepts(event.address) {
            return Ok(readings);
        }

        for field in &event.fields {
            debug!("Received {}: {}", field.kind, field.describe());

            match (self.selector, field.kind) {
                (TargetSelector::Unresolved, FieldKind::CompleteLocalName) => {
                    let name = field.text();
                    if is_target_name(&name) && self.selector.resolve(event.address) {
                        info!("Found {} at {}", name, event.address);
                    }
                }
                (TargetSelector::Fixed(_), FieldKind::ManufacturerData) => {
                    readings.push(decode_reading(event.address, &field.hex())?);
                }
                _ => {}
            }
        }

        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::AdvertisementField;
    use crate::test_utils::{OTHER_MAC, TEST_MAC, heart_rate_field, name_event};

    #[test]
    fn test_name_match_resolves_target() {
        let mut monitor = HeartRateMonitor::new(None);
        let readings = monitor.process(&name_event(TEST_MAC, "Polar Vantage M")).unwrap();

        assert!(readings.is_empty());
        assert_eq!(monitor.selector(), TargetSelector::Fixed(TEST_MAC));
    }

    #[test]
    fn test_non_matching_name_stays_unresolved() {
        let mut monitor = HeartRateMonitor::new(None);
        for name in ["Polar H10 ABCD", "Vantage", "", "polar vantage m"] {
            monitor.process(&name_event(TEST_MAC, name)).unwrap();
        }
        assert_eq!(monitor.selector(), TargetSelector::Unresolved);
    }

    #[test]
    fn test_second_matching_name_does_not_retarget() {
        let mut monitor = HeartRateMonitor::new(None);
        monitor.process(&name_event(TEST_MAC, "Polar Vantage M")).unwrap();
        monitor.process(&name_event(OTHER_MAC, "Polar Vantage V2")).unwrap();

        assert_eq!(monitor.selector(), TargetSelector::Fixed(TEST_MAC));
    }

    #[test]
    fn test_manufacturer_data_ignored_while_unresolved() {
        let mut monitor = HeartRateMonitor::new(None);
        let event = DiscoveryEvent::new(
            TEST_MAC,
            vec![
                heart_rate_field(0x05, 75),
                AdvertisementField::manufacturer(0x1234, &[0x00]),
            ],
        );

        assert!(monitor.process(&event).unwrap().is_empty());
        assert_eq!(monitor.selector(), TargetSelector::Unresolved);
    }

    #[test]
    fn test_name_then_heart_rate() {
        let mut monitor = HeartRateMonitor::new(None);
        monitor.process(&name_event(TEST_MAC, "Polar Vantage M")).unwrap();

        let event = DiscoveryEvent::new(
            TEST_MAC,
            vec![AdvertisementField::new(
                FieldKind::ManufacturerData,
                [
                    0x6b, 0x00, 0x72, 0x08, 0x72, 0xac, 0xf5, 0x02, 0x00, 0x00, 0x00, 0x00, 0x05,
                    0x00, 0x4b,
                ],
            )],
        );
        let readings = monitor.process(&event).unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].bpm, 75);
        assert_eq!(readings[0].mac, TEST_MAC);
    }

    #[test]
    fn test_fields_after_name_in_same_event_are_decoded() {
        let mut monitor = HeartRateMonitor::new(None);
        let event = DiscoveryEvent::new(
            TEST_MAC,
            vec![
                heart_rate_field(0x01, 60),
                AdvertisementField::local_name("Polar Vantage M"),
                heart_rate_field(0x02, 61),
            ],
        );

        let readings = monitor.process(&event).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].bpm, 61);
    }

    #[test]
    fn test_fixed_target_ignores_other_devices() {
        let mut monitor = HeartRateMonitor::new(Some("AA:BB:CC:DD:EE:FF".parse().unwrap()));
        let event = DiscoveryEvent::new(
            "11:22:33:44:55:66".parse().unwrap(),
            vec![
                AdvertisementField::local_name("Polar Vantage M"),
                AdvertisementField::manufacturer(0x1234, &[0xde, 0xad]),
                heart_rate_field(0x05, 75),
            ],
        );

        assert!(monitor.process(&event).unwrap().is_empty());
        assert_eq!(monitor.selector(), TargetSelector::Fixed(TEST_MAC));
    }

    #[test]
    fn test_fixed_target_decodes_without_name() {
        let mut monitor = HeartRateMonitor::new(Some(TEST_MAC));
        let event = DiscoveryEvent::new(TEST_MAC, vec![heart_rate_field(0x7f, 142)]);

        let readings = monitor.process(&event).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].bpm, 142);
    }

    #[test]
    fn test_name_fields_ignored_once_fixed() {
        let mut monitor = HeartRateMonitor::new(Some(TEST_MAC));
        let readings = monitor.process(&name_event(TEST_MAC, "Polar Vantage M")).unwrap();

        assert!(readings.is_empty());
        assert_eq!(monitor.selector(), TargetSelector::Fixed(TEST_MAC));
    }

    #[test]
    fn test_foreign_manufacturer_data_from_target_is_format_violation() {
        let mut monitor = HeartRateMonitor::new(Some(TEST_MAC));
        let event = DiscoveryEvent::new(
            TEST_MAC,
            vec![AdvertisementField::new(
                FieldKind::ManufacturerData,
                [
                    0xaa, 0xaa, 0x72, 0x08, 0x72, 0xac, 0xf5, 0x02, 0x00, 0x00, 0x00, 0x00, 0xff,
                    0x00, 0xaf,
                ],
            )],
        );

        assert_eq!(
            monitor.process(&event),
            Err(DecodeError::FormatViolation(
                "aaaa720872acf50200000000ff00af".to_string()
            ))
        );
    }

    #[test]
    fn test_multiple_heart_rate_fields_in_one_event() {
        let mut monitor = HeartRateMonitor::new(Some(TEST_MAC));
        let event = DiscoveryEvent::new(
            TEST_MAC,
            vec![heart_rate_field(0x01, 70), heart_rate_field(0x02, 71)],
        );

        let bpm: Vec<u8> = monitor
            .process(&event)
            .unwrap()
            .iter()
            .map(|r| r.bpm)
            .collect();
        assert_eq!(bpm, vec![70, 71]);
    }
}
