//! InfluxDB line protocol output formatter.

use crate::decoder::HeartRateReading;
use crate::output::OutputFormatter;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        for (key, value) in &self.tag_set {
            write!(fmt, ",{key}={value}")?;
        }

        let mut separator = " ";
        for (key, value) in &self.field_set {
            write!(fmt, "{separator}{key}={value}")?;
            separator = ",";
        }

        // Timestamps before the epoch cannot be expressed; leave them to the server.
        if let Some(since_epoch) = self
            .timestamp
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        {
            write!(fmt, " {}", since_epoch.as_nanos())?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Each reading becomes `<measurement>,mac=<address> bpm=<bpm>i <nanoseconds>`.
pub struct InfluxDbFormatter {
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn to_data_point(&self, reading: &HeartRateReading) -> DataPoint {
        let mut tag_set = BTreeMap::new();
        tag_set.insert("mac".to_string(), reading.mac.to_string());

        let mut field_set = BTreeMap::new();
        field_set.insert("bpm".to_string(), FieldValue::Integer(i64::from(reading.bpm)));

        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set,
            field_set,
            timestamp: Some(reading.timestamp),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, reading: &HeartRateReading) -> String {
        self.to_data_point(reading).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TEST_MAC;
    use std::time::Duration;

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Integer(75).to_string(), "75i");
    }

    #[test]
    fn test_data_point_format() {
        let mut tags = BTreeMap::new();
        tags.insert("name".to_string(), "watch".to_string());
        tags.insert("mac".to_string(), "aa:bb:cc:dd:ee:ff".to_string());

        let mut fields = BTreeMap::new();
        fields.insert("bpm".to_string(), FieldValue::Integer(80));
        fields.insert("rssi".to_string(), FieldValue::Integer(-60));

        let data_point = DataPoint {
            measurement: "hr".to_string(),
            tag_set: tags,
            field_set: fields,
            timestamp: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000)),
        };

        assert_eq!(
            data_point.to_string(),
            "hr,mac=aa:bb:cc:dd:ee:ff,name=watch bpm=80i,rssi=-60i 1000000000000000000"
        );
    }

    #[test]
    fn test_data_point_without_timestamp() {
        let mut fields = BTreeMap::new();
        fields.insert("bpm".to_string(), FieldValue::Integer(60));

        let data_point = DataPoint {
            measurement: "hr".to_string(),
            tag_set: BTreeMap::new(),
            field_set: fields,
            timestamp: None,
        };
        assert_eq!(data_point.to_string(), "hr bpm=60i");
    }

    #[test]
    fn test_influxdb_formatter() {
        let formatter = InfluxDbFormatter::new("heart_rate".to_string());
        let reading = HeartRateReading {
            mac: TEST_MAC,
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000),
            bpm: 75,
        };

        assert_eq!(
            formatter.format(&reading),
            "heart_rate,mac=aa:bb:cc:dd:ee:ff bpm=75i 1000000000000000000"
        );
    }
}
