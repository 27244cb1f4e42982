//! Plain text output.

use crate::decoder::HeartRateReading;
use crate::output::OutputFormatter;

/// Formats readings as `HR: 75 bpm`. Timestamps come from the logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format(&self, reading: &HeartRateReading) -> String {
        format!("HR: {} bpm", reading.bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TEST_MAC;
    use std::time::SystemTime;

    #[test]
    fn test_text_format() {
        let reading = HeartRateReading {
            mac: TEST_MAC,
            timestamp: SystemTime::UNIX_EPOCH,
            bpm: 75,
        };
        assert_eq!(TextFormatter.format(&reading), "HR: 75 bpm");
    }
}
