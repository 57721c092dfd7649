//! Decoded sensor reading

use std::fmt;

use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;

/// Temperature & humidity reading decoded from a single transmission.
///
/// Only the protocol decoder creates measurements. The timestamp is the
/// moment of decoding in local time, the time of the RF transmission is unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    decoding_timestamp: DateTime<FixedOffset>,
    temperature_degrees_celsius: f64,
    /// Fraction in [0, 1]
    relative_humidity: f64,
}

impl Measurement {
    pub(crate) fn new(temperature_degrees_celsius: f64, relative_humidity: f64) -> Self {
        Self::at(now_local(), temperature_degrees_celsius, relative_humidity)
    }

    pub(crate) fn at(
        decoding_timestamp: DateTime<FixedOffset>,
        temperature_degrees_celsius: f64,
        relative_humidity: f64,
    ) -> Self {
        Self {
            decoding_timestamp,
            temperature_degrees_celsius,
            relative_humidity,
        }
    }

    pub fn decoding_timestamp(&self) -> DateTime<FixedOffset> {
        self.decoding_timestamp
    }

    pub fn temperature_degrees_celsius(&self) -> f64 {
        self.temperature_degrees_celsius
    }

    pub fn relative_humidity(&self) -> f64 {
        self.relative_humidity
    }
}

/// Tab separated line: `timestamp \t 24.1°C \t 51.2%`
impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{:.1}°C\t{:.1}%",
            self.decoding_timestamp.format("%Y-%m-%dT%H:%M:%S%z"),
            self.temperature_degrees_celsius,
            self.relative_humidity * 100.0
        )
    }
}

/// Current local time with its UTC offset attached
pub(crate) fn now_local() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn timestamp() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2020, 12, 7, 10, 0, 50)
            .unwrap()
    }

    #[test]
    fn test_display_line() {
        let measurement = Measurement::at(timestamp(), 22.42, 0.55123);
        assert_eq!(
            measurement.to_string(),
            "2020-12-07T10:00:50+0100\t22.4°C\t55.1%"
        );
    }

    #[test]
    fn test_display_rounds_one_decimal() {
        let measurement = Measurement::at(timestamp(), 24.1234, 0.51234);
        assert!(measurement.to_string().ends_with("\t24.1°C\t51.2%"));
    }

    #[test]
    fn test_now_local_is_current() {
        let age = Utc::now().signed_duration_since(now_local());
        assert!(age.num_milliseconds().abs() < 1000);
    }

    #[test]
    fn test_serialize_json() {
        let measurement = Measurement::at(timestamp(), 21.0, 0.42);
        let json = serde_json::to_value(&measurement).unwrap();
        assert_eq!(json["temperature_degrees_celsius"], 21.0);
        assert_eq!(json["relative_humidity"], 0.42);
        assert_eq!(json["decoding_timestamp"], "2020-12-07T10:00:50+01:00");
    }
}
