use serde::{Deserialize, Serialize};

/// Ambient humidity (percent) above which a rain signal is shown under
/// [`RainDisplayRule::HumidityGated`].
pub const RAIN_HUMIDITY_THRESHOLD: f64 = 95.0;

/// One sensor sample as received over the link, in wire field order.
/// Values are stored exactly as coerced from the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub rain_detected: bool,
    pub soil_humidity: f64,    // percent
    pub ambient_humidity: f64, // percent
    pub temperature: f64,      // degrees
    pub luminance: i64,        // lux
}

impl SensorReading {
    /// The rain readout as the deployed dashboard computes it: the rain
    /// sensor only counts while ambient humidity is above 95%.
    pub fn rain_display(&self) -> bool {
        self.rain_detected && self.ambient_humidity > RAIN_HUMIDITY_THRESHOLD
    }
}

/// How the rain readout is derived from a reading.
///
/// `HumidityGated` reproduces the deployed behaviour, which couples the rain
/// sensor to an ambient humidity threshold. `SensorOnly` shows the rain
/// sensor's own flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RainDisplayRule {
    #[default]
    HumidityGated,
    SensorOnly,
}

impl RainDisplayRule {
    pub fn apply(self, reading: &SensorReading) -> bool {
        match self {
            RainDisplayRule::HumidityGated => reading.rain_display(),
            RainDisplayRule::SensorOnly => reading.rain_detected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(rain_detected: bool, ambient_humidity: f64) -> SensorReading {
        SensorReading {
            rain_detected,
            soil_humidity: 42.5,
            ambient_humidity,
            temperature: 23.0,
            luminance: 550,
        }
    }

    #[test]
    fn test_rain_display_requires_both_conditions() {
        assert!(reading(true, 97.0).rain_display());
        assert!(!reading(true, 88.0).rain_display());
        assert!(!reading(false, 97.0).rain_display());
        assert!(!reading(false, 10.0).rain_display());
    }

    #[test]
    fn test_rain_display_threshold_is_exclusive() {
        assert!(!reading(true, 95.0).rain_display());
        assert!(reading(true, 95.01).rain_display());
    }

    #[test]
    fn test_sensor_only_rule_ignores_humidity() {
        let dry = reading(true, 20.0);
        assert!(!RainDisplayRule::HumidityGated.apply(&dry));
        assert!(RainDisplayRule::SensorOnly.apply(&dry));
        assert!(!RainDisplayRule::SensorOnly.apply(&reading(false, 99.0)));
    }
}
