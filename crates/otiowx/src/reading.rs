//! Decoded weather readings

use std::fmt;

use serde::{Deserialize, Serialize};

/// A calibrated, plausible weather reading
///
/// Readings serialize to the upload format, with short
/// field names:
///
/// ```
/// use otiowx::Reading;
///
/// let rd = Reading {
///     timestamp: 1616883240.5,
///     temperature: 21.3,
///     humidity: 48,
///     wind_median: 3.0,
///     wind_gust: 6.1,
///     rain_mm: 0.3,
/// };
/// assert_eq!(
///     "21.3 °C, 48 %, wind 3.0 (gust 6.1), rain 0.3 mm",
///     &format!("{}", rd)
/// );
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Decode time (UNIX timestamp, in seconds)
    #[serde(rename = "date")]
    pub timestamp: f64,

    /// Temperature (°C)
    #[serde(rename = "temp")]
    pub temperature: f64,

    /// Relative humidity (%)
    #[serde(rename = "hum")]
    pub humidity: u8,

    /// Median wind speed
    #[serde(rename = "wind")]
    pub wind_median: f64,

    /// Wind gust speed
    #[serde(rename = "gust")]
    pub wind_gust: f64,

    /// Rainfall since the previous reading (mm)
    #[serde(rename = "rain")]
    pub rain_mm: f64,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} °C, {} %, wind {:.1} (gust {:.1}), rain {:.1} mm",
            self.temperature, self.humidity, self.wind_median, self.wind_gust, self.rain_mm
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let rd = Reading {
            timestamp: 1616883240.25,
            temperature: -4.5,
            humidity: 97,
            wind_median: 0.6,
            wind_gust: 1.2,
            rain_mm: 0.0,
        };

        let json: serde_json::Value = serde_json::to_value(rd).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": 1616883240.25,
                "temp": -4.5,
                "hum": 97,
                "wind": 0.6,
                "gust": 1.2,
                "rain": 0.0,
            })
        );
        assert!(json["hum"].is_u64());

        let back: Reading = serde_json::from_value(json).unwrap();
        assert_eq!(back, rd);
    }
}
