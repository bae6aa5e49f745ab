//! Sensor calibration
//!
//! The WH5100 transmits raw integer codes. These functions turn
//! them into physical units. The temperature channel needs an
//! extra correction step first: its high byte drifts as the
//! station's batteries discharge, and the
//! [`CalibrationTable`] maps the drifted values back.

use phf::phf_map;

/// Known drifted values of the temperature high byte
static DRIFT_CORRECTIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "6d" => "65",
    "6c" => "64",
    "6b" => "63",
    "6a" => "62",
    "25" => "65",
    "24" => "64",
    "23" => "63",
    "22" => "62",
};

/// Temperature slope (°C per count)
const TEMPERATURE_SCALE: f64 = 0.05;

/// Temperature offset (°C)
const TEMPERATURE_OFFSET: f64 = -1268.8;

// wind fit, from a linear regression over about twenty
// measurements against a reference anemometer
const WIND_SCALE: f64 = 0.61264343715451175;
const WIND_OFFSET: f64 = -0.018142655636458116;

/// Corrects drifted temperature bytes
///
/// The table is a fixed mapping from a two-character lowercase
/// hexadecimal byte to its nominal equivalent. Tokens which are
/// not in the table pass through unchanged.
///
/// ```
/// use otiowx::CalibrationTable;
///
/// let table = CalibrationTable::default();
/// assert_eq!("65", table.correct("6d"));
/// assert_eq!("65", table.correct("65"));
/// assert_eq!("1f", table.correct("1f"));
/// ```
#[derive(Clone, Copy)]
pub struct CalibrationTable {
    map: &'static phf::Map<&'static str, &'static str>,
}

impl CalibrationTable {
    /// Substitute `token`, if it is a known drifted value
    pub fn correct<'a>(&self, token: &'a str) -> &'a str {
        self.map.get(token).copied().unwrap_or(token)
    }

    /// True if `token` would be substituted
    pub fn contains(&self, token: &str) -> bool {
        self.map.contains_key(token)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over `(drifted, nominal)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.map.entries().map(|(k, v)| (*k, *v))
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            map: &DRIFT_CORRECTIONS,
        }
    }
}

impl std::fmt::Debug for CalibrationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Temperature (°C) from the 16-bit raw code
///
/// `raw` is the corrected high byte and the low byte, read
/// together as a big-endian integer. The result is rounded
/// to one decimal place.
pub fn temperature(raw: u16) -> f64 {
    round_tenths(TEMPERATURE_SCALE * raw as f64 + TEMPERATURE_OFFSET)
}

/// Relative humidity (%) from the raw code
///
/// The sensor reports humidity in half-percent steps. Halves
/// are rounded to the nearest even integer, so `1` → `0`,
/// `3` → `2`, and `5` → `2`.
pub fn humidity(raw: u8) -> u8 {
    let half = raw / 2;
    if raw % 2 == 1 && half % 2 == 1 {
        half + 1
    } else {
        half
    }
}

/// Wind speed from the raw code
///
/// Used for both the median and the gust channels. Rounded to
/// one decimal place.
pub fn wind(raw: u8) -> f64 {
    round_tenths(WIND_SCALE * raw as f64 + WIND_OFFSET)
}

/// Round to one decimal place
///
/// Rounds the exact binary value of `value`. The temperature
/// `0.05 * 0x6543 - 1268.8` is nominally `27.35` but evaluates
/// to slightly more, so it becomes `27.4`.
pub(crate) fn round_tenths(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}
