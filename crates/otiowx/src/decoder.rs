//! Measurement decoding

use std::fmt;

use crate::calibration::{self, CalibrationTable};
use crate::frame::{FrameErr, RawFrame};
use crate::rain::{RainCounter, RainStep};
use crate::reading::Reading;

// token positions within a frame
const TEMPERATURE_HI: usize = 4;
const TEMPERATURE_LO: usize = 5;
const HUMIDITY: usize = 6;
const WIND_MEDIAN: usize = 7;
const WIND_GUST: usize = 8;
const RAIN_COUNT: usize = 10;

/// Physical bounds for a believable reading
///
/// Values outside these bounds are almost always caused by
/// transmission errors which the station's weak checksum
/// did not catch. All bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlausibilityLimits {
    /// Lowest temperature (°C)
    pub min_temperature: f64,

    /// Highest temperature (°C)
    pub max_temperature: f64,

    /// Highest relative humidity (%)
    pub max_humidity: u8,

    /// Most rain between two readings (mm)
    pub max_rain_mm: f64,
}

impl PlausibilityLimits {
    /// True if all three values are within bounds
    pub fn accepts(&self, temperature: f64, humidity: u8, rain_mm: f64) -> bool {
        (self.min_temperature..=self.max_temperature).contains(&temperature)
            && humidity <= self.max_humidity
            && rain_mm <= self.max_rain_mm
    }
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            min_temperature: -20.0,
            max_temperature: 60.0,
            max_humidity: 100,
            max_rain_mm: 10.0,
        }
    }
}

/// Calibrated values from one frame, before rain accumulation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurements {
    /// Temperature (°C)
    pub temperature: f64,

    /// Relative humidity (%)
    pub humidity: u8,

    /// Median wind speed
    pub wind_median: f64,

    /// Wind gust speed
    pub wind_gust: f64,

    /// Raw rain tip counter
    pub rain_count: u8,
}

/// A frame whose values failed the plausibility check
#[derive(Clone, Debug, PartialEq)]
pub struct Implausible {
    /// Decoded temperature (°C)
    pub temperature: f64,

    /// Decoded relative humidity (%)
    pub humidity: u8,

    /// Rainfall the frame would have reported (mm)
    pub rain_mm: f64,

    /// The offending frame
    pub frame: RawFrame,
}

impl fmt::Display for Implausible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T={} H={} R={} in frame \"{}\"",
            self.temperature, self.humidity, self.rain_mm, self.frame
        )
    }
}

/// Result of one decoding attempt
///
/// Every variant except `Reading` is a recoverable failure:
/// the caller should log it and try again on the next cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeOutcome {
    /// A plausible reading
    ///
    /// `rain_count` is the raw rain counter from the frame.
    Reading {
        reading: Reading,
        rain_count: u8,
        frame: RawFrame,
    },

    /// The receiver listened but heard nothing
    NoData,

    /// The receiver reported an error
    SignalError,

    /// Receiver output ended without a frame
    NotFound,

    /// The frame decoded to physically impossible values
    ImplausibleData(Implausible),

    /// The frame could not be parsed
    MalformedFrame { frame: RawFrame, error: FrameErr },
}

impl DecodeOutcome {
    /// The reading, if decoding succeeded
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Reading { reading, .. } => Some(reading),
            _ => None,
        }
    }

    /// True if decoding succeeded
    pub fn is_reading(&self) -> bool {
        self.reading().is_some()
    }

    /// The frame that was decoded, if one was found
    pub fn frame(&self) -> Option<&RawFrame> {
        match self {
            Self::Reading { frame, .. } => Some(frame),
            Self::ImplausibleData(imp) => Some(&imp.frame),
            Self::MalformedFrame { frame, .. } => Some(frame),
            _ => None,
        }
    }
}

impl fmt::Display for DecodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading { reading, .. } => write!(f, "{}", reading),
            Self::NoData => write!(f, "no data received"),
            Self::SignalError => write!(f, "receiver signal error"),
            Self::NotFound => write!(f, "no frame in receiver output"),
            Self::ImplausibleData(imp) => write!(f, "implausible data: {}", imp),
            Self::MalformedFrame { frame, error } => write!(f, "{} (\"{}\")", error, frame),
        }
    }
}

/// Turns frames into readings
///
/// Applies the drift correction, the calibration formulas,
/// rain accumulation, and the plausibility check.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeasurementDecoder {
    table: CalibrationTable,
    limits: PlausibilityLimits,
}

impl MeasurementDecoder {
    /// Decoder with the given bounds
    pub fn new(limits: PlausibilityLimits) -> Self {
        Self {
            table: CalibrationTable::default(),
            limits,
        }
    }

    /// Plausibility bounds
    pub fn limits(&self) -> &PlausibilityLimits {
        &self.limits
    }

    /// Calibrate the values in `frame`
    ///
    /// Returns an error if any token the decoder needs is
    /// missing or is not a hex byte.
    pub fn measure(&self, frame: &RawFrame) -> Result<Measurements, FrameErr> {
        Ok(Measurements {
            temperature: calibration::temperature(self.raw_temperature(frame)?),
            humidity: calibration::humidity(frame.hex_byte(HUMIDITY)?),
            wind_median: calibration::wind(frame.hex_byte(WIND_MEDIAN)?),
            wind_gust: calibration::wind(frame.hex_byte(WIND_GUST)?),
            rain_count: frame.hex_byte(RAIN_COUNT)?,
        })
    }

    /// Decode `frame` into a reading
    ///
    /// Once the frame has been measured, the `rain` counter
    /// takes every step it accepts, even if the reading is then
    /// found implausible: rainfall is measured from the last
    /// counter value heard. Malformed frames leave the counter
    /// untouched.
    pub fn decode(&self, frame: RawFrame, rain: &mut RainCounter, timestamp: f64) -> DecodeOutcome {
        let meas = match self.measure(&frame) {
            Ok(meas) => meas,
            Err(error) => return DecodeOutcome::MalformedFrame { frame, error },
        };

        let step: RainStep = rain.step(meas.rain_count);
        rain.commit(&step);

        if !self
            .limits
            .accepts(meas.temperature, meas.humidity, step.delta_mm())
        {
            return DecodeOutcome::ImplausibleData(Implausible {
                temperature: meas.temperature,
                humidity: meas.humidity,
                rain_mm: step.delta_mm(),
                frame,
            });
        }

        DecodeOutcome::Reading {
            reading: Reading {
                timestamp,
                temperature: meas.temperature,
                humidity: meas.humidity,
                wind_median: meas.wind_median,
                wind_gust: meas.wind_gust,
                rain_mm: step.delta_mm(),
            },
            rain_count: meas.rain_count,
            frame,
        }
    }

    // corrected high byte and low byte, as one 16-bit value
    fn raw_temperature(&self, frame: &RawFrame) -> Result<u16, FrameErr> {
        let hi = self.table.correct(frame.token(TEMPERATURE_HI)?);
        let lo = frame.token(TEMPERATURE_LO)?;
        let joined = format!("{}{}", hi, lo);
        u16::from_str_radix(&joined, 16).map_err(|_| FrameErr::InvalidHex {
            index: TEMPERATURE_HI,
            token: joined,
        })
    }
}
