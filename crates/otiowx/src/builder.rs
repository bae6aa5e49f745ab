use crate::decoder::PlausibilityLimits;
use crate::frame::{CHANNEL_MARKER, LENGTH_MARKER, NO_DATA_MARKER, SIGNAL_MARKER};
use crate::station::StationDecoder;

/// Builds a weather station decoder
///
/// The builder comes with defaults for an OTIO WH5100
/// station received by `rtl_433` in pulse analyzer mode
/// (`-A`). You only need to change them if your receiver
/// prints something different.
///
/// ```
/// use otiowx::{PlausibilityLimits, StationDecoderBuilder};
///
/// let rx = StationDecoderBuilder::new()
///     .with_channel_marker("[00]")         // row marker of the frame line
///     .with_length_marker("{79}")          // bit count of a WH5100 frame
///     .with_limits(PlausibilityLimits {
///         min_temperature: -30.0,          // for colder climates
///         ..PlausibilityLimits::default()
///     })
///     .build();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StationDecoderBuilder {
    channel_marker: String,
    length_marker: String,
    no_data_marker: String,
    signal_marker: String,
    limits: PlausibilityLimits,
}

impl StationDecoderBuilder {
    /// New decoder with sensible defaults
    pub fn new() -> Self {
        Self {
            channel_marker: CHANNEL_MARKER.to_owned(),
            length_marker: LENGTH_MARKER.to_owned(),
            no_data_marker: NO_DATA_MARKER.to_owned(),
            signal_marker: SIGNAL_MARKER.to_owned(),
            limits: PlausibilityLimits::default(),
        }
    }

    /// Build a decoder
    pub fn build(&self) -> StationDecoder {
        StationDecoder::from(self)
    }

    /// Channel marker
    ///
    /// Frame lines must contain this string. `rtl_433 -A`
    /// prefixes each row of a decoded package with its row
    /// number, like `[00]`.
    pub fn with_channel_marker<S: Into<String>>(&mut self, marker: S) -> &mut Self {
        self.channel_marker = marker.into();
        self
    }

    /// Bit-length marker
    ///
    /// Frame lines must also contain this string, which
    /// `rtl_433 -A` prints as the bit count in braces.
    pub fn with_length_marker<S: Into<String>>(&mut self, marker: S) -> &mut Self {
        self.length_marker = marker.into();
        self
    }

    /// "No data" marker
    ///
    /// Printed by the receiver when its listening period
    /// runs out.
    pub fn with_no_data_marker<S: Into<String>>(&mut self, marker: S) -> &mut Self {
        self.no_data_marker = marker.into();
        self
    }

    /// Signal error marker
    ///
    /// Printed by the receiver when it is interrupted.
    pub fn with_signal_marker<S: Into<String>>(&mut self, marker: S) -> &mut Self {
        self.signal_marker = marker.into();
        self
    }

    /// Plausibility limits
    pub fn with_limits(&mut self, limits: PlausibilityLimits) -> &mut Self {
        self.limits = limits;
        self
    }

    /// Channel marker
    pub fn channel_marker(&self) -> &str {
        &self.channel_marker
    }

    /// Bit-length marker
    pub fn length_marker(&self) -> &str {
        &self.length_marker
    }

    /// "No data" marker
    pub fn no_data_marker(&self) -> &str {
        &self.no_data_marker
    }

    /// Signal error marker
    pub fn signal_marker(&self) -> &str {
        &self.signal_marker
    }

    /// Plausibility limits
    pub fn limits(&self) -> &PlausibilityLimits {
        &self.limits
    }
}

impl Default for StationDecoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
