//! Frame extraction from receiver output

use std::fmt;

#[cfg(not(test))]
use log::{debug, trace};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as trace;

use thiserror::Error;

/// Default channel marker printed by `rtl_433 -A`
pub const CHANNEL_MARKER: &str = "[00]";

/// Default bit-length marker of a WH5100 transmission
pub const LENGTH_MARKER: &str = "{79}";

/// Printed when the listening period ends without any signal
pub const NO_DATA_MARKER: &str = "Time expired";

/// Printed when the receiver aborts
pub const SIGNAL_MARKER: &str = "Signal caught";

/// One tokenized transmission
///
/// A `RawFrame` holds the whitespace-delimited tokens of a
/// single line of receiver output. The WH5100 places its
/// measurements at fixed positions:
///
/// | index | content                          |
/// |-------|----------------------------------|
/// | 4     | temperature, high byte (drifts)  |
/// | 5     | temperature, low byte            |
/// | 6     | humidity                         |
/// | 7     | wind median                      |
/// | 8     | wind gust                        |
/// | 10    | rain tip counter                 |
///
/// Every position holds a hexadecimal byte. Other tokens
/// are carried along but never interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawFrame {
    tokens: Vec<String>,
}

/// Error reading a value out of a `RawFrame`
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameErr {
    /// The frame is too short
    #[error("malformed frame: no token at position {0}")]
    MissingToken(usize),

    /// The token at this position is not a hex number of the right width
    #[error("malformed frame: token \"{token}\" at position {index} is not a valid hex value")]
    InvalidHex { index: usize, token: String },
}

impl RawFrame {
    /// Split `line` on whitespace
    pub fn new<S>(line: S) -> Self
    where
        S: AsRef<str>,
    {
        Self {
            tokens: line
                .as_ref()
                .split_whitespace()
                .map(str::to_owned)
                .collect(),
        }
    }

    /// All tokens, in order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if the frame has no tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at `index`
    pub fn token(&self, index: usize) -> Result<&str, FrameErr> {
        self.tokens
            .get(index)
            .map(String::as_str)
            .ok_or(FrameErr::MissingToken(index))
    }

    /// Token at `index`, parsed as a hex byte
    pub fn hex_byte(&self, index: usize) -> Result<u8, FrameErr> {
        let token = self.token(index)?;
        u8::from_str_radix(token, 16).map_err(|_| FrameErr::InvalidHex {
            index,
            token: token.to_owned(),
        })
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

impl From<&str> for RawFrame {
    fn from(line: &str) -> Self {
        Self::new(line)
    }
}

/// Result of scanning receiver output
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Extraction {
    /// The first matching line
    Frame(RawFrame),

    /// The receiver listened but heard nothing
    NoData,

    /// The receiver reported an error and aborted
    SignalError,

    /// Output ended with no frame and no diagnostic
    NotFound,
}

/// Locates a WH5100 frame in receiver output
///
/// A frame line contains both a channel marker and a
/// bit-length marker. The first such line wins. Two
/// diagnostic lines stop the scan early if they appear
/// before any frame: the "no data" marker, which the
/// receiver prints when its listening period expires,
/// and the "signal" marker, which it prints when it is
/// interrupted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameExtractor {
    channel_marker: String,
    length_marker: String,
    no_data_marker: String,
    signal_marker: String,
}

impl FrameExtractor {
    /// Extractor with custom markers
    pub fn new<S>(channel: S, length: S, no_data: S, signal: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            channel_marker: channel.into(),
            length_marker: length.into(),
            no_data_marker: no_data.into(),
            signal_marker: signal.into(),
        }
    }

    /// Scan `lines` for a frame
    ///
    /// Lines are examined in order and no further than the
    /// first frame or diagnostic line. Nothing is retained
    /// between calls.
    pub fn extract<I, S>(&self, lines: I) -> Extraction
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref();
            if self.is_frame(line) {
                debug!("frame line: \"{}\"", line);
                return Extraction::Frame(RawFrame::new(line));
            } else if line.contains(&self.no_data_marker) {
                return Extraction::NoData;
            } else if line.contains(&self.signal_marker) {
                return Extraction::SignalError;
            }

            trace!("skipping receiver line: \"{}\"", line);
        }

        Extraction::NotFound
    }

    /// True if `line` carries both frame markers
    pub fn is_frame(&self, line: &str) -> bool {
        line.contains(&self.channel_marker) && line.contains(&self.length_marker)
    }

    /// Channel marker
    pub fn channel_marker(&self) -> &str {
        &self.channel_marker
    }

    /// Bit-length marker
    pub fn length_marker(&self) -> &str {
        &self.length_marker
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(CHANNEL_MARKER, LENGTH_MARKER, NO_DATA_MARKER, SIGNAL_MARKER)
    }
}
