//! # otiowx: OTIO WH5100 weather station decoding
//!
//! This crate decodes transmissions from an OTIO WH5100 wireless
//! weather station, as captured by [rtl_433](https://github.com/merbanan/rtl_433)
//! in pulse analyzer mode. It turns the receiver's text output into
//! calibrated temperature, humidity, wind, and rainfall readings.
//!
//! ## Example
//!
//! Run the receiver yourself and collect the lines it writes to
//! standard error. Then:
//!
//! ```
//! use otiowx::{DecodeOutcome, RainCounter, StationDecoderBuilder};
//!
//! # let receiver_lines = || vec![
//! #     "Tuned to 868.305MHz.",
//! #     "[00] {79} 8a 50 65 43 78 05 0a 00 1e 00",
//! # ];
//! // create a decoder with the default frame markers
//! let rx = StationDecoderBuilder::new().build();
//!
//! // the rain gauge reports a running counter, so the decoder
//! // needs the last value you saw. Load it from wherever you
//! // keep it.
//! let mut rain = RainCounter::new(Some(0x1d));
//!
//! match rx.decode(receiver_lines(), &mut rain, 1616883240.0) {
//!     DecodeOutcome::Reading { reading, .. } => {
//!         assert_eq!(27.4, reading.temperature);
//!         assert_eq!(60, reading.humidity);
//!         assert_eq!(0.3, reading.rain_mm);
//!     }
//!     other => panic!("no reading: {}", other),
//! }
//!
//! // save this for next time
//! assert_eq!(Some(0x1e), rain.previous());
//! ```
//!
//! The decoder never fails loudly. Every problem, from a receiver
//! which heard nothing to a frame with impossible values, is a
//! [`DecodeOutcome`](enum.DecodeOutcome.html) variant which you can
//! log before trying again.
//!
//! If you would rather not manage the rain counter yourself,
//! implement [`RainStore`](trait.RainStore.html) and call
//! [`decode_with_store()`](struct.StationDecoder.html#method.decode_with_store).
//!
//! ## Frames
//!
//! In analyzer mode, `rtl_433` prints each demodulated row as a
//! row number, a bit count, and a sequence of hex bytes:
//!
//! ```txt
//! [00] {79} 8a 50 65 43 78 05 0a 00 1e 00
//! ```
//!
//! The WH5100 sends 79 bits. The temperature high byte is known to
//! drift as the station's batteries run down; a small
//! [correction table](struct.CalibrationTable.html) maps the drifted
//! values back before calibration.
//!
//! ## Crate features
//!
//! * `chrono`: Use chrono to stamp readings with the current time
//!   via [`decode_now()`](struct.StationDecoder.html#method.decode_now).
//!

mod builder;
mod calibration;
mod decoder;
mod frame;
mod rain;
mod reading;
mod station;

pub use builder::StationDecoderBuilder;
pub use calibration::{humidity, temperature, wind, CalibrationTable};
pub use decoder::{DecodeOutcome, Implausible, Measurements, MeasurementDecoder, PlausibilityLimits};
pub use frame::{Extraction, FrameErr, FrameExtractor, RawFrame};
pub use rain::{MemoryRainStore, RainCounter, RainStep, RainStepKind, RainStore, MM_PER_TIP};
pub use reading::Reading;
pub use station::StationDecoder;

#[cfg(feature = "chrono")]
pub use station::unix_now;
