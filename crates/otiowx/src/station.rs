//! Complete decoding chain

#[cfg(not(test))]
use log::{debug, error, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;
#[cfg(test)]
use std::println as error;

use crate::builder::StationDecoderBuilder;
use crate::decoder::{DecodeOutcome, MeasurementDecoder};
use crate::frame::{Extraction, FrameExtractor};
use crate::rain::{RainCounter, RainStore};

/// Weather station decoder
///
/// Turns the text output of one receiver run into a
/// [`DecodeOutcome`]. Create one with a
/// [`StationDecoderBuilder`].
///
/// Decoding is a pure function of the receiver output and
/// the rain counter. The decoder itself holds no state
/// between calls and may be reused indefinitely.
#[derive(Clone, Debug)]
pub struct StationDecoder {
    extractor: FrameExtractor,
    decoder: MeasurementDecoder,
}

impl StationDecoder {
    /// Decode receiver output
    ///
    /// Scans `lines` for a frame and decodes it. The `rain`
    /// counter follows every well-formed frame, as described
    /// in [`MeasurementDecoder::decode()`]. The reading is
    /// stamped with `timestamp`, in UNIX seconds.
    pub fn decode<I, S>(&self, lines: I, rain: &mut RainCounter, timestamp: f64) -> DecodeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let frame = match self.extractor.extract(lines) {
            Extraction::Frame(frame) => frame,
            Extraction::NoData => {
                info!("receiver heard nothing");
                return DecodeOutcome::NoData;
            }
            Extraction::SignalError => {
                warn!("receiver reported a signal error");
                return DecodeOutcome::SignalError;
            }
            Extraction::NotFound => {
                info!("receiver output contains no frame");
                return DecodeOutcome::NotFound;
            }
        };

        let out = self.decoder.decode(frame, rain, timestamp);
        match &out {
            DecodeOutcome::Reading {
                reading,
                rain_count,
                ..
            } => {
                debug!("decoded: {} (rain count {})", reading, rain_count)
            }
            DecodeOutcome::ImplausibleData(imp) => warn!("implausible data: {}", imp),
            DecodeOutcome::MalformedFrame { frame, error } => {
                warn!("unable to decode frame \"{}\": {}", frame, error)
            }
            _ => {}
        }

        out
    }

    /// Decode receiver output, stamped with the current time
    #[cfg(feature = "chrono")]
    pub fn decode_now<I, S>(&self, lines: I, rain: &mut RainCounter) -> DecodeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.decode(lines, rain, unix_now())
    }

    /// Run one full decoding cycle against a store
    ///
    /// Loads the previous rain counter from `store`, decodes
    /// `lines`, and persists the counter if it changed.
    ///
    /// Storage errors are logged and never abort the cycle.
    /// If the counter cannot be loaded, the cycle reports no
    /// rain and does not write to the store.
    pub fn decode_with_store<I, S, R>(&self, lines: I, store: &mut R, timestamp: f64) -> DecodeOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: RainStore,
    {
        let mut rain = match store.load() {
            Ok(previous) => RainCounter::new(previous),
            Err(e) => {
                error!("unable to load rain counter: {}", e);
                RainCounter::unavailable()
            }
        };
        let before = rain.previous();

        let out = self.decode(lines, &mut rain, timestamp);

        if rain.previous() != before {
            debug!("rain counter: {:?} → {:?}", before, rain.previous());
            if let Err(e) = store.store(rain.previous()) {
                error!("unable to store rain counter: {}", e);
            }
        }

        out
    }

    /// Frame extraction stage
    pub fn extractor(&self) -> &FrameExtractor {
        &self.extractor
    }

    /// Measurement decoding stage
    pub fn decoder(&self) -> &MeasurementDecoder {
        &self.decoder
    }
}

impl From<&StationDecoderBuilder> for StationDecoder {
    fn from(cfg: &StationDecoderBuilder) -> Self {
        Self {
            extractor: FrameExtractor::new(
                cfg.channel_marker(),
                cfg.length_marker(),
                cfg.no_data_marker(),
                cfg.signal_marker(),
            ),
            decoder: MeasurementDecoder::new(*cfg.limits()),
        }
    }
}

impl Default for StationDecoder {
    fn default() -> Self {
        StationDecoderBuilder::default().build()
    }
}

/// Current time, in UNIX seconds
#[cfg(feature = "chrono")]
pub fn unix_now() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1.0e6
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fmt;

    use crate::decoder::PlausibilityLimits;
    use crate::frame::RawFrame;
    use crate::rain::MemoryRainStore;
    use crate::Reading;

    const NOMINAL: &str = "[00] {79} 8a 50 65 43 78 05 0a 00 1e 00";
    const DRIFTED: &str = "[00] {79} 8a 50 6d 43 78 05 0a 00 1e 00";

    // rtl_433 -A output around a frame
    fn receiver_output(frame: &str) -> Vec<String> {
        vec![
            "rtl_433 version 21.12 branch  at 202112161430 inputs file rtl_tcp RTL-SDR".to_owned(),
            "Tuned to 868.305MHz.".to_owned(),
            "Detected FSK package\t@0.216 s".to_owned(),
            "Analyzing pulses...".to_owned(),
            format!("    {}", frame),
            "[01] {79} 8a 50 65 43 78 05 0a 00 1f 00".to_owned(),
        ]
    }

    #[test]
    fn test_end_to_end() {
        let rx = StationDecoder::default();
        let mut rain = RainCounter::new(Some(0x1d));

        let out = rx.decode(receiver_output(NOMINAL), &mut rain, 1616883240.0);
        assert_eq!(
            out,
            DecodeOutcome::Reading {
                frame: RawFrame::new(NOMINAL),
                reading: Reading {
                    timestamp: 1616883240.0,
                    temperature: 27.4,
                    humidity: 60,
                    wind_median: 3.0,
                    wind_gust: 6.1,
                    rain_mm: 0.3,
                },
                rain_count: 0x1e,
            }
        );
        assert_eq!(rain.previous(), Some(0x1e));
    }

    #[test]
    fn test_drifted_equals_nominal() {
        let rx = StationDecoder::default();

        let mut rain_a = RainCounter::new(Some(0x10));
        let mut rain_b = RainCounter::new(Some(0x10));
        let a = rx.decode(receiver_output(NOMINAL), &mut rain_a, 10.0);
        let b = rx.decode(receiver_output(DRIFTED), &mut rain_b, 10.0);

        assert!(a.is_reading());
        assert_eq!(a, b);
        assert_eq!(rain_a, rain_b);
    }

    #[test]
    fn test_diagnostics_short_circuit() {
        let rx = StationDecoder::default();
        let mut rain = RainCounter::new(Some(1));

        let lines = ["Tuned to 868.305MHz.", "Time expired, exiting!", NOMINAL];
        assert_eq!(rx.decode(lines, &mut rain, 0.0), DecodeOutcome::NoData);

        let lines = ["Signal caught, exiting!", NOMINAL];
        assert_eq!(rx.decode(lines, &mut rain, 0.0), DecodeOutcome::SignalError);

        let lines = ["Tuned to 868.305MHz."];
        assert_eq!(rx.decode(lines, &mut rain, 0.0), DecodeOutcome::NotFound);

        assert_eq!(rain.previous(), Some(1));
    }

    #[test]
    fn test_store_cycle() {
        let rx = StationDecoder::default();
        let mut store = MemoryRainStore::default();

        // first reading sets the baseline
        let out = rx.decode_with_store(receiver_output(NOMINAL), &mut store, 0.0);
        assert_eq!(out.reading().map(|r| r.rain_mm), Some(0.0));
        assert_eq!(store.get(), Some(0x1e));

        // same counter: no rain, nothing changes
        let out = rx.decode_with_store(receiver_output(NOMINAL), &mut store, 0.0);
        assert_eq!(out.reading().map(|r| r.rain_mm), Some(0.0));
        assert_eq!(store.get(), Some(0x1e));

        // counter moves forward by five tips
        let frame = "[00] {79} 8a 50 65 43 78 05 0a 00 23 00";
        let out = rx.decode_with_store(receiver_output(frame), &mut store, 0.0);
        assert_eq!(out.reading().map(|r| r.rain_mm), Some(1.5));
        assert_eq!(store.get(), Some(0x23));

        // implausible temperature: the rain gauge still moved
        let frame = "[00] {79} 8a 50 67 e4 78 05 0a 00 25 00";
        let out = rx.decode_with_store(receiver_output(frame), &mut store, 0.0);
        assert!(matches!(out, DecodeOutcome::ImplausibleData(_)));
        assert_eq!(store.get(), Some(0x25));

        // malformed frame leaves the store alone
        let frame = "[00] {79} 8a 50 65 43 78 05 0a 00 zz 00";
        let out = rx.decode_with_store(receiver_output(frame), &mut store, 0.0);
        assert!(matches!(out, DecodeOutcome::MalformedFrame { .. }));
        assert_eq!(store.get(), Some(0x25));
    }

    #[test]
    fn test_store_recovers_from_reset() {
        let rx = StationDecoder::default();
        let mut store = MemoryRainStore::new(Some(100));

        let mut got = Vec::new();
        for count in ["00", "00", "01", "05", "10", "20"] {
            let frame = format!("[00] {{79}} 8a 50 65 43 78 05 0a 00 {} 00", count);
            let out = rx.decode_with_store(receiver_output(&frame), &mut store, 0.0);
            got.push(out.reading().map(|r| r.rain_mm));
        }

        assert_eq!(
            got,
            vec![None, Some(0.0), Some(0.3), Some(1.2), Some(3.3), Some(4.8)]
        );
        assert_eq!(store.get(), Some(0x20));
    }

    #[derive(Debug)]
    struct BrokenStoreErr;

    impl fmt::Display for BrokenStoreErr {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "broken")
        }
    }

    impl std::error::Error for BrokenStoreErr {}

    #[derive(Default)]
    struct BrokenStore {
        stores: usize,
    }

    impl RainStore for BrokenStore {
        type Error = BrokenStoreErr;

        fn load(&mut self) -> Result<Option<u8>, Self::Error> {
            Err(BrokenStoreErr)
        }

        fn store(&mut self, _previous: Option<u8>) -> Result<(), Self::Error> {
            self.stores += 1;
            Err(BrokenStoreErr)
        }
    }

    #[test]
    fn test_unloadable_store() {
        let rx = StationDecoder::default();
        let mut store = BrokenStore::default();

        let out = rx.decode_with_store(receiver_output(NOMINAL), &mut store, 0.0);
        assert_eq!(out.reading().map(|r| r.rain_mm), Some(0.0));
        assert_eq!(out.reading().map(|r| r.temperature), Some(27.4));
        assert_eq!(store.stores, 0);
    }

    #[test]
    fn test_custom_builder() {
        let rx = StationDecoderBuilder::new()
            .with_channel_marker("[01]")
            .with_limits(PlausibilityLimits {
                max_temperature: 25.0,
                ..PlausibilityLimits::default()
            })
            .build();
        let mut rain = RainCounter::default();

        // [01] line is picked over [00], and 27.4 °C is now too warm
        let out = rx.decode(receiver_output(NOMINAL), &mut rain, 0.0);
        match out {
            DecodeOutcome::ImplausibleData(imp) => {
                assert_eq!(imp.temperature, 27.4);
                assert_eq!(imp.frame.token(10), Ok("1f"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(rain.previous(), Some(0x1f));
    }

    #[test]
    #[cfg(feature = "chrono")]
    fn test_decode_now() {
        let rx = StationDecoder::default();
        let mut rain = RainCounter::default();
        let before = unix_now();
        let out = rx.decode_now(receiver_output(NOMINAL), &mut rain);
        let stamp = out.reading().expect("no reading").timestamp;
        assert!(stamp >= before);
        assert!(stamp < before + 60.0);
    }
}
