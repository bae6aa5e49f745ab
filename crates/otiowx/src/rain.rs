//! Rain gauge accumulation
//!
//! The WH5100 rain gauge is a tipping bucket. Each tip adds
//! one to an 8-bit counter which is transmitted in every
//! frame. Rainfall is the difference between two counter
//! values, so the last trusted value must be kept between
//! readings.
//!
//! The counter wraps around. Observed counters run through
//! `0..=254` before rolling over, which is why the rollover
//! arithmetic uses `255` rather than `256`.

use std::convert::Infallible;

use crate::calibration::round_tenths;

/// Rainfall per bucket tip (mm)
pub const MM_PER_TIP: f64 = 0.3;

/// Counter period used to unwrap a rollover
const ROLLOVER_PERIOD: u16 = 255;

/// Unwrapped distances of this many tips or more are noise
const MAX_ROLLOVER_TIPS: u16 = 254;

/// Rain counter state
///
/// Holds the previous counter value, if any. Use
/// [`step()`](#method.step) to compute the rainfall for a
/// new counter value and [`commit()`](#method.commit) to
/// accept it.
///
/// A counter may also be *unavailable*, which happens when
/// its persisted value could not be read. An unavailable
/// counter reports no rain and never changes, so whatever
/// was persisted is left alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct RainCounter {
    previous: Option<u8>,
    unavailable: bool,
}

/// How a counter value was interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RainStepKind {
    /// No previous value: this one becomes the baseline
    Baseline,

    /// The counter moved forward
    Advance,

    /// The counter rolled over and kept going
    Rollover,

    /// The counter did not move, or moved in a way that
    /// does not make physical sense
    Rejected,

    /// The counter is unavailable
    Unavailable,
}

/// Rainfall computed for one counter value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RainStep {
    delta_mm: f64,
    current: u8,
    kind: RainStepKind,
}

impl RainCounter {
    /// Counter with the given previous value
    pub fn new(previous: Option<u8>) -> Self {
        Self {
            previous,
            unavailable: false,
        }
    }

    /// Counter whose persisted state could not be loaded
    pub fn unavailable() -> Self {
        Self {
            previous: None,
            unavailable: true,
        }
    }

    /// Previous counter value
    pub fn previous(&self) -> Option<u8> {
        self.previous
    }

    /// True if the counter is unavailable
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Compute rainfall since the previous value
    ///
    /// Does not change the counter. Given the `current`
    /// counter value,
    ///
    /// * with no previous value, there is nothing to diff
    ///   against and the rainfall is zero;
    ///
    /// * if `current` is larger, the rainfall is the
    ///   difference times [`MM_PER_TIP`];
    ///
    /// * otherwise the counter is assumed to have rolled
    ///   over. The forward distance is
    ///   `current + 255 - previous`. Distances below 254
    ///   are accepted. Larger ones, which only occur when the
    ///   counter is unchanged or one behind, are rejected
    ///   with zero rainfall.
    pub fn step(&self, current: u8) -> RainStep {
        let (kind, tips) = match self.previous {
            _ if self.unavailable => (RainStepKind::Unavailable, 0),
            None => (RainStepKind::Baseline, 0),
            Some(previous) if current > previous => {
                (RainStepKind::Advance, (current - previous) as u16)
            }
            Some(previous) => {
                let wrapped = current as u16 + ROLLOVER_PERIOD - previous as u16;
                if wrapped < MAX_ROLLOVER_TIPS {
                    (RainStepKind::Rollover, wrapped)
                } else {
                    (RainStepKind::Rejected, 0)
                }
            }
        };

        RainStep {
            delta_mm: round_tenths(tips as f64 * MM_PER_TIP),
            current,
            kind,
        }
    }

    /// Accept a step
    ///
    /// Moves the counter to the step's value if the step was
    /// accepted. Returns true if the previous value changed
    /// and needs to be persisted.
    pub fn commit(&mut self, step: &RainStep) -> bool {
        if !step.is_accepted() || self.previous == Some(step.current) {
            return false;
        }

        self.previous = Some(step.current);
        true
    }

    /// Step and commit in one go
    pub fn advance(&mut self, current: u8) -> RainStep {
        let step = self.step(current);
        self.commit(&step);
        step
    }
}

impl RainStep {
    /// Rainfall (mm), never negative
    pub fn delta_mm(&self) -> f64 {
        self.delta_mm
    }

    /// The counter value this step was computed for
    pub fn current(&self) -> u8 {
        self.current
    }

    /// Interpretation of the counter value
    pub fn kind(&self) -> RainStepKind {
        self.kind
    }

    /// True if the counter should move to this value
    pub fn is_accepted(&self) -> bool {
        matches!(
            self.kind,
            RainStepKind::Baseline | RainStepKind::Advance | RainStepKind::Rollover
        )
    }
}

/// Persistent storage for the previous counter value
///
/// The decoder reads the previous value once before it
/// decodes and writes it back once afterwards, and only if
/// it changed. Implementations decide how and where the
/// value lives.
pub trait RainStore {
    /// Error type for storage operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the previous value, or `None` if there is none yet
    fn load(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Replace the previous value
    fn store(&mut self, previous: Option<u8>) -> Result<(), Self::Error>;
}

/// Keeps the previous counter value in memory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct MemoryRainStore {
    previous: Option<u8>,
}

impl MemoryRainStore {
    /// Store holding `previous`
    pub fn new(previous: Option<u8>) -> Self {
        Self { previous }
    }

    /// Current value
    pub fn get(&self) -> Option<u8> {
        self.previous
    }
}

impl RainStore for MemoryRainStore {
    type Error = Infallible;

    fn load(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.previous)
    }

    fn store(&mut self, previous: Option<u8>) -> Result<(), Self::Error> {
        self.previous = previous;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline() {
        let mut rc = RainCounter::default();
        let step = rc.advance(10);
        assert_eq!(step.kind(), RainStepKind::Baseline);
        assert_eq!(step.delta_mm(), 0.0);
        assert_eq!(rc.previous(), Some(10));
    }

    #[test]
    fn test_advance() {
        let mut rc = RainCounter::new(Some(10));
        let step = rc.advance(15);
        assert_eq!(step.kind(), RainStepKind::Advance);
        assert_eq!(step.delta_mm(), 1.5);
        assert_eq!(rc.previous(), Some(15));

        let step = rc.advance(48);
        assert_eq!(step.delta_mm(), 9.9);
        assert_eq!(rc.previous(), Some(48));

        let mut rc = RainCounter::new(Some(0));
        assert_eq!(rc.advance(255).delta_mm(), 76.5);
    }

    #[test]
    fn test_rollover() {
        let mut rc = RainCounter::new(Some(250));
        let step = rc.advance(5);
        assert_eq!(step.kind(), RainStepKind::Rollover);
        assert_eq!(step.delta_mm(), 3.0);
        assert_eq!(rc.previous(), Some(5));

        // 240 + 255 - 250 = 245, still a plausible rollover
        let rc = RainCounter::new(Some(250));
        let step = rc.step(240);
        assert_eq!(step.kind(), RainStepKind::Rollover);
        assert_eq!(step.delta_mm(), 73.5);

        // 248 + 255 - 250 = 253 is the largest accepted distance
        let step = rc.step(248);
        assert_eq!(step.kind(), RainStepKind::Rollover);
        assert_eq!(step.delta_mm(), 75.9);
    }

    #[test]
    fn test_rejected() {
        // unchanged counter: 250 + 255 - 250 = 255
        let mut rc = RainCounter::new(Some(250));
        let step = rc.advance(250);
        assert_eq!(step.kind(), RainStepKind::Rejected);
        assert_eq!(step.delta_mm(), 0.0);
        assert_eq!(rc.previous(), Some(250));

        // one behind: 249 + 255 - 250 = 254
        let step = rc.advance(249);
        assert_eq!(step.kind(), RainStepKind::Rejected);
        assert_eq!(step.delta_mm(), 0.0);
        assert_eq!(rc.previous(), Some(250));

        let mut rc = RainCounter::new(Some(0));
        let step = rc.step(0);
        assert!(!rc.commit(&step));
        assert_eq!(rc.previous(), Some(0));
    }

    #[test]
    fn test_step_is_pure() {
        let rc = RainCounter::new(Some(10));
        let step = rc.step(20);
        assert_eq!(step.current(), 20);
        assert!(step.is_accepted());
        assert_eq!(rc.previous(), Some(10));

        let mut rc2 = rc;
        assert!(rc2.commit(&step));
        assert!(!rc2.commit(&step));
        assert_eq!(rc2.previous(), Some(20));
    }

    #[test]
    fn test_unavailable() {
        let mut rc = RainCounter::unavailable();
        assert!(rc.is_unavailable());
        for current in [0u8, 10, 255] {
            let step = rc.advance(current);
            assert_eq!(step.kind(), RainStepKind::Unavailable);
            assert_eq!(step.delta_mm(), 0.0);
            assert!(!step.is_accepted());
        }
        assert_eq!(rc.previous(), None);
    }

    #[test]
    fn test_delta_never_negative() {
        for previous in 0..=255u8 {
            let rc = RainCounter::new(Some(previous));
            for current in 0..=255u8 {
                assert!(rc.step(current).delta_mm() >= 0.0);
            }
        }
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryRainStore::default();
        assert_eq!(store.load(), Ok(None));
        store.store(Some(42)).unwrap();
        assert_eq!(store.load(), Ok(Some(42)));
        assert_eq!(store.get(), Some(42));
        assert_eq!(MemoryRainStore::new(Some(7)).get(), Some(7));
    }
}
