//! Microsecond timestamps and blocking delays for user-space capture.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

/// Source of microsecond timestamps.
///
/// Timestamps wrap at `u32::MAX`; durations are taken with `wrapping_sub`,
/// so a single wrap between two consecutive readings is harmless.
pub trait Clock {
    /// Current time in microseconds.
    fn now_us(&mut self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_us(&mut self) -> u32 {
        (**self).now_us()
    }
}

/// [`Clock`] backed by the monotonic system clock.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose zero is the moment of creation.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&mut self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_micros() as u32
    }
}

/// [`DelayNs`] implementation that sleeps the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
