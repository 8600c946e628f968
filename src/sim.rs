//! Simulated sensor line for capture tests.
//!
//! Time only moves when the code under test touches the line: each pin read
//! costs `poll_cost_us`, delays advance by their length. A level change
//! scripted at time `t` is therefore observed by the first read at or after
//! `t`, which makes measured durations exact for a 1us poll cost.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

use crate::clock::Clock;

/// Sensor release time after the host lets go of the line.
pub const HOST_RELEASE_US: u32 = 20;
/// Sensor response: low then high, 80us each.
pub const RESPONSE_US: u32 = 80;
/// Low pulse preceding each data bit.
pub const BIT_LOW_US: u32 = 50;
pub const BIT_ZERO_US: u32 = 26;
pub const BIT_ONE_US: u32 = 70;

/// Shared simulated time in microseconds.
#[derive(Clone, Debug, Default)]
pub struct SimTime(Rc<Cell<u32>>);

impl SimTime {
    pub fn starting_at(us: u32) -> Self {
        Self(Rc::new(Cell::new(us)))
    }

    pub fn now(&self) -> u32 {
        self.0.get()
    }

    pub fn advance(&self, us: u32) {
        self.0.set(self.0.get().wrapping_add(us));
    }
}

impl Clock for SimTime {
    fn now_us(&mut self) -> u32 {
        self.now()
    }
}

impl DelayNs for SimTime {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns.div_ceil(1_000));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl digital::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One sensor response: alternating level durations after release.
#[derive(Debug, Clone)]
pub struct Frame {
    first_high: bool,
    durations: Vec<u32>,
    idle_high: bool,
}

impl Frame {
    /// Full DHT response around the given data pulses, which start low.
    ///
    /// The line is high for [`HOST_RELEASE_US`], the sensor answers low and
    /// high for [`RESPONSE_US`] each, sends the data pulses, then ends the
    /// frame with a final low pulse before idling high.
    pub fn dht(data: &[u32]) -> Self {
        let mut durations = vec![HOST_RELEASE_US, RESPONSE_US, RESPONSE_US];
        durations.extend_from_slice(data);
        durations.push(BIT_LOW_US);
        Self {
            first_high: true,
            durations,
            idle_high: true,
        }
    }

    /// Arbitrary alternating levels, the first one being `first_high`.
    pub fn levels(first_high: bool, durations: &[u32]) -> Self {
        let idle_high = if durations.len() % 2 == 0 {
            first_high
        } else {
            !first_high
        };
        Self {
            first_high,
            durations: durations.to_vec(),
            idle_high,
        }
    }

    /// A line that never changes level after release.
    pub fn stuck(high: bool) -> Self {
        Self {
            first_high: high,
            durations: Vec::new(),
            idle_high: high,
        }
    }

    fn level_at(&self, elapsed: u32) -> bool {
        let mut start = 0u32;
        for (k, d) in self.durations.iter().enumerate() {
            if elapsed < start + d {
                return self.first_high == (k % 2 == 0);
            }
            start += d;
        }
        self.idle_high
    }
}

/// Open-drain data line with a scripted sensor on the other end.
///
/// Every release (`set_high` after `set_low`) starts the next queued frame.
#[derive(Debug, Clone)]
pub struct SimLine {
    time: SimTime,
    poll_cost_us: u32,
    frames: VecDeque<Frame>,
    current: Option<(Frame, u32)>,
    driven_low: bool,
    fail_set_low: bool,
    fail_read_after: Option<usize>,
    reads: usize,
}

impl SimLine {
    pub fn new(time: SimTime) -> Self {
        Self {
            time,
            poll_cost_us: 1,
            frames: VecDeque::new(),
            current: None,
            driven_low: false,
            fail_set_low: false,
            fail_read_after: None,
            reads: 0,
        }
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push_back(frame);
        self
    }

    /// Time charged for every pin read.
    pub fn with_poll_cost(mut self, us: u32) -> Self {
        self.poll_cost_us = us;
        self
    }

    /// Driving the line low fails, as if the pin could not be configured.
    pub fn failing_output(mut self) -> Self {
        self.fail_set_low = true;
        self
    }

    /// Reads fail once `reads` successful reads happened.
    pub fn failing_read_after(mut self, reads: usize) -> Self {
        self.fail_read_after = Some(reads);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    fn level(&self) -> bool {
        if self.driven_low {
            return false;
        }
        match &self.current {
            Some((frame, released_at)) => {
                frame.level_at(self.time.now().wrapping_sub(*released_at))
            }
            None => true,
        }
    }
}

impl ErrorType for SimLine {
    type Error = SimError;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), SimError> {
        if self.fail_set_low {
            return Err(SimError);
        }
        self.driven_low = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimError> {
        if self.driven_low {
            self.driven_low = false;
            let frame = self.frames.pop_front().unwrap_or_else(|| Frame::stuck(true));
            self.current = Some((frame, self.time.now()));
        }
        Ok(())
    }
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, SimError> {
        if self.fail_read_after.is_some_and(|n| self.reads >= n) {
            return Err(SimError);
        }
        self.reads += 1;
        self.time.advance(self.poll_cost_us);
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, SimError> {
        self.is_high().map(|high| !high)
    }
}

/// Data pulses for five bytes, MSB first.
pub fn encode_bytes(bytes: [u8; 5]) -> Vec<u32> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |i| (byte >> (7 - i)) & 1))
        .flat_map(|bit| {
            [
                BIT_LOW_US,
                if bit == 1 { BIT_ONE_US } else { BIT_ZERO_US },
            ]
        })
        .collect()
}
