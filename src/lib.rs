//! DHT Pulse Capture for Linux User Space
//!
//! This crate captures the raw pulse train of a DHT11/DHT22 (AM2302)
//! temperature and humidity sensor from a general-purpose I/O pin, built on
//! top of the [`embedded-hal`] traits.
//!
//! There is no hardware timestamping or edge interrupt involved: the line is
//! busy-polled while the thread runs under real-time scheduling with locked
//! memory, and every level change is timed against a microsecond clock.
//!
//! # Features
//! - Scoped real-time elevation that is always undone ([`realtime`])
//! - Count-bounded polling, so a dead sensor cannot hang a read
//! - Raw [`PulseSequence`] export plus an optional [`decode`] step
//! - `rpi`: Raspberry Pi line adapter over `rppal` and the `dht-pulses` binary
//!
//! # Dependencies
//! The capture engine depends on the following `embedded-hal` traits:
//! - [`InputPin`] and [`OutputPin`] for the data line
//! - [`DelayNs`] for the wake pulse
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`InputPin`]: embedded_hal::digital::InputPin
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs

pub mod capture;
pub mod clock;
pub mod decode;
pub mod error;
pub mod pulse;
pub mod realtime;

#[cfg(all(feature = "rpi", target_os = "linux"))]
pub mod rpi;

#[cfg(test)]
mod sim;

pub use capture::{CaptureConfig, PulseCapture};
pub use clock::{Clock, MonotonicClock, StdDelay};
pub use decode::{Reading, decode};
pub use error::{DecodeError, DhtError};
pub use pulse::{DATA_BITS, NUM_PULSES, PulseSequence};
pub use realtime::{NoopScheduler, RealtimeGuard, RealtimeMode, Scheduler};

#[cfg(target_os = "linux")]
pub use realtime::LinuxScheduler;
