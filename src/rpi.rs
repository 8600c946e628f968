//! Raspberry Pi host glue over `rppal`.

use core::convert::Infallible;
use std::fmt;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use rppal::gpio::{Gpio, IoPin, Mode, Bias};

use crate::capture::PulseCapture;
use crate::clock::{MonotonicClock, StdDelay};
use crate::error::DhtError;
use crate::pulse::PulseSequence;
use crate::realtime::LinuxScheduler;

/// Errors from [`read_sensor`].
#[derive(Debug)]
pub enum HostError {
    /// The GPIO peripheral or the pin could not be acquired.
    Gpio(rppal::gpio::Error),
    /// The capture itself failed.
    Capture(DhtError<Infallible>),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Gpio(e) => write!(f, "GPIO error: {}", e),
            HostError::Capture(e) => write!(f, "capture error: {}", e),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HostError::Gpio(e) => Some(e),
            HostError::Capture(e) => Some(e),
        }
    }
}

impl From<rppal::gpio::Error> for HostError {
    fn from(e: rppal::gpio::Error) -> Self {
        HostError::Gpio(e)
    }
}

/// A BCM-numbered data line switched between output and pulled-up input.
///
/// `set_low` configures the pin as an output driving low; `set_high`
/// releases it to an input with the internal pull-up enabled.
pub struct RpiLine {
    pin: IoPin,
}

impl RpiLine {
    /// Acquires BCM pin `bcm_pin` as a pulled-up input.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Gpio` if the GPIO peripheral is unavailable or the
    /// pin is already in use.
    pub fn open(bcm_pin: u8) -> Result<Self, HostError> {
        let mut pin = Gpio::new()?.get(bcm_pin)?.into_io(Mode::Input);
        pin.set_bias(Bias::PullUp);
        Ok(Self { pin })
    }
}

impl ErrorType for RpiLine {
    type Error = Infallible;
}

impl OutputPin for RpiLine {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.pin.set_low();
        self.pin.set_mode(Mode::Output);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.pin.set_mode(Mode::Input);
        self.pin.set_bias(Bias::PullUp);
        Ok(())
    }
}

impl InputPin for RpiLine {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.pin.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.pin.is_low())
    }
}

/// Reads the raw pulse train of the sensor on BCM pin `bcm_pin`.
///
/// Runs the capture under `SCHED_FIFO` with locked memory when the process
/// is allowed to; otherwise logs a warning and captures anyway.
pub fn read_sensor(bcm_pin: u8) -> Result<PulseSequence, HostError> {
    let line = RpiLine::open(bcm_pin)?;
    let mut capture = PulseCapture::new(line, StdDelay, MonotonicClock::new());
    let mut scheduler = LinuxScheduler::new();

    tracing::debug!(pin = bcm_pin, "reading DHT sensor");
    capture
        .read_pulses(&mut scheduler)
        .map_err(HostError::Capture)
}
