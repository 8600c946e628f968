//! Turns a captured pulse train into a temperature and humidity reading.
//!
//! Every data bit is a low pulse followed by a high pulse; the length of the
//! high pulse carries the bit value. Timing windows follow section 7.3 of the
//! AM2302 datasheet.

use crate::error::DecodeError;
use crate::pulse::PulseSequence;

/// Inclusive pulse-width window in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub min: u32,
    pub max: u32,
}

impl Timing {
    /// Window from `min` to `max` microseconds, both included.
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `duration` lies within the window.
    pub fn contains(&self, duration: u32) -> bool {
        self.contains_with_tolerance(duration, 0)
    }

    /// Like [`Timing::contains`], widening both ends by `tolerance`.
    pub fn contains_with_tolerance(&self, duration: u32, tolerance: u32) -> bool {
        self.min.saturating_sub(tolerance) <= duration
            && duration <= self.max.saturating_add(tolerance)
    }
}

/// Low time preceding every data bit.
pub const T_LOW: Timing = Timing::new(40, 70);
/// High time of a `0` bit.
pub const T_H0: Timing = Timing::new(20, 40);
/// High time of a `1` bit.
pub const T_H1: Timing = Timing::new(60, 80);

/// Reading decoded from the sensor's response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub relative_humidity: f32,
}

impl Reading {
    /// Temperature in degrees Fahrenheit.
    pub fn fahrenheit(&self) -> f32 {
        self.temperature * 9.0 / 5.0 + 32.0
    }
}

/// Decodes a pulse train, validating every pulse and the checksum.
pub fn decode(pulses: &PulseSequence) -> Result<Reading, DecodeError> {
    let mut bytes = [0u8; 5];

    for (bit, (low, high)) in pulses.bit_pairs().enumerate() {
        if !T_LOW.contains(low) {
            return Err(DecodeError::LowPulseOutOfRange {
                bit,
                duration: low,
            });
        }
        let is_one = if T_H0.contains(high) {
            false
        } else if T_H1.contains(high) {
            true
        } else {
            return Err(DecodeError::HighPulseOutOfRange {
                bit,
                duration: high,
            });
        };
        if is_one {
            bytes[bit / 8] |= 1 << (7 - bit % 8);
        }
    }

    let [data @ .., received] = bytes;
    let expected = data.iter().fold(0u8, |sum, v| sum.wrapping_add(*v));
    if expected != received {
        tracing::debug!(expected, received, "checksum failure");
        return Err(DecodeError::ChecksumMismatch { expected, received });
    }

    Ok(parse_data(data))
}

/// Converts the 4-byte payload into a `Reading`.
///
/// Both values are big-endian tenths. Temperature is sign-magnitude: bit 7
/// of its high byte is the sign, the remaining 15 bits the magnitude, so
/// `0x80 0x65` is -10.1C rather than a two's complement value.
fn parse_data(data: [u8; 4]) -> Reading {
    let [hum_hi, hum_lo, temp_hi, temp_lo] = data;

    let joined_humidity = u16::from_be_bytes([hum_hi, hum_lo]);
    let relative_humidity = joined_humidity as f32 / 10.0;

    let is_temp_negative = (temp_hi >> 7) != 0;
    let temp_hi = temp_hi & 0b0111_1111;
    let joined_temp = u16::from_be_bytes([temp_hi, temp_lo]);
    let mut temperature = joined_temp as f32 / 10.0;
    if is_temp_negative {
        temperature = -temperature;
    }

    Reading {
        temperature,
        relative_humidity,
    }
}
