use core::fmt;

/// Possible errors from a sensor read.
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// Error from the GPIO pin while configuring, driving or sampling the line.
    ///
    /// Fatal to the current read; no partial pulse sequence is returned.
    Pin(E),
    /// The captured pulses could not be decoded into a reading.
    Decode(DecodeError),
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::Pin(value)
    }
}

impl<E: fmt::Debug> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DhtError::Pin(e) => write!(f, "GPIO pin error: {:?}", e),
            DhtError::Decode(e) => write!(f, "decode error: {}", e),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for DhtError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DhtError::Decode(e) => Some(e),
            DhtError::Pin(_) => None,
        }
    }
}

/// Reasons a pulse sequence is rejected by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The low pulse preceding a data bit was outside the protocol window.
    LowPulseOutOfRange {
        /// Bit index, 0 being the most significant bit of the first byte.
        bit: usize,
        /// Measured duration in microseconds.
        duration: u32,
    },
    /// The high pulse of a data bit matched neither a `0` nor a `1`.
    HighPulseOutOfRange { bit: usize, duration: u32 },
    /// Checksum did not match the received data.
    ChecksumMismatch { expected: u8, received: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::LowPulseOutOfRange { bit, duration } => {
                write!(f, "low time of {}us out of tolerance at bit {}", duration, bit)
            }
            DecodeError::HighPulseOutOfRange { bit, duration } => {
                write!(f, "high time of {}us out of tolerance at bit {}", duration, bit)
            }
            DecodeError::ChecksumMismatch { expected, received } => write!(
                f,
                "checksum failure: expected {:#04x}, received {:#04x}",
                expected, received
            ),
        }
    }
}

impl std::error::Error for DecodeError {}
