//! The captured pulse train handed to callers.

use core::ops::Index;

/// Number of data bits transmitted by the sensor per reading.
pub const DATA_BITS: usize = 40;

/// Number of recorded pulses: a low pulse followed by a high pulse per bit.
pub const NUM_PULSES: usize = 2 * DATA_BITS;

/// Ordered pulse durations in microseconds, as observed after the handshake.
///
/// Even indices hold low-level pulses, odd indices the high-level pulse that
/// follows. A pulse that hit the poll timeout carries the timeout bound as
/// its value; there is no separate marker for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PulseSequence {
    durations: [u32; NUM_PULSES],
}

impl PulseSequence {
    pub(crate) fn new(durations: [u32; NUM_PULSES]) -> Self {
        Self { durations }
    }

    /// Durations in capture order.
    pub fn as_slice(&self) -> &[u32] {
        &self.durations
    }

    /// Always [`NUM_PULSES`].
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    /// Never true, the length is fixed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates over the durations in capture order.
    pub fn iter(&self) -> core::slice::Iter<'_, u32> {
        self.durations.iter()
    }

    /// Consumes the sequence, returning the underlying array.
    pub fn into_array(self) -> [u32; NUM_PULSES] {
        self.durations
    }

    /// The `(low, high)` duration pair for each data bit.
    pub fn bit_pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.durations.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Indices of pulses whose value is at least `bound`.
    ///
    /// A capture records a pulse that reached its poll bound as the bound
    /// itself, so passing `CaptureConfig::timeout_count` finds the abandoned
    /// waits. Genuine DHT pulses stay below 100us; keep the bound above that.
    pub fn exceeding(&self, bound: u32) -> impl Iterator<Item = usize> + '_ {
        self.durations
            .iter()
            .enumerate()
            .filter(move |(_, d)| **d >= bound)
            .map(|(i, _)| i)
    }
}

impl Index<usize> for PulseSequence {
    type Output = u32;

    fn index(&self, index: usize) -> &u32 {
        &self.durations[index]
    }
}

impl<'a> IntoIterator for &'a PulseSequence {
    type Item = &'a u32;
    type IntoIter = core::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.durations.iter()
    }
}

impl IntoIterator for PulseSequence {
    type Item = u32;
    type IntoIter = core::array::IntoIter<u32, NUM_PULSES>;

    fn into_iter(self) -> Self::IntoIter {
        self.durations.into_iter()
    }
}

impl From<PulseSequence> for Vec<u32> {
    fn from(sequence: PulseSequence) -> Self {
        sequence.durations.to_vec()
    }
}
