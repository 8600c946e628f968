use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::clock::Clock;
use crate::decode::{Reading, decode};
use crate::error::DhtError;
use crate::pulse::{NUM_PULSES, PulseSequence};
use crate::realtime::{RealtimeGuard, Scheduler};

/// How long the host holds the line low to wake the sensor.
pub const WAKE_HOLD_MS: u32 = 1;

/// Level changes seen before the first data pulse: the edge at release, the
/// host release time, and the sensor's 80us low and 80us high response.
pub const HANDSHAKE_PULSES: usize = 4;

/// Maximum number of polls spent waiting for a single level change.
///
/// Count-based rather than time-based; the wall-clock equivalent depends on
/// the cost of a pin read. A pulse that reaches the bound is recorded with
/// this value as its duration.
pub const TIMEOUT_COUNT: u32 = 10_000;

/// Tunables for a capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Wake pulse length in milliseconds.
    pub wake_hold_ms: u32,
    /// Low/high pulse pairs dropped before recording. Counting pairs keeps
    /// the first recorded pulse a low one.
    pub handshake_pairs: usize,
    /// Poll bound per level change, also the duration recorded for a pulse
    /// that reaches it.
    pub timeout_count: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            wake_hold_ms: WAKE_HOLD_MS,
            handshake_pairs: HANDSHAKE_PULSES / 2,
            timeout_count: TIMEOUT_COUNT,
        }
    }
}

/// Pulse capture engine for one DHT data line.
pub struct PulseCapture<PIN, D, C> {
    pin: PIN,
    delay: D,
    clock: C,
    config: CaptureConfig,
}

impl<PIN, DELAY, CLOCK, E> PulseCapture<PIN, DELAY, CLOCK>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Creates a new capture engine with the default [`CaptureConfig`].
    ///
    /// # Arguments
    ///
    /// * `pin` - The data line. `set_low` must drive it low, `set_high` must
    ///   release it to the pull-up so the sensor can drive it.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    /// * `clock` - Microsecond timestamp source.
    pub fn new(pin: PIN, delay: DELAY, clock: CLOCK) -> Self {
        PulseCapture {
            pin,
            delay,
            clock,
            config: CaptureConfig::default(),
        }
    }

    /// Replaces the capture settings.
    ///
    /// # Arguments
    ///
    /// * `config` - Wake pulse length, handshake pairs and poll bound.
    pub fn with_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the settings used by the next read.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Gives back the pin, delay and clock.
    pub fn release(self) -> (PIN, DELAY, CLOCK) {
        (self.pin, self.delay, self.clock)
    }

    /// Captures one pulse train from the sensor.
    ///
    /// The thread is elevated through `scheduler` for the whole exchange and
    /// restored before returning, on success and on error alike. A pulse that
    /// hits the poll bound is recorded as `config().timeout_count`, so callers
    /// can find it with [`PulseSequence::exceeding`].
    ///
    /// # Returns
    ///
    /// * `Ok(PulseSequence)` with exactly [`NUM_PULSES`] durations.
    /// * `Err(DhtError::Pin)` if driving or reading the line failed.
    pub fn read_pulses<S>(&mut self, scheduler: &mut S) -> Result<PulseSequence, DhtError<E>>
    where
        S: Scheduler + ?Sized,
    {
        let realtime = RealtimeGuard::enter(scheduler);
        self.start()?;
        let pulses = self.sample(&realtime)?;
        drop(realtime);

        tracing::trace!(pulses = ?pulses.as_slice(), "captured pulse train");
        Ok(pulses)
    }

    /// Captures a pulse train and decodes it into a [`Reading`].
    ///
    /// Single attempt. A decode failure usually means a pulse was missed or
    /// stretched; wait for the sensor's sampling period (2s for a DHT22)
    /// before trying again.
    pub fn read<S>(&mut self, scheduler: &mut S) -> Result<Reading, DhtError<E>>
    where
        S: Scheduler + ?Sized,
    {
        let pulses = self.read_pulses(scheduler)?;
        decode(&pulses).map_err(DhtError::Decode)
    }

    /// Sends the start signal: the line is held low, then released.
    fn start(&mut self) -> Result<(), DhtError<E>> {
        self.pin.set_low()?;
        self.delay.delay_ms(self.config.wake_hold_ms);
        self.pin.set_high()?;
        Ok(())
    }

    /// Times every level change, dropping the handshake by index offset.
    fn sample<S>(&mut self, _realtime: &RealtimeGuard<'_, S>) -> Result<PulseSequence, DhtError<E>>
    where
        S: Scheduler + ?Sized,
    {
        let handshake = self.config.handshake_pairs.saturating_mul(2);
        let total = handshake.saturating_add(NUM_PULSES);
        let bound = self.config.timeout_count;
        let mut durations = [0u32; NUM_PULSES];
        let mut timeouts = 0usize;
        let mut expected_high = false;
        let mut prev = self.clock.now_us();

        for i in 0..total {
            let changed = self.wait_while(expected_high)?;
            let now = self.clock.now_us();
            if !changed {
                timeouts += 1;
            }
            if i >= handshake {
                durations[i - handshake] = if changed {
                    now.wrapping_sub(prev)
                } else {
                    bound
                };
            }
            prev = now;
            expected_high = !expected_high;
        }

        if timeouts > 0 {
            tracing::debug!(timeouts, "level changes timed out during capture");
        }
        Ok(PulseSequence::new(durations))
    }

    /// Polls while the line is at `high`.
    ///
    /// Returns `false` if the poll bound was reached before the level changed.
    fn wait_while(&mut self, high: bool) -> Result<bool, E> {
        let mut count = 0;
        while self.pin.is_high()? == high {
            count += 1;
            if count >= self.config.timeout_count {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
