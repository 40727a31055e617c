//! Millisecond tick source and delays.

use embedded_hal::delay::DelayNs;

/// Free-running microsecond counter, started at boot.
pub trait MonotonicClock {
    /// Microseconds since the counter started. Never decreases.
    fn now_micros(&self) -> u64;
}

/// Milliseconds since the clock started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick(pub u64);

impl Tick {
    /// Milliseconds from `earlier` to `self`.
    pub const fn elapsed_since(self, earlier: Tick) -> u64 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// Tick source plus a delay provider.
pub struct Timebase<C, D> {
    clock: C,
    delay: D,
}

impl<C: MonotonicClock, D> Timebase<C, D> {
    pub const fn new(clock: C, delay: D) -> Self {
        Self { clock, delay }
    }

    /// Nothing to set up: the clock free-runs from reset.
    pub fn init(&mut self) {}

    /// Current tick. The microsecond counter is truncated, not rounded.
    pub fn now(&self) -> Tick {
        Tick(self.clock.now_micros() / 1000)
    }
}

impl<C: MonotonicClock, D: DelayNs> Timebase<C, D> {
    /// Block the caller for at least `ms` milliseconds.
    ///
    /// Whether other work runs meanwhile is up to the delay provider; on an
    /// RTOS it is a task delay.
    pub fn sleep(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

impl<C: MonotonicClock, D: embedded_hal_async::delay::DelayNs> Timebase<C, D> {
    /// Wait at least `ms` milliseconds, yielding to the executor.
    pub async fn sleep_async(&mut self, ms: u32) {
        embedded_hal_async::delay::DelayNs::delay_ms(&mut self.delay, ms).await;
    }
}
