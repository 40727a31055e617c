use bmlite_hal::{MonotonicClock, Timebase, TransportManager};
use embassy_time::{Delay, Instant};

use crate::NrfPlatform;

/// The embassy time driver, running off RTC1.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl MonotonicClock for EmbassyClock {
    fn now_micros(&self) -> u64 {
        Instant::now().as_micros()
    }
}

pub type NrfTimebase = Timebase<EmbassyClock, Delay>;

/// Sensor transport on the nRF52840.
///
/// `embassy_time::Delay` busy-waits when used as a blocking delay, so tasks
/// should use the `_async` lifecycle methods and `SpiLink::read_async`.
pub type NrfTransport = TransportManager<NrfPlatform, EmbassyClock, Delay>;

/// Timebase over the embassy time driver.
pub const fn timebase() -> NrfTimebase {
    Timebase::new(EmbassyClock, Delay)
}

/// Transport owning `platform`, with no session yet.
pub const fn transport(platform: NrfPlatform) -> NrfTransport {
    TransportManager::new(platform, timebase())
}
