use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal::spi::Error as _;
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;

use crate::config::PinConfig;
use crate::device::FullDuplex;
use crate::error::Error;
use crate::platform::Platform;
use crate::timebase::{MonotonicClock, Timebase};

/// Reset line level that holds the sensor in reset (active low).
pub const RESET_ACTIVE_LEVEL: PinState = PinState::Low;
/// Reset line level that lets the sensor run.
pub const RESET_INACTIVE_LEVEL: PinState = PinState::High;
/// Status line level meaning "sensor ready" (active high).
pub const STATUS_READY_LEVEL: PinState = PinState::High;

/// How long the reset line is held asserted during a reset pulse.
pub const RESET_ASSERT_MS: u32 = 100;
/// Boot time granted to the sensor after reset is released.
pub const RESET_SETTLE_MS: u32 = 100;

/// An attached sensor: bus device plus its reset and status lines.
///
/// Only [`TransportManager::init`](crate::TransportManager::init) creates a
/// session and only `deinit` destroys it, so holding a `&mut Session` proves
/// the bus is configured.
pub struct Session<P: Platform> {
    pub(crate) device: P::Device,
    pub(crate) reset: P::Reset,
    pub(crate) status: P::Status,
    pub(crate) pins: PinConfig<P::Pin, P::BusId>,
    pub(crate) timeout_ms: u32,
}

impl<P: Platform> Session<P> {
    /// Exchange exactly `len` bytes: `write[..len]` goes out while
    /// `read[..len]` is filled.
    ///
    /// `len == 0` succeeds without touching the peripheral. With
    /// `hold_select` the device stays selected after the call so the next
    /// exchange continues the same transaction.
    pub fn exchange(
        &mut self,
        write: &[u8],
        read: &mut [u8],
        len: usize,
        hold_select: bool,
    ) -> Result<(), Error<P::Error>> {
        if len == 0 {
            return Ok(());
        }
        if write.len() < len || read.len() < len {
            return Err(Error::InvalidArgument);
        }

        self.device
            .transfer(&mut read[..len], &write[..len], hold_select)
            .map_err(|e| {
                #[cfg(feature = "defmt")]
                defmt::error!("SPI transfer of {} bytes failed", len);
                Error::Io(e.kind())
            })
    }

    /// Drive the reset line. `true` holds the sensor in reset.
    pub fn assert_reset(&mut self, active: bool) {
        drive_reset(&mut self.reset, active);
    }

    /// `true` when the sensor signals ready on the status line.
    pub fn read_status(&mut self) -> bool {
        let high = match self.status.is_high() {
            Ok(high) => high,
            Err(never) => match never {},
        };
        high == (STATUS_READY_LEVEL == PinState::High)
    }

    /// Hold the sensor in reset, then release it and let it boot.
    pub fn pulse_reset<C, D>(&mut self, timebase: &mut Timebase<C, D>)
    where
        C: MonotonicClock,
        D: DelayNs,
    {
        pulse_reset_line(&mut self.reset, timebase);
    }

    /// [`pulse_reset`](Self::pulse_reset), yielding to the executor while
    /// the sensor is held in reset and while it boots.
    pub async fn pulse_reset_async<C, D>(
        &mut self,
        timebase: &mut Timebase<C, D>,
    ) where
        C: MonotonicClock,
        D: AsyncDelayNs,
    {
        pulse_reset_line_async(&mut self.reset, timebase).await;
    }

    /// Pins this session was configured with.
    pub fn pins(&self) -> &PinConfig<P::Pin, P::BusId> {
        &self.pins
    }

    /// Receive timeout in milliseconds.
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

pub(crate) fn drive_reset<R>(reset: &mut R, active: bool)
where
    R: OutputPin<Error = Infallible>,
{
    let level = if active { RESET_ACTIVE_LEVEL } else { RESET_INACTIVE_LEVEL };
    match reset.set_state(level) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

pub(crate) fn pulse_reset_line<R, C, D>(
    reset: &mut R,
    timebase: &mut Timebase<C, D>,
) where
    R: OutputPin<Error = Infallible>,
    C: MonotonicClock,
    D: DelayNs,
{
    drive_reset(reset, true);
    timebase.sleep(RESET_ASSERT_MS);
    drive_reset(reset, false);
    timebase.sleep(RESET_SETTLE_MS);
}

pub(crate) async fn pulse_reset_line_async<R, C, D>(
    reset: &mut R,
    timebase: &mut Timebase<C, D>,
) where
    R: OutputPin<Error = Infallible>,
    C: MonotonicClock,
    D: AsyncDelayNs,
{
    drive_reset(reset, true);
    timebase.sleep_async(RESET_ASSERT_MS).await;
    drive_reset(reset, false);
    timebase.sleep_async(RESET_SETTLE_MS).await;
}
