//! Physical-layer I/O handed to the host communication protocol.

use embedded_hal::delay::DelayNs;
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;

use crate::error::Error;
use crate::platform::Platform;
use crate::session::Session;
use crate::timebase::{MonotonicClock, Tick, Timebase};

/// Bytes moved per exchange. Longer frames are split with chip-select held.
pub const CHUNK_SIZE: usize = 256;

/// Interval between status line polls while waiting for the sensor.
pub const READY_POLL_MS: u32 = 1;

/// Transport-agnostic byte I/O used by the protocol layer.
pub trait PhyLink {
    type Error;

    /// Send `data` to the sensor.
    fn write(&mut self, data: &[u8], timeout_ms: u32)
        -> Result<(), Self::Error>;

    /// Fill `buf` from the sensor, waiting up to `timeout_ms` for it to
    /// signal ready. A timeout of zero waits forever.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32)
        -> Result<(), Self::Error>;

    /// Receive timeout configured at init, in milliseconds.
    fn rx_timeout(&self) -> u32;
}

/// [`PhyLink`] over the active SPI session.
///
/// The blocking [`PhyLink`] methods wait through the timebase's blocking
/// delay. On an executor, prefer [`read_async`](Self::read_async), which
/// yields between status polls.
pub struct SpiLink<'a, P: Platform, C, D> {
    session: &'a mut Session<P>,
    timebase: &'a mut Timebase<C, D>,
}

impl<'a, P, C, D> SpiLink<'a, P, C, D>
where
    P: Platform,
    C: MonotonicClock,
{
    pub(crate) fn new(
        session: &'a mut Session<P>,
        timebase: &'a mut Timebase<C, D>,
    ) -> Self {
        Self { session, timebase }
    }

    /// `Ok(true)` once the sensor is ready, `Err(Timeout)` once `timeout_ms`
    /// has passed since `start`.
    fn check_ready(
        &mut self,
        start: Tick,
        timeout_ms: u32,
    ) -> Result<bool, Error<P::Error>> {
        if self.session.read_status() {
            return Ok(true);
        }
        if timeout_ms != 0
            && self.timebase.now().elapsed_since(start) >= u64::from(timeout_ms)
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("Sensor not ready after {} ms", timeout_ms);
            return Err(Error::Timeout);
        }
        Ok(false)
    }

    /// Clock zeros out while filling `buf`, holding chip-select between
    /// chunks.
    fn clock_in(&mut self, buf: &mut [u8]) -> Result<(), Error<P::Error>> {
        let filler = [0u8; CHUNK_SIZE];
        let total = buf.len();
        let mut done = 0;
        for chunk in buf.chunks_mut(CHUNK_SIZE) {
            let len = chunk.len();
            done += len;
            self.session.exchange(&filler, chunk, len, done < total)?;
        }
        Ok(())
    }
}

impl<P, C, D> SpiLink<'_, P, C, D>
where
    P: Platform,
    C: MonotonicClock,
    D: DelayNs,
{
    /// Poll the status line until the sensor is ready.
    pub fn wait_ready(
        &mut self,
        timeout_ms: u32,
    ) -> Result<(), Error<P::Error>> {
        let start = self.timebase.now();
        while !self.check_ready(start, timeout_ms)? {
            self.timebase.sleep(READY_POLL_MS);
        }
        Ok(())
    }
}

impl<P, C, D> SpiLink<'_, P, C, D>
where
    P: Platform,
    C: MonotonicClock,
    D: AsyncDelayNs,
{
    /// [`wait_ready`](Self::wait_ready), yielding to the executor between
    /// polls.
    pub async fn wait_ready_async(
        &mut self,
        timeout_ms: u32,
    ) -> Result<(), Error<P::Error>> {
        let start = self.timebase.now();
        while !self.check_ready(start, timeout_ms)? {
            self.timebase.sleep_async(READY_POLL_MS).await;
        }
        Ok(())
    }

    /// [`PhyLink::read`] without blocking the executor while the sensor is
    /// busy.
    pub async fn read_async(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Error<P::Error>> {
        self.wait_ready_async(timeout_ms).await?;
        self.clock_in(buf)
    }
}

impl<P, C, D> PhyLink for SpiLink<'_, P, C, D>
where
    P: Platform,
    C: MonotonicClock,
    D: DelayNs,
{
    type Error = Error<P::Error>;

    fn write(
        &mut self,
        data: &[u8],
        _timeout_ms: u32,
    ) -> Result<(), Self::Error> {
        let mut discard = [0u8; CHUNK_SIZE];
        let mut chunks = data.chunks(CHUNK_SIZE).peekable();
        while let Some(chunk) = chunks.next() {
            let more = chunks.peek().is_some();
            self.session.exchange(chunk, &mut discard, chunk.len(), more)?;
        }
        Ok(())
    }

    fn read(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Self::Error> {
        self.wait_ready(timeout_ms)?;
        self.clock_in(buf)
    }

    fn rx_timeout(&self) -> u32 {
        self.session.timeout_ms()
    }
}

/// Serial transport placeholder. Nothing is ever sent or received.
#[derive(Debug, Default, Clone, Copy)]
pub struct UartStub;

impl UartStub {
    /// Returns the number of bytes written, always zero.
    pub fn write(&mut self, _data: &[u8]) -> usize {
        0
    }

    /// Returns the number of bytes read, always zero.
    pub fn read(&mut self, _buf: &mut [u8]) -> usize {
        0
    }
}
