use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{ErrorType, SpiBus};
use embedded_hal_bus::spi::DeviceError;

/// A bus device that can keep its select line asserted between transfers.
///
/// `embedded_hal::spi::SpiDevice` always releases chip-select at the end of a
/// transaction, which breaks exchanges the sensor expects to see as one frame
/// (header, then payload). Implementors forward `hold_select` to the select
/// line instead.
pub trait FullDuplex: ErrorType {
    /// Clock out `write` while capturing the same number of bytes into `read`.
    ///
    /// Both slices have the same length. With `hold_select` set the device
    /// stays selected after the call returns; the next call without it ends
    /// the transaction.
    fn transfer(
        &mut self,
        read: &mut [u8],
        write: &[u8],
        hold_select: bool,
    ) -> Result<(), Self::Error>;
}

/// [`FullDuplex`] device over an exclusive [`SpiBus`] and a software driven
/// chip-select pin.
pub struct ChipSelectDevice<BUS, CS> {
    bus: BUS,
    cs: CS,
}

impl<BUS, CS> ChipSelectDevice<BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    /// Wrap `bus`, deasserting `cs` first.
    pub fn new(bus: BUS, mut cs: CS) -> Result<Self, CS::Error> {
        cs.set_high()?;
        Ok(Self { bus, cs })
    }

    /// Give back the bus and select pin.
    pub fn release(self) -> (BUS, CS) {
        (self.bus, self.cs)
    }
}

impl<BUS, CS> ErrorType for ChipSelectDevice<BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    type Error = DeviceError<BUS::Error, CS::Error>;
}

impl<BUS, CS> FullDuplex for ChipSelectDevice<BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    fn transfer(
        &mut self,
        read: &mut [u8],
        write: &[u8],
        hold_select: bool,
    ) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(DeviceError::Cs)?;

        let result = self
            .bus
            .transfer(read, write)
            .and_then(|()| self.bus.flush())
            .map_err(DeviceError::Spi);

        match result {
            // A failed transfer always ends the transaction, and the bus
            // error is the one reported.
            Err(e) => {
                let _ = self.cs.set_high();
                Err(e)
            }
            Ok(()) if hold_select => Ok(()),
            Ok(()) => self.cs.set_high().map_err(DeviceError::Cs),
        }
    }
}
