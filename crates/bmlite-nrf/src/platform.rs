use core::convert::Infallible;

use bmlite_hal::{
    ChipSelectDevice, DeviceError, DeviceSettings, FullDuplex, PinConfig,
    Platform, SpiMode,
};
use embassy_embedded_hal::SetConfig;
use embassy_nrf::gpio::{AnyPin, Flex, Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::{self, InterruptExt};
use embassy_nrf::{bind_interrupts, peripherals, spim, Peri};
use embedded_hal::spi::ErrorType;

use crate::board::{is_valid_pin, SpiInstance};

bind_interrupts!(struct SpiIrqs {
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
    SPI2 => spim::InterruptHandler<peripherals::SPI2>;
});

/// Longest EasyDMA transfer the SPIM peripheral supports.
const MAX_DMA_LEN: usize = 0xFFFF;

/// Peripheral management failures on the nRF52840.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NrfError {
    /// The bus is already configured.
    BusBusy(SpiInstance),
    /// The bus was never configured.
    BusNotInitialized(SpiInstance),
    /// A device is still attached to the bus.
    DeviceAttached(SpiInstance),
    /// Pin number outside P0.00..P1.15.
    InvalidPin(u8),
    /// Requested transfer size exceeds EasyDMA.
    TransferTooLarge(usize),
    /// The SPIM peripheral rejected the device settings.
    Config,
}

/// Lifecycle of one SPIM instance.
enum BusSlot {
    Free,
    /// Configured, no device attached.
    Ready(spim::Spim<'static>),
    /// Owned by an attached [`NrfDevice`].
    Lent,
}

/// Sensor device on an nRF52840 SPIM instance.
pub struct NrfDevice {
    bus: SpiInstance,
    inner: ChipSelectDevice<spim::Spim<'static>, Output<'static>>,
}

impl ErrorType for NrfDevice {
    type Error = DeviceError<spim::Error, Infallible>;
}

impl FullDuplex for NrfDevice {
    fn transfer(
        &mut self,
        read: &mut [u8],
        write: &[u8],
        hold_select: bool,
    ) -> Result<(), Self::Error> {
        self.inner.transfer(read, write, hold_select)
    }
}

/// [`Platform`] backed by embassy-nrf's SPIM and GPIO drivers.
///
/// Pins are identified by `port * 32 + pin`, as in [`crate::pin`].
pub struct NrfPlatform {
    _spi2: Peri<'static, peripherals::SPI2>,
    _spi3: Peri<'static, peripherals::SPI3>,
    buses: [BusSlot; 2],
}

impl NrfPlatform {
    /// Take ownership of the SPIM instances the sensor may use.
    ///
    /// # Safety
    ///
    /// Pins are looked up by number when a [`PinConfig`] is applied. The
    /// caller must make sure no other driver uses the pins named in the
    /// configurations passed to the transport.
    pub unsafe fn new(
        spi2: Peri<'static, peripherals::SPI2>,
        spi3: Peri<'static, peripherals::SPI3>,
    ) -> Self {
        Self {
            _spi2: spi2,
            _spi3: spi3,
            buses: [BusSlot::Free, BusSlot::Free],
        }
    }

    fn slot(&mut self, bus: SpiInstance) -> &mut BusSlot {
        &mut self.buses[bus as usize]
    }
}

fn steal_pin(pin: u8) -> Peri<'static, AnyPin> {
    // SAFETY: `NrfPlatform::new` makes the caller reserve every pin named in
    // a PinConfig for the sensor, and pins are validated before first use.
    unsafe { AnyPin::steal(pin) }
}

/// Fastest SPIM clock not above `hz`. Only SPIM3 runs above 8 MHz.
fn spim_frequency(bus: SpiInstance, hz: u32) -> spim::Frequency {
    let high_speed = bus == SpiInstance::Spi3;
    if high_speed && hz >= 32_000_000 {
        spim::Frequency::M32
    } else if high_speed && hz >= 16_000_000 {
        spim::Frequency::M16
    } else if hz >= 8_000_000 {
        spim::Frequency::M8
    } else if hz >= 4_000_000 {
        spim::Frequency::M4
    } else if hz >= 2_000_000 {
        spim::Frequency::M2
    } else if hz >= 1_000_000 {
        spim::Frequency::M1
    } else if hz >= 500_000 {
        spim::Frequency::K500
    } else if hz >= 250_000 {
        spim::Frequency::K250
    } else {
        spim::Frequency::K125
    }
}

impl Platform for NrfPlatform {
    type Pin = u8;
    type BusId = SpiInstance;
    type Device = NrfDevice;
    type Reset = Output<'static>;
    type Status = Input<'static>;
    type Error = NrfError;

    fn initialize_bus(
        &mut self,
        pins: &PinConfig<u8, SpiInstance>,
        max_transfer_size: usize,
    ) -> Result<(), NrfError> {
        if let Some(pin) = pins.pins().into_iter().find(|p| !is_valid_pin(*p)) {
            return Err(NrfError::InvalidPin(pin));
        }
        if max_transfer_size > MAX_DMA_LEN {
            return Err(NrfError::TransferTooLarge(max_transfer_size));
        }
        if !matches!(self.slot(pins.bus), BusSlot::Free) {
            return Err(NrfError::BusBusy(pins.bus));
        }

        let mut config = spim::Config::default();
        config.mode = spim::MODE_0;
        config.frequency = spim::Frequency::M1;

        let (sck, miso, mosi) =
            (steal_pin(pins.clk), steal_pin(pins.miso), steal_pin(pins.mosi));

        // SAFETY: the SPIM instances are owned by `self` and only ever driven
        // through the slot they live in.
        let spim = match pins.bus {
            SpiInstance::Spi2 => {
                interrupt::SPI2.set_priority(interrupt::Priority::P3);
                spim::Spim::new(
                    unsafe { peripherals::SPI2::steal() },
                    SpiIrqs,
                    sck,
                    miso,
                    mosi,
                    config,
                )
            }
            SpiInstance::Spi3 => {
                interrupt::SPIM3.set_priority(interrupt::Priority::P3);
                spim::Spim::new(
                    unsafe { peripherals::SPI3::steal() },
                    SpiIrqs,
                    sck,
                    miso,
                    mosi,
                    config,
                )
            }
        };

        *self.slot(pins.bus) = BusSlot::Ready(spim);
        Ok(())
    }

    fn attach_device(
        &mut self,
        bus: SpiInstance,
        cs: u8,
        settings: DeviceSettings,
    ) -> Result<NrfDevice, NrfError> {
        if !is_valid_pin(cs) {
            return Err(NrfError::InvalidPin(cs));
        }

        let mut spim = match core::mem::replace(self.slot(bus), BusSlot::Lent) {
            BusSlot::Ready(spim) => spim,
            BusSlot::Free => {
                *self.slot(bus) = BusSlot::Free;
                return Err(NrfError::BusNotInitialized(bus));
            }
            BusSlot::Lent => return Err(NrfError::DeviceAttached(bus)),
        };

        let mut config = spim::Config::default();
        config.mode = match settings.mode {
            SpiMode::Mode0 => spim::MODE_0,
            SpiMode::Mode1 => spim::MODE_1,
            SpiMode::Mode2 => spim::MODE_2,
            SpiMode::Mode3 => spim::MODE_3,
        };
        config.frequency = spim_frequency(bus, settings.clock_hz);
        if spim.set_config(&config).is_err() {
            *self.slot(bus) = BusSlot::Ready(spim);
            return Err(NrfError::Config);
        }

        let cs = Output::new(steal_pin(cs), Level::High, OutputDrive::Standard);
        let inner = match ChipSelectDevice::new(spim, cs) {
            Ok(inner) => inner,
            Err(never) => match never {},
        };

        Ok(NrfDevice { bus, inner })
    }

    fn detach_device(&mut self, device: NrfDevice) -> Result<(), NrfError> {
        let (spim, cs) = device.inner.release();
        // Dropping the output disconnects the select pin.
        drop(cs);
        *self.slot(device.bus) = BusSlot::Ready(spim);
        Ok(())
    }

    fn free_bus(&mut self, bus: SpiInstance) -> Result<(), NrfError> {
        match self.slot(bus) {
            BusSlot::Lent => Err(NrfError::DeviceAttached(bus)),
            slot => {
                // Dropping the driver disconnects SCK, MISO and MOSI.
                *slot = BusSlot::Free;
                Ok(())
            }
        }
    }

    fn configure_reset(
        &mut self,
        pin: u8,
        high: bool,
    ) -> Result<Output<'static>, NrfError> {
        if !is_valid_pin(pin) {
            return Err(NrfError::InvalidPin(pin));
        }
        let level = if high { Level::High } else { Level::Low };
        Ok(Output::new(steal_pin(pin), level, OutputDrive::Standard))
    }

    fn configure_status(
        &mut self,
        pin: u8,
    ) -> Result<Input<'static>, NrfError> {
        if !is_valid_pin(pin) {
            return Err(NrfError::InvalidPin(pin));
        }
        Ok(Input::new(steal_pin(pin), Pull::None))
    }

    fn reset_pin(&mut self, pin: u8) {
        if is_valid_pin(pin) {
            let mut flex = Flex::new(steal_pin(pin));
            flex.set_as_disconnected();
        }
    }
}
