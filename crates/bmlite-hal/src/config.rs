/// Physical link used to talk to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interface {
    /// SPI bus with chip-select, reset and ready lines.
    #[default]
    Spi,
    /// Serial port. Recognised, but init rejects it.
    Uart,
}

/// Pins wired to the sensor, plus the bus they belong to.
///
/// `P` identifies a pin and `B` a bus instance on the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig<P, B> {
    /// SPI bus instance.
    pub bus: B,
    /// Serial clock.
    pub clk: P,
    /// Data in (sensor to host).
    pub miso: P,
    /// Data out (host to sensor).
    pub mosi: P,
    /// Chip select, active low.
    pub cs: P,
    /// Sensor reset, active low.
    pub rst: P,
    /// Sensor ready/IRQ line, active high.
    pub irq: P,
}

impl<P: Copy, B> PinConfig<P, B> {
    /// All six pins, in the order they are released at teardown.
    pub fn pins(&self) -> [P; 6] {
        [self.cs, self.miso, self.mosi, self.clk, self.rst, self.irq]
    }
}

/// Link settings handed to
/// [`TransportManager::init`](crate::TransportManager::init).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportConfig {
    pub interface: Interface,
    /// SPI clock speed in Hz.
    pub baud_rate: u32,
    /// Receive timeout in milliseconds. Zero waits forever.
    pub timeout_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            interface: Interface::Spi,
            baud_rate: 5_000_000,
            timeout_ms: 3000,
        }
    }
}

/// SPI clock polarity and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

/// Settings for the logical device attached to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceSettings {
    pub mode: SpiMode,
    pub clock_hz: u32,
    /// Transactions the peripheral may hold in flight.
    pub queue_size: usize,
}

impl DeviceSettings {
    /// BM-Lite settings: mode 0, one transaction in flight.
    pub const fn bmlite(clock_hz: u32) -> Self {
        Self { mode: SpiMode::Mode0, clock_hz, queue_size: 1 }
    }
}

/// Largest single transfer the bus is configured for.
pub const MAX_TRANSFER_SIZE: usize = 2048;
