use bmlite_hal::PinConfig;

/// SPIM instance the sensor is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiInstance {
    Spi2,
    /// Only instance able to clock above 8 MHz.
    Spi3,
}

/// GPIO number for `P<port>.<n>`.
pub const fn pin(port: u8, n: u8) -> u8 {
    port * 32 + n
}

/// P0.00..=P0.31 and P1.00..=P1.15.
pub const fn is_valid_pin(pin: u8) -> bool {
    pin < 48
}

/// BM-Lite shield on the nRF52840-DK Arduino header.
pub const BMLITE_PINS: PinConfig<u8, SpiInstance> = PinConfig {
    bus: SpiInstance::Spi3,
    clk: pin(1, 15),
    miso: pin(1, 14),
    mosi: pin(1, 13),
    cs: pin(1, 12),
    rst: pin(1, 11),
    irq: pin(1, 10),
};

