use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{DeviceSettings, PinConfig};
use crate::device::FullDuplex;

/// Abstracts the microcontroller peripherals behind the transport.
///
/// Implementors map the bus/device/pin steps of the transport lifecycle onto
/// their HAL. Every acquisition step has a matching release step; the
/// [`TransportManager`](crate::TransportManager) guarantees they are called in
/// reverse order and that a failed acquisition is unwound.
pub trait Platform {
    /// Pin identifier.
    type Pin: Copy + PartialEq + core::fmt::Debug;
    /// Bus instance identifier.
    type BusId: Copy + PartialEq + core::fmt::Debug;
    /// Logical device attached to the bus.
    type Device: FullDuplex;
    /// Configured reset output.
    type Reset: OutputPin<Error = Infallible>;
    /// Configured status input.
    type Status: InputPin<Error = Infallible>;
    /// Error type for peripheral management failures.
    type Error: core::fmt::Debug;

    /// Configure the bus with the clock and data pins in `pins`.
    fn initialize_bus(
        &mut self,
        pins: &PinConfig<Self::Pin, Self::BusId>,
        max_transfer_size: usize,
    ) -> Result<(), Self::Error>;

    /// Attach a device at `cs` on an initialized bus.
    fn attach_device(
        &mut self,
        bus: Self::BusId,
        cs: Self::Pin,
        settings: DeviceSettings,
    ) -> Result<Self::Device, Self::Error>;

    /// Detach a device, handing the bus back to the platform.
    fn detach_device(
        &mut self,
        device: Self::Device,
    ) -> Result<(), Self::Error>;

    /// Release the bus. Fails if a device is still attached.
    fn free_bus(&mut self, bus: Self::BusId) -> Result<(), Self::Error>;

    /// Configure `pin` as a push-pull output without pulls, driven to `high`.
    fn configure_reset(
        &mut self,
        pin: Self::Pin,
        high: bool,
    ) -> Result<Self::Reset, Self::Error>;

    /// Configure `pin` as an input without pulls.
    fn configure_status(
        &mut self,
        pin: Self::Pin,
    ) -> Result<Self::Status, Self::Error>;

    /// Return `pin` to its default, unconfigured state.
    fn reset_pin(&mut self, pin: Self::Pin);
}
