#![no_std]
//! SPI transport for the FPC BM-Lite fingerprint sensor.
//!
//! Sits between the host communication protocol and the microcontroller's
//! peripherals. [`TransportManager`] acquires the bus, attaches the sensor
//! and configures its reset and ready lines; the resulting [`Session`]
//! performs full-duplex exchanges, optionally keeping chip-select asserted
//! across calls, and [`SpiLink`] wraps it as the read/write capability the
//! protocol layer consumes.
//!
//! Peripherals are reached through the [`Platform`] trait, so the same
//! lifecycle runs on hardware and against mocks.

mod config;
mod device;
mod error;
mod link;
mod manager;
mod platform;
mod session;
pub mod timebase;

pub use config::{
    DeviceSettings, Interface, PinConfig, SpiMode, TransportConfig,
    MAX_TRANSFER_SIZE,
};
pub use device::{ChipSelectDevice, FullDuplex};
pub use error::Error;
pub use link::{PhyLink, SpiLink, UartStub, CHUNK_SIZE, READY_POLL_MS};
pub use manager::TransportManager;
pub use platform::Platform;
pub use session::{
    Session, RESET_ACTIVE_LEVEL, RESET_ASSERT_MS, RESET_INACTIVE_LEVEL,
    RESET_SETTLE_MS, STATUS_READY_LEVEL,
};
pub use timebase::{MonotonicClock, Tick, Timebase};

pub use embedded_hal_bus::spi::DeviceError;
