#![no_std]
//! nRF52840 backend for the BM-Lite transport.
//!
//! [`NrfPlatform`] drives the sensor through embassy-nrf's SPIM and GPIO
//! drivers and [`EmbassyClock`] supplies the tick source. Pins are plain
//! GPIO numbers, see [`pin`].

mod board;
mod platform;
mod time;

pub use board::*;
pub use platform::{NrfDevice, NrfError, NrfPlatform};
pub use time::*;
