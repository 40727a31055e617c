#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::rc::Rc;

use bmlite_hal::{
    DeviceSettings, FullDuplex, PinConfig, Platform, Timebase,
    TransportConfig, TransportManager,
};
use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::spi::{ErrorKind, ErrorType};

// ---------------------------------------------------------------------------
// Shared mock state
// ---------------------------------------------------------------------------

/// Every peripheral call the mock platform sees, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    InitBus { bus: u8, clk: u8, miso: u8, mosi: u8, max_transfer: usize },
    Attach { bus: u8, cs: u8, settings: DeviceSettings },
    Detach,
    FreeBus(u8),
    ConfigureReset { pin: u8, high: bool },
    ConfigureStatus(u8),
    ResetPin(u8),
    Transfer { len: usize, hold: bool },
}

/// Which peripheral steps should fail.
#[derive(Default, Clone, Copy)]
pub struct Failures {
    pub init_bus: bool,
    pub attach: bool,
    pub detach: bool,
    pub free_bus: bool,
    pub configure_reset: bool,
    pub configure_status: bool,
    pub transfer: bool,
}

#[derive(Default)]
pub struct Shared {
    pub calls: RefCell<Vec<Call>>,
    pub fail: Cell<Failures>,
    /// Buses currently initialized, by id.
    pub buses_up: RefCell<BTreeSet<u8>>,
    pub device_attached: Cell<bool>,
    /// Physical level of the reset line, `true` = high.
    pub reset_level: Cell<bool>,
    /// Every level written to the reset line.
    pub reset_history: RefCell<Vec<bool>>,
    /// Physical level of the status line, `true` = high.
    pub status_level: Cell<bool>,
    /// Bytes clocked out by the device.
    pub written: RefCell<Vec<u8>>,
    pub micros: Cell<u64>,
    /// Blocking delays, in milliseconds.
    pub sleeps: RefCell<Vec<u32>>,
    /// Delays awaited through the async delay, in milliseconds.
    pub async_sleeps: RefCell<Vec<u32>>,
    /// Status goes high once the clock reaches this many microseconds.
    pub ready_at_micros: Cell<Option<u64>>,
}

impl Shared {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn transfers(&self) -> Vec<(usize, bool)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Transfer { len, hold } => Some((*len, *hold)),
                _ => None,
            })
            .collect()
    }

    pub fn set_fail(&self, f: impl FnOnce(&mut Failures)) {
        let mut fail = self.fail.get();
        f(&mut fail);
        self.fail.set(fail);
    }

    pub fn bus_up(&self, bus: u8) -> bool {
        self.buses_up.borrow().contains(&bus)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn advance(&self, us: u64) {
        self.micros.set(self.micros.get() + us);
        if let Some(at) = self.ready_at_micros.get() {
            if self.micros.get() >= at {
                self.status_level.set(true);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub &'static str);

// ---------------------------------------------------------------------------
// Mock peripherals
// ---------------------------------------------------------------------------

pub struct MockPlatform {
    shared: Rc<Shared>,
}

pub struct MockDevice {
    shared: Rc<Shared>,
}

#[derive(Debug)]
pub struct MockSpiError;

impl embedded_hal::spi::Error for MockSpiError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Overrun
    }
}

impl ErrorType for MockDevice {
    type Error = MockSpiError;
}

/// Echoes every written byte back into the read buffer.
impl FullDuplex for MockDevice {
    fn transfer(
        &mut self,
        read: &mut [u8],
        write: &[u8],
        hold_select: bool,
    ) -> Result<(), Self::Error> {
        self.shared
            .record(Call::Transfer { len: write.len(), hold: hold_select });
        if self.shared.fail.get().transfer {
            return Err(MockSpiError);
        }
        self.shared.written.borrow_mut().extend_from_slice(write);
        read.copy_from_slice(write);
        Ok(())
    }
}

pub struct MockReset {
    shared: Rc<Shared>,
}

impl PinErrorType for MockReset {
    type Error = Infallible;
}

impl OutputPin for MockReset {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.shared.reset_level.set(false);
        self.shared.reset_history.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.shared.reset_level.set(true);
        self.shared.reset_history.borrow_mut().push(true);
        Ok(())
    }
}

pub struct MockStatus {
    shared: Rc<Shared>,
}

impl PinErrorType for MockStatus {
    type Error = Infallible;
}

impl InputPin for MockStatus {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.shared.status_level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.shared.status_level.get())
    }
}

impl Platform for MockPlatform {
    type Pin = u8;
    type BusId = u8;
    type Device = MockDevice;
    type Reset = MockReset;
    type Status = MockStatus;
    type Error = MockError;

    fn initialize_bus(
        &mut self,
        pins: &PinConfig<u8, u8>,
        max_transfer_size: usize,
    ) -> Result<(), MockError> {
        self.shared.record(Call::InitBus {
            bus: pins.bus,
            clk: pins.clk,
            miso: pins.miso,
            mosi: pins.mosi,
            max_transfer: max_transfer_size,
        });
        if self.shared.fail.get().init_bus {
            return Err(MockError("init bus"));
        }
        self.shared.buses_up.borrow_mut().insert(pins.bus);
        Ok(())
    }

    fn attach_device(
        &mut self,
        bus: u8,
        cs: u8,
        settings: DeviceSettings,
    ) -> Result<MockDevice, MockError> {
        self.shared.record(Call::Attach { bus, cs, settings });
        if self.shared.fail.get().attach || !self.shared.bus_up(bus) {
            return Err(MockError("attach"));
        }
        self.shared.device_attached.set(true);
        Ok(MockDevice { shared: self.shared.clone() })
    }

    fn detach_device(&mut self, _device: MockDevice) -> Result<(), MockError> {
        self.shared.record(Call::Detach);
        if self.shared.fail.get().detach {
            return Err(MockError("detach"));
        }
        self.shared.device_attached.set(false);
        Ok(())
    }

    fn free_bus(&mut self, bus: u8) -> Result<(), MockError> {
        self.shared.record(Call::FreeBus(bus));
        if self.shared.fail.get().free_bus || self.shared.device_attached.get()
        {
            return Err(MockError("free bus"));
        }
        self.shared.buses_up.borrow_mut().remove(&bus);
        Ok(())
    }

    fn configure_reset(
        &mut self,
        pin: u8,
        high: bool,
    ) -> Result<MockReset, MockError> {
        self.shared.record(Call::ConfigureReset { pin, high });
        if self.shared.fail.get().configure_reset {
            return Err(MockError("configure reset"));
        }
        self.shared.reset_level.set(high);
        Ok(MockReset { shared: self.shared.clone() })
    }

    fn configure_status(&mut self, pin: u8) -> Result<MockStatus, MockError> {
        self.shared.record(Call::ConfigureStatus(pin));
        if self.shared.fail.get().configure_status {
            return Err(MockError("configure status"));
        }
        Ok(MockStatus { shared: self.shared.clone() })
    }

    fn reset_pin(&mut self, pin: u8) {
        self.shared.record(Call::ResetPin(pin));
    }
}

// ---------------------------------------------------------------------------
// Mock timebase
// ---------------------------------------------------------------------------

pub struct MockClock {
    shared: Rc<Shared>,
}

impl bmlite_hal::MonotonicClock for MockClock {
    fn now_micros(&self) -> u64 {
        self.shared.micros.get()
    }
}

/// Advances the mock clock instead of waiting.
pub struct MockDelay {
    shared: Rc<Shared>,
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.shared.advance(u64::from(ns) / 1000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.shared.sleeps.borrow_mut().push(ms);
        self.shared.advance(u64::from(ms) * 1000);
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.shared.advance(u64::from(ns) / 1000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.shared.async_sleeps.borrow_mut().push(ms);
        self.shared.advance(u64::from(ms) * 1000);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub type MockManager = TransportManager<MockPlatform, MockClock, MockDelay>;

pub const PINS: PinConfig<u8, u8> =
    PinConfig { bus: 0, miso: 2, mosi: 3, clk: 4, cs: 5, rst: 6, irq: 7 };

pub fn config() -> TransportConfig {
    TransportConfig {
        baud_rate: 1_000_000,
        timeout_ms: 2000,
        ..TransportConfig::default()
    }
}

pub fn make_timebase(shared: &Rc<Shared>) -> Timebase<MockClock, MockDelay> {
    Timebase::new(
        MockClock { shared: shared.clone() },
        MockDelay { shared: shared.clone() },
    )
}

pub fn make_manager() -> (MockManager, Rc<Shared>) {
    let shared = Rc::new(Shared::default());
    let platform = MockPlatform { shared: shared.clone() };
    (TransportManager::new(platform, make_timebase(&shared)), shared)
}

/// A manager that has already been through a successful `init`.
pub fn make_active_manager() -> (MockManager, Rc<Shared>) {
    let (mut mgr, shared) = make_manager();
    mgr.init(&config(), Some(&PINS)).unwrap();
    shared.clear_calls();
    shared.sleeps.borrow_mut().clear();
    shared.async_sleeps.borrow_mut().clear();
    shared.reset_history.borrow_mut().clear();
    (mgr, shared)
}
