use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;

use crate::config::{
    DeviceSettings, Interface, PinConfig, TransportConfig, MAX_TRANSFER_SIZE,
};
use crate::error::Error;
use crate::link::SpiLink;
use crate::platform::Platform;
use crate::session::{
    pulse_reset_line, pulse_reset_line_async, Session, RESET_INACTIVE_LEVEL,
};
use crate::timebase::{MonotonicClock, Timebase};

/// Lifecycle state of the transport.
enum Phase<P: Platform> {
    /// Nothing acquired; the bus and pins belong to the platform.
    Idle,
    /// Bus configured, device attached, control lines set up.
    Active(Session<P>),
}

/// Owns the sensor transport from bus acquisition to teardown.
///
/// `init` moves the manager from idle to active by configuring the bus,
/// attaching the device and setting up the reset/status lines. `deinit` undoes
/// all of it. Transfers, control-line access and the comm link are only
/// reachable while active.
pub struct TransportManager<P: Platform, C, D> {
    platform: P,
    timebase: Timebase<C, D>,
    phase: Phase<P>,
}

impl<P, C, D> TransportManager<P, C, D>
where
    P: Platform,
    C: MonotonicClock,
    D: DelayNs,
{
    /// Create an idle manager.
    pub const fn new(platform: P, timebase: Timebase<C, D>) -> Self {
        Self { platform, timebase, phase: Phase::Idle }
    }

    /// Acquire the bus and pins described by `pins` and bring the sensor out
    /// of reset.
    ///
    /// Arguments are validated before any peripheral is touched. If a later
    /// acquisition step fails, the earlier ones are undone and the manager
    /// stays idle.
    pub fn init(
        &mut self,
        config: &TransportConfig,
        pins: Option<&PinConfig<P::Pin, P::BusId>>,
    ) -> Result<(), Error<P::Error>> {
        let mut session = self.open(config, pins)?;
        session.pulse_reset(&mut self.timebase);
        self.activate(session, config);
        Ok(())
    }

    /// Validate the arguments and acquire a session, leaving the sensor in
    /// whatever state the reset line's idle level puts it.
    fn open(
        &mut self,
        config: &TransportConfig,
        pins: Option<&PinConfig<P::Pin, P::BusId>>,
    ) -> Result<Session<P>, Error<P::Error>> {
        if let Phase::Active(_) = self.phase {
            #[cfg(feature = "defmt")]
            defmt::error!("Transport already initialized");
            return Err(Error::AlreadyInitialized);
        }

        let Some(pins) = pins else {
            #[cfg(feature = "defmt")]
            defmt::error!("Invalid init params");
            return Err(Error::InvalidArgument);
        };

        if config.baud_rate == 0 {
            #[cfg(feature = "defmt")]
            defmt::error!("Invalid init params: zero baud rate");
            return Err(Error::InvalidArgument);
        }

        if config.interface == Interface::Uart {
            #[cfg(feature = "defmt")]
            defmt::error!("UART interface not supported!");
            return Err(Error::UnsupportedInterface);
        }

        let session = self.acquire(config, *pins)?;
        self.timebase.init();
        Ok(session)
    }

    fn activate(&mut self, session: Session<P>, _config: &TransportConfig) {
        self.phase = Phase::Active(session);

        #[cfg(feature = "defmt")]
        defmt::info!("Transport up at {} Hz", _config.baud_rate);
    }

    fn acquire(
        &mut self,
        config: &TransportConfig,
        pins: PinConfig<P::Pin, P::BusId>,
    ) -> Result<Session<P>, Error<P::Error>> {
        let platform = &mut self.platform;

        if let Err(e) = platform.initialize_bus(&pins, MAX_TRANSFER_SIZE) {
            #[cfg(feature = "defmt")]
            defmt::error!("Failed to initialize SPI bus");
            let _ = platform.free_bus(pins.bus);
            return Err(Error::HardwareFault(e));
        }

        let settings = DeviceSettings::bmlite(config.baud_rate);
        let device = match platform.attach_device(pins.bus, pins.cs, settings) {
            Ok(device) => device,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("Failed to add SPI device");
                let _ = platform.free_bus(pins.bus);
                return Err(Error::HardwareFault(e));
            }
        };

        let reset_idle = RESET_INACTIVE_LEVEL == PinState::High;
        let reset = match platform.configure_reset(pins.rst, reset_idle) {
            Ok(reset) => reset,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("Failed to configure RST pin");
                let _ = platform.detach_device(device);
                let _ = platform.free_bus(pins.bus);
                platform.reset_pin(pins.rst);
                return Err(Error::HardwareFault(e));
            }
        };

        let status = match platform.configure_status(pins.irq) {
            Ok(status) => status,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("Failed to configure IRQ pin");
                drop(reset);
                let _ = platform.detach_device(device);
                let _ = platform.free_bus(pins.bus);
                platform.reset_pin(pins.rst);
                platform.reset_pin(pins.irq);
                return Err(Error::HardwareFault(e));
            }
        };

        Ok(Session {
            device,
            reset,
            status,
            pins,
            timeout_ms: config.timeout_ms,
        })
    }

    /// Tear the transport down and return the pins to their default state.
    ///
    /// While a session is active its own pins are released; `pins` is only
    /// used when there is none. Passing pins that differ from the session's
    /// still tears the session down, then reports `InvalidArgument`.
    /// Teardown is best effort: every step runs even if an earlier one
    /// failed, and the first failure is returned. The manager is idle
    /// afterwards in all cases.
    pub fn deinit(
        &mut self,
        pins: Option<&PinConfig<P::Pin, P::BusId>>,
    ) -> Result<(), Error<P::Error>> {
        let mut teardown = self.release_session(pins);
        match teardown.reset.as_mut() {
            Some(reset) => pulse_reset_line(reset, &mut self.timebase),
            None => {
                #[cfg(feature = "defmt")]
                defmt::debug!("No reset line configured, skipping pulse");
            }
        }
        self.release_pins(teardown)
    }

    /// First half of teardown: detach the device and free the bus.
    fn release_session(
        &mut self,
        pins: Option<&PinConfig<P::Pin, P::BusId>>,
    ) -> Teardown<P> {
        let session = match core::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Active(session) => Some(session),
            Phase::Idle => None,
        };

        let mut teardown = Teardown {
            pins: pins.copied(),
            reset: None,
            first_error: None,
            mismatch: false,
        };

        if let Some(Session { device, reset, status, pins: own, .. }) = session
        {
            if teardown.pins.is_some_and(|p| p != own) {
                #[cfg(feature = "defmt")]
                defmt::warn!("Deinit pins differ from the session's");
                teardown.mismatch = true;
            }
            teardown.pins = Some(own);

            if let Err(e) = self.platform.detach_device(device) {
                #[cfg(feature = "defmt")]
                defmt::error!("Failed to remove SPI device");
                teardown.first_error.get_or_insert(Error::HardwareFault(e));
            }
            drop(status);
            teardown.reset = Some(reset);
        }

        if let Some(pins) = teardown.pins {
            if let Err(e) = self.platform.free_bus(pins.bus) {
                #[cfg(feature = "defmt")]
                defmt::error!("Failed to free SPI bus");
                teardown.first_error.get_or_insert(Error::HardwareFault(e));
            }
        }

        teardown
    }

    /// Second half of teardown, after the reset pulse: hand every pin back.
    fn release_pins(
        &mut self,
        teardown: Teardown<P>,
    ) -> Result<(), Error<P::Error>> {
        let Teardown { pins, reset, first_error, mismatch } = teardown;
        drop(reset);

        if let Some(pins) = pins {
            for pin in pins.pins() {
                self.platform.reset_pin(pin);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None if mismatch => Err(Error::InvalidArgument),
            None => Ok(()),
        }
    }

    /// Returns `true` between a successful `init` and the next `deinit`.
    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    /// The active session.
    pub fn session(&mut self) -> Result<&mut Session<P>, Error<P::Error>> {
        match &mut self.phase {
            Phase::Active(session) => Ok(session),
            Phase::Idle => Err(Error::NotInitialized),
        }
    }

    /// Pins of the active session, if any.
    pub fn active_pins(&self) -> Option<&PinConfig<P::Pin, P::BusId>> {
        match &self.phase {
            Phase::Active(session) => Some(&session.pins),
            Phase::Idle => None,
        }
    }

    /// See [`Session::exchange`].
    pub fn exchange(
        &mut self,
        write: &[u8],
        read: &mut [u8],
        len: usize,
        hold_select: bool,
    ) -> Result<(), Error<P::Error>> {
        self.session()?.exchange(write, read, len, hold_select)
    }

    /// Pulse the sensor's reset line.
    pub fn reset_sensor(&mut self) -> Result<(), Error<P::Error>> {
        match &mut self.phase {
            Phase::Active(session) => {
                session.pulse_reset(&mut self.timebase);
                Ok(())
            }
            Phase::Idle => Err(Error::NotInitialized),
        }
    }

    /// Comm link for the protocol layer. Only reachable while initialized.
    pub fn link(&mut self) -> Result<SpiLink<'_, P, C, D>, Error<P::Error>> {
        match &mut self.phase {
            Phase::Active(session) => {
                Ok(SpiLink::new(session, &mut self.timebase))
            }
            Phase::Idle => Err(Error::NotInitialized),
        }
    }

    /// Clock and delays shared with the session.
    pub fn timebase(&mut self) -> &mut Timebase<C, D> {
        &mut self.timebase
    }
}

impl<P, C, D> TransportManager<P, C, D>
where
    P: Platform,
    C: MonotonicClock,
    D: DelayNs + AsyncDelayNs,
{
    /// [`init`](Self::init), yielding to the executor during the reset pulse.
    pub async fn init_async(
        &mut self,
        config: &TransportConfig,
        pins: Option<&PinConfig<P::Pin, P::BusId>>,
    ) -> Result<(), Error<P::Error>> {
        let mut session = self.open(config, pins)?;
        session.pulse_reset_async(&mut self.timebase).await;
        self.activate(session, config);
        Ok(())
    }

    /// [`deinit`](Self::deinit), yielding to the executor during the reset
    /// pulse.
    pub async fn deinit_async(
        &mut self,
        pins: Option<&PinConfig<P::Pin, P::BusId>>,
    ) -> Result<(), Error<P::Error>> {
        let mut teardown = self.release_session(pins);
        if let Some(reset) = teardown.reset.as_mut() {
            pulse_reset_line_async(reset, &mut self.timebase).await;
        }
        self.release_pins(teardown)
    }

    /// [`reset_sensor`](Self::reset_sensor), yielding to the executor.
    pub async fn reset_sensor_async(&mut self) -> Result<(), Error<P::Error>> {
        match &mut self.phase {
            Phase::Active(session) => {
                session.pulse_reset_async(&mut self.timebase).await;
                Ok(())
            }
            Phase::Idle => Err(Error::NotInitialized),
        }
    }
}

/// What is left to release once the device is detached and the bus freed.
struct Teardown<P: Platform> {
    pins: Option<PinConfig<P::Pin, P::BusId>>,
    reset: Option<P::Reset>,
    first_error: Option<Error<P::Error>>,
    /// The caller named pins other than the session's.
    mismatch: bool,
}
