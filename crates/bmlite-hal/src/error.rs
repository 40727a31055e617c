use embedded_hal::spi::ErrorKind;

/// Errors reported by the transport layer.
///
/// `E` is the error type of the [`Platform`](crate::Platform) driving the
/// peripherals. Nothing in this crate retries; every error is terminal for the
/// operation that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E: core::fmt::Debug> {
    /// Missing or malformed configuration. Raised before any peripheral call.
    InvalidArgument,
    /// The requested interface is recognised but not implemented (UART).
    UnsupportedInterface,
    /// `init` was called while a session is still active.
    AlreadyInitialized,
    /// The operation needs an active session and there is none.
    NotInitialized,
    /// Bus or pin management failed in the platform layer.
    HardwareFault(E),
    /// A transaction failed on an already configured bus.
    Io(ErrorKind),
    /// The sensor did not report ready within the receive timeout.
    Timeout,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidArgument => write!(f, "Invalid transport arguments"),
            Error::UnsupportedInterface => {
                write!(f, "UART interface not supported")
            }
            Error::AlreadyInitialized => {
                write!(f, "Transport already initialized")
            }
            Error::NotInitialized => write!(f, "Transport not initialized"),
            Error::HardwareFault(err) => {
                write!(f, "Peripheral configuration failed: {:?}", err)
            }
            Error::Io(kind) => write!(f, "SPI transaction failed: {}", kind),
            Error::Timeout => write!(f, "Timed out waiting for sensor ready"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: core::fmt::Debug> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InvalidArgument => defmt::write!(f, "InvalidArgument"),
            Error::UnsupportedInterface => {
                defmt::write!(f, "UnsupportedInterface")
            }
            Error::AlreadyInitialized => defmt::write!(f, "AlreadyInitialized"),
            Error::NotInitialized => defmt::write!(f, "NotInitialized"),
            Error::HardwareFault(err) => {
                defmt::write!(f, "HardwareFault({})", defmt::Debug2Format(err))
            }
            Error::Io(kind) => defmt::write!(f, "Io({})", kind),
            Error::Timeout => defmt::write!(f, "Timeout"),
        }
    }
}
