use core::fmt;

/// Errors returned by the sensor drivers and the polling loop.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<TBusError> {
    /// The device did not answer with the expected identity.
    NotFound,
    /// Wrapped error from the I2C driver.
    BusFault(TBusError),
    /// The requested configuration is out of range, or the operation needs a configuration that
    /// was never set.
    InvalidConfig,
    /// No ready condition was observed within the configured maximum wait.
    Timeout,
    /// The device is in low-power mode. Wake it before sampling.
    AlreadyAsleep,
    /// A read or clear was requested while no ready condition was pending.
    NotReady,
}

impl<TBusError> From<TBusError> for Error<TBusError> {
    fn from(error: TBusError) -> Error<TBusError> {
        Error::BusFault(error)
    }
}

impl<TBusError> Error<TBusError> {
    /// Whether a retry could plausibly succeed. Only bus faults qualify; a missing device or a bad
    /// configuration will not fix itself.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::BusFault(_))
    }
}

impl<TBusError> fmt::Display for Error<TBusError>
where
    TBusError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "device not found"),
            Error::BusFault(err) => write!(f, "bus fault: {:?}", err),
            Error::InvalidConfig => write!(f, "invalid configuration"),
            Error::Timeout => write!(f, "timed out waiting for the device to become ready"),
            Error::AlreadyAsleep => write!(f, "device is asleep"),
            Error::NotReady => write!(f, "no ready condition pending"),
        }
    }
}

impl<TBusError> core::error::Error for Error<TBusError> where TBusError: fmt::Debug {}

/// The lifecycle step that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    Init,
    Configure,
    ArmInterrupt,
    Wake,
    Poll,
    Read,
    ClearInterrupt,
    Sleep,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Init => "init",
            Operation::Configure => "configure",
            Operation::ArmInterrupt => "arm_interrupt",
            Operation::Wake => "wake",
            Operation::Poll => "poll",
            Operation::Read => "read",
            Operation::ClearInterrupt => "clear_interrupt",
            Operation::Sleep => "sleep",
        };
        f.write_str(name)
    }
}

/// A fatal error from the run loop, tagged with the operation that produced it.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunError<TBusError> {
    pub operation: Operation,
    pub error: Error<TBusError>,
}

impl<TBusError> RunError<TBusError> {
    pub fn new(operation: Operation, error: Error<TBusError>) -> RunError<TBusError> {
        RunError { operation, error }
    }
}

impl<TBusError> fmt::Display for RunError<TBusError>
where
    TBusError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.error)
    }
}

impl<TBusError> core::error::Error for RunError<TBusError> where TBusError: fmt::Debug {}
