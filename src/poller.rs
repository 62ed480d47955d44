use core::convert::Infallible;
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorType, InputPin};

use crate::{Cancellation, Error, InterruptStatus, Sensor, SensorHandle};

/// The default pause between two status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The default maximum wait for one ready condition.
///
/// The slowest supported configuration (a 0.781 Hz accelerometer rate) produces a sample about
/// every 1.3 seconds, so this leaves ample headroom.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// The longest pause between two status queries, the most a single `delay_ns` call can wait.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_nanos(u32::MAX as u64);

/// The default number of consecutive bus faults tolerated while polling.
pub const DEFAULT_MAX_BUS_RETRIES: u8 = 2;

/// Options to modify the behavior of the poll loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollOptions {
    /// The pause between two status queries. Must not be zero or exceed [`MAX_POLL_INTERVAL`].
    pub interval: Duration,
    /// The maximum time to wait for one ready condition, measured as the sum of the pauses. `None`
    /// waits forever.
    pub timeout: Option<Duration>,
    /// How many consecutive bus faults on the status query are retried before the fault is
    /// returned. Every retry is logged.
    pub max_bus_retries: u8,
}

pub const DEFAULT_POLL_OPTIONS: PollOptions = PollOptions {
    interval: DEFAULT_POLL_INTERVAL,
    timeout: Some(DEFAULT_POLL_TIMEOUT),
    max_bus_retries: DEFAULT_MAX_BUS_RETRIES,
};

impl Default for PollOptions {
    fn default() -> PollOptions {
        DEFAULT_POLL_OPTIONS
    }
}

impl PollOptions {
    /// A zero interval would spin on the bus, and a zero timeout could never be met.
    pub fn is_valid(&self) -> bool {
        !self.interval.is_zero()
            && self.interval <= MAX_POLL_INTERVAL
            && self.timeout.map_or(true, |timeout| !timeout.is_zero())
    }

    /// The interval as a delay argument. Only meaningful once [`PollOptions::is_valid`] holds.
    pub(crate) fn interval_ns(&self) -> u32 {
        u32::try_from(self.interval.as_nanos()).unwrap_or(u32::MAX)
    }
}

/// Where the poller is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollState {
    /// Not waiting. Also the state after a fatal error or a cancellation.
    Idle,
    /// Querying the device status.
    Polling,
    /// A ready condition was observed and has not been acknowledged.
    Ready,
    /// The last ready condition was acknowledged.
    Cleared,
}

/// How a wait ended, when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollOutcome {
    Ready(InterruptStatus),
    Cancelled,
}

/// Stand-in for an absent interrupt line. Always reads as asserted, so every iteration queries
/// the status register.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLine;

impl ErrorType for NoLine {
    type Error = Infallible;
}

impl InputPin for NoLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Waits for a ready condition with a bounded pause between status queries.
///
/// With an interrupt line attached (active low, like the INT pins of all supported parts) the
/// status register is only read while the line is asserted. A line that cannot be read is logged
/// and ignored; polling carries on through the status register.
#[derive(Debug)]
pub struct Poller<TDelay, TLine = NoLine> {
    delay: TDelay,
    line: TLine,
    options: PollOptions,
    state: PollState,
    polls: u32,
}

impl<TDelay> Poller<TDelay, NoLine>
where
    TDelay: DelayNs,
{
    /// Constructs a poller that queries the status register every `options.interval`. If
    /// `options` is `None`, [`DEFAULT_POLL_OPTIONS`] is used.
    pub fn new(delay: TDelay, options: Option<PollOptions>) -> Poller<TDelay, NoLine> {
        Poller::with_line(delay, NoLine, options)
    }
}

impl<TDelay, TLine> Poller<TDelay, TLine>
where
    TDelay: DelayNs,
    TLine: InputPin,
{
    /// Constructs a poller that only queries the status register while `line` is low.
    pub fn with_line(
        delay: TDelay,
        line: TLine,
        options: Option<PollOptions>,
    ) -> Poller<TDelay, TLine> {
        Poller {
            delay,
            line,
            options: options.unwrap_or(DEFAULT_POLL_OPTIONS),
            state: PollState::Idle,
            polls: 0,
        }
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Status queries issued since construction. Wraps around after `u32::MAX`.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Blocks until `handle` reports a ready condition, `cancel` is raised, or the timeout passes.
    ///
    /// Cancellation is checked before every status query. A bus fault on the query is retried up
    /// to [`PollOptions::max_bus_retries`] consecutive times; any other error halts the poller and
    /// is returned as is.
    pub fn wait_ready<TSensor, TCancel>(
        &mut self,
        handle: &mut SensorHandle<TSensor>,
        cancel: &TCancel,
    ) -> Result<PollOutcome, Error<TSensor::BusError>>
    where
        TSensor: Sensor,
        TCancel: Cancellation + ?Sized,
    {
        if !self.options.is_valid() {
            return Err(Error::InvalidConfig);
        }
        self.state = PollState::Polling;
        let mut waited = Duration::ZERO;
        let mut failures = 0u8;
        loop {
            if cancel.is_cancelled() {
                log::info!("poll cancelled after {} queries", self.polls);
                self.state = PollState::Idle;
                return Ok(PollOutcome::Cancelled);
            }

            if self.line_asserted() {
                self.polls = self.polls.wrapping_add(1);
                match handle.try_ready() {
                    Ok(status) => {
                        log::debug!("ready after {} queries: {:?}", self.polls, status);
                        self.state = PollState::Ready;
                        return Ok(PollOutcome::Ready(status));
                    }
                    Err(nb::Error::WouldBlock) => failures = 0,
                    Err(nb::Error::Other(err))
                        if err.is_transient() && failures < self.options.max_bus_retries =>
                    {
                        failures += 1;
                        log::warn!(
                            "status query failed ({}), retry {} of {}",
                            err,
                            failures,
                            self.options.max_bus_retries
                        );
                    }
                    Err(nb::Error::Other(err)) => {
                        log::error!("status query failed: {}", err);
                        self.state = PollState::Idle;
                        return Err(err);
                    }
                }
            }

            if let Some(timeout) = self.options.timeout {
                if waited >= timeout {
                    log::error!("no ready condition within {:?}", timeout);
                    self.state = PollState::Idle;
                    return Err(Error::Timeout);
                }
            }
            self.delay.delay_ns(self.options.interval_ns());
            waited += self.options.interval;
        }
    }

    /// Clears the interrupt behind the last ready condition.
    ///
    /// Fails with [`Error::NotReady`] unless the poller is in [`PollState::Ready`], so clears stay
    /// one-to-one with observed ready conditions. A failed clear halts the poller.
    pub fn acknowledge<TSensor>(
        &mut self,
        handle: &mut SensorHandle<TSensor>,
    ) -> Result<(), Error<TSensor::BusError>>
    where
        TSensor: Sensor,
    {
        if self.state != PollState::Ready {
            return Err(Error::NotReady);
        }
        match handle.clear_interrupt() {
            Ok(()) => {
                self.state = PollState::Cleared;
                Ok(())
            }
            Err(err) => {
                self.state = PollState::Idle;
                Err(err)
            }
        }
    }

    /// Gives the delay and the interrupt line back.
    pub fn release(self) -> (TDelay, TLine) {
        (self.delay, self.line)
    }

    fn line_asserted(&mut self) -> bool {
        match self.line.is_low() {
            Ok(asserted) => asserted,
            Err(err) => {
                log::warn!(
                    "interrupt line unreadable ({:?}), falling back to status polling",
                    err.kind()
                );
                true
            }
        }
    }
}
