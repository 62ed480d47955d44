//! Waiting on an interrupt edge instead of blocking between status queries.
//!
//! The bus itself stays blocking: register transfers are short, and the only long wait in a poll
//! cycle is the one between two status queries. That wait becomes a race between a falling edge
//! on the interrupt line and the poll interval.

use core::time::Duration;

use embassy_futures::select::{select, Either};
use embedded_hal::digital::Error as _;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;

use crate::lifecycle::{start, stop};
use crate::{
    Cancellation, Error, Measurement, NoLine, Operation, PollOptions, PollOutcome, PollState,
    RunConfig, RunError, Sensor, SensorHandle, DEFAULT_POLL_OPTIONS,
};

impl Wait for NoLine {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        core::future::pending().await
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        core::future::pending().await
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        core::future::pending().await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        core::future::pending().await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        core::future::pending().await
    }
}

/// Async counterpart of [`Poller`](crate::Poller).
///
/// Between status queries it waits for whichever comes first: a falling edge on the interrupt
/// line, or the poll interval. Without a line it simply waits out the interval.
#[derive(Debug)]
pub struct AsyncPoller<TDelay, TLine = NoLine> {
    delay: TDelay,
    line: TLine,
    options: PollOptions,
    state: PollState,
    polls: u32,
    line_failed: bool,
}

impl<TDelay> AsyncPoller<TDelay, NoLine>
where
    TDelay: DelayNs,
{
    pub fn new(delay: TDelay, options: Option<PollOptions>) -> AsyncPoller<TDelay, NoLine> {
        AsyncPoller::with_line(delay, NoLine, options)
    }
}

impl<TDelay, TLine> AsyncPoller<TDelay, TLine>
where
    TDelay: DelayNs,
    TLine: Wait,
{
    pub fn with_line(
        delay: TDelay,
        line: TLine,
        options: Option<PollOptions>,
    ) -> AsyncPoller<TDelay, TLine> {
        AsyncPoller {
            delay,
            line,
            options: options.unwrap_or(DEFAULT_POLL_OPTIONS),
            state: PollState::Idle,
            polls: 0,
            line_failed: false,
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

    /// Waits until `handle` reports a ready condition, `cancel` is raised, or the timeout passes.
    ///
    /// Same contract as [`Poller::wait_ready`](crate::Poller::wait_ready). Every wait counts as a
    /// full interval towards the timeout, even when an edge cut it short.
    pub async fn wait_ready<TSensor, TCancel>(
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

            if let Some(timeout) = self.options.timeout {
                if waited >= timeout {
                    log::error!("no ready condition within {:?}", timeout);
                    self.state = PollState::Idle;
                    return Err(Error::Timeout);
                }
            }
            self.pause().await;
            waited += self.options.interval;
        }
    }

    /// See [`Poller::acknowledge`](crate::Poller::acknowledge).
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

    pub fn release(self) -> (TDelay, TLine) {
        (self.delay, self.line)
    }

    async fn pause(&mut self) {
        let AsyncPoller {
            delay,
            line,
            options,
            line_failed,
            ..
        } = self;
        let interval = options.interval_ns();
        if *line_failed {
            delay.delay_ns(interval).await;
            return;
        }
        match select(line.wait_for_falling_edge(), delay.delay_ns(interval)).await {
            Either::First(Ok(())) => log::trace!("interrupt edge"),
            Either::First(Err(err)) => {
                log::warn!(
                    "interrupt line unreadable ({:?}), falling back to status polling",
                    err.kind()
                );
                *line_failed = true;
            }
            Either::Second(()) => {}
        }
    }
}

/// Starts sampling `device`, waiting for each measurement asynchronously.
///
/// Same sequence and guarantees as [`run`](crate::run). `line` may be [`NoLine`].
pub fn run_async<TSensor, TDelay, TLine, TCancel>(
    bus_id: u8,
    device: TSensor,
    config: RunConfig<TSensor>,
    delay: TDelay,
    line: TLine,
    cancel: TCancel,
) -> Result<AsyncRun<TSensor, TDelay, TLine, TCancel>, RunError<TSensor::BusError>>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: Wait,
    TCancel: Cancellation,
{
    let (handle, options) = start(bus_id, device, config)?;
    Ok(AsyncRun {
        handle,
        poller: AsyncPoller::with_line(delay, line, Some(options)),
        cancel,
        pending_clear: false,
        finished: false,
    })
}

/// The measurements of a running sensor, one [`AsyncRun::next`] at a time.
///
/// Dropping it puts the device to sleep; register access is blocking so this needs no executor.
pub struct AsyncRun<TSensor, TDelay, TLine, TCancel>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: Wait,
    TCancel: Cancellation,
{
    handle: SensorHandle<TSensor>,
    poller: AsyncPoller<TDelay, TLine>,
    cancel: TCancel,
    pending_clear: bool,
    finished: bool,
}

impl<TSensor, TDelay, TLine, TCancel> AsyncRun<TSensor, TDelay, TLine, TCancel>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: Wait,
    TCancel: Cancellation,
{
    /// The next measurement, or `None` once cancelled or after a fatal error was returned.
    pub async fn next(&mut self) -> Option<Result<Measurement, RunError<TSensor::BusError>>> {
        if self.finished {
            return None;
        }
        match self.cycle().await {
            Ok(Some(measurement)) => Some(Ok(measurement)),
            Ok(None) => self.finish().err().map(Err),
            Err(err) => {
                log::error!("{}", err);
                if let Err(stop_err) = self.finish() {
                    log::error!("after {}: {}", err.operation, stop_err);
                }
                Some(Err(err))
            }
        }
    }

    pub fn handle(&self) -> &SensorHandle<TSensor> {
        &self.handle
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn shutdown(mut self) -> Result<(), RunError<TSensor::BusError>> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), RunError<TSensor::BusError>> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let pending_clear = core::mem::take(&mut self.pending_clear);
        let poller = &mut self.poller;
        stop(&mut self.handle, pending_clear, |handle| {
            poller.acknowledge(handle)
        })
    }

    async fn cycle(&mut self) -> Result<Option<Measurement>, RunError<TSensor::BusError>> {
        if core::mem::take(&mut self.pending_clear) {
            self.poller
                .acknowledge(&mut self.handle)
                .map_err(|err| RunError::new(Operation::ClearInterrupt, err))?;
        }
        let status = match self.poller.wait_ready(&mut self.handle, &self.cancel).await {
            Ok(PollOutcome::Ready(status)) => status,
            Ok(PollOutcome::Cancelled) => return Ok(None),
            Err(err) => return Err(RunError::new(Operation::Poll, err)),
        };
        let measurement = self
            .handle
            .read(status)
            .map_err(|err| RunError::new(Operation::Read, err))?;
        self.pending_clear = true;
        Ok(Some(measurement))
    }
}

impl<TSensor, TDelay, TLine, TCancel> Drop for AsyncRun<TSensor, TDelay, TLine, TCancel>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: Wait,
    TCancel: Cancellation,
{
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            log::error!("shutdown: {}", err);
        }
    }
}
