use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

use crate::{
    Cancellation, Error, Measurement, NoLine, Operation, PollOptions, PollOutcome, Poller,
    RunError, Sensor, SensorHandle,
};

/// Everything needed to bring a sensor from initialized to sampling.
pub struct RunConfig<TSensor>
where
    TSensor: Sensor,
{
    pub mode: TSensor::Mode,
    /// Watermarks, where the family has them. `None` keeps the driver's defaults.
    pub thresholds: Option<TSensor::Thresholds>,
    pub interrupt: TSensor::InterruptConfig,
    pub poll: PollOptions,
}

impl<TSensor> RunConfig<TSensor>
where
    TSensor: Sensor,
{
    /// A configuration without thresholds that polls with the default options.
    pub fn new(mode: TSensor::Mode, interrupt: TSensor::InterruptConfig) -> RunConfig<TSensor> {
        RunConfig {
            mode,
            thresholds: None,
            interrupt,
            poll: PollOptions::default(),
        }
    }
}

/// Uses each family's default mode and interrupt sources. Families whose default enables no
/// interrupt source (BH1745NUC, RPR-0521RS) fail to arm with [`Error::InvalidConfig`], so their
/// configuration has to name a source.
impl<TSensor> Default for RunConfig<TSensor>
where
    TSensor: Sensor,
    TSensor::Mode: Default,
    TSensor::InterruptConfig: Default,
{
    fn default() -> RunConfig<TSensor> {
        RunConfig::new(TSensor::Mode::default(), TSensor::InterruptConfig::default())
    }
}

/// Starts sampling `device` and returns the stream of its measurements.
///
/// The device is initialized, configured, armed and woken, in that order. If any step after
/// initialization fails, the device is put back to sleep before the error is returned. If
/// initialization itself fails there is no device to put to sleep.
///
/// The returned iterator blocks in [`Iterator::next`] until the next measurement is ready. It ends
/// when `cancel` is raised, or after yielding one fatal error. Either way, and also when the
/// iterator is dropped early, the device is put to sleep exactly once.
///
/// # Arguments
///
/// * `bus_id` - Identifies the bus in logs and errors.
/// * `device` - The family driver, constructed around its bus.
/// * `config` - Mode, thresholds, interrupt sources and poll options.
/// * `delay` - Used to pause between status queries.
/// * `cancel` - Checked between status queries. Pass `&token` to keep the token.
pub fn run<TSensor, TDelay, TCancel>(
    bus_id: u8,
    device: TSensor,
    config: RunConfig<TSensor>,
    delay: TDelay,
    cancel: TCancel,
) -> Result<Measurements<TSensor, TDelay, NoLine, TCancel>, RunError<TSensor::BusError>>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TCancel: Cancellation,
{
    run_with_line(bus_id, device, config, delay, NoLine, cancel)
}

/// Like [`run`], but only queries the device status while the active-low `line` is asserted.
pub fn run_with_line<TSensor, TDelay, TLine, TCancel>(
    bus_id: u8,
    device: TSensor,
    config: RunConfig<TSensor>,
    delay: TDelay,
    line: TLine,
    cancel: TCancel,
) -> Result<Measurements<TSensor, TDelay, TLine, TCancel>, RunError<TSensor::BusError>>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: InputPin,
    TCancel: Cancellation,
{
    let (handle, options) = start(bus_id, device, config)?;
    Ok(Measurements {
        handle,
        poller: Poller::with_line(delay, line, Some(options)),
        cancel,
        pending_clear: false,
        finished: false,
    })
}

/// Initializes, configures, arms and wakes the device.
pub(crate) fn start<TSensor>(
    bus_id: u8,
    device: TSensor,
    config: RunConfig<TSensor>,
) -> Result<(SensorHandle<TSensor>, PollOptions), RunError<TSensor::BusError>>
where
    TSensor: Sensor,
{
    let RunConfig {
        mode,
        thresholds,
        interrupt,
        poll,
    } = config;
    if !poll.is_valid() {
        log::error!("invalid poll options: {:?}", poll);
        return Err(RunError::new(Operation::Configure, Error::InvalidConfig));
    }

    let mut handle =
        SensorHandle::init(bus_id, device).map_err(|err| RunError::new(Operation::Init, err))?;

    let started = handle
        .configure(mode, thresholds)
        .map_err(|err| RunError::new(Operation::Configure, err))
        .and_then(|()| {
            handle
                .arm_interrupt(interrupt)
                .map_err(|err| RunError::new(Operation::ArmInterrupt, err))
        })
        .and_then(|()| {
            handle
                .set_sleep(false)
                .map_err(|err| RunError::new(Operation::Wake, err))
        });
    if let Err(err) = started {
        log::error!("bus {} address 0x{:02x}: {}", bus_id, handle.address(), err);
        if let Err(sleep_err) = handle.set_sleep(true) {
            log::error!("could not put the device back to sleep: {}", sleep_err);
        }
        return Err(err);
    }

    log::info!("bus {} address 0x{:02x}: sampling", bus_id, handle.address());
    Ok((handle, poll))
}

/// Clears any pending interrupt and puts the device to sleep.
///
/// Both steps are attempted. The first failure is returned; a later one is only logged.
pub(crate) fn stop<TSensor, TAcknowledge>(
    handle: &mut SensorHandle<TSensor>,
    pending_clear: bool,
    acknowledge: TAcknowledge,
) -> Result<(), RunError<TSensor::BusError>>
where
    TSensor: Sensor,
    TAcknowledge: FnOnce(&mut SensorHandle<TSensor>) -> Result<(), Error<TSensor::BusError>>,
{
    let mut result = Ok(());
    if pending_clear {
        if let Err(err) = acknowledge(handle) {
            log::error!("final interrupt clear failed: {}", err);
            result = Err(RunError::new(Operation::ClearInterrupt, err));
        }
    }
    match handle.set_sleep(true) {
        Ok(()) => log::info!(
            "bus {} address 0x{:02x}: asleep",
            handle.bus_id(),
            handle.address()
        ),
        Err(err) => {
            log::error!("could not put the device to sleep: {}", err);
            if result.is_ok() {
                result = Err(RunError::new(Operation::Sleep, err));
            }
        }
    }
    result
}

/// The measurements of a running sensor. Created by [`run`].
///
/// Each measurement is handed out before its interrupt is cleared. The clear happens at the start
/// of the following [`Iterator::next`] call, or during shutdown if there is none.
pub struct Measurements<TSensor, TDelay, TLine, TCancel>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: InputPin,
    TCancel: Cancellation,
{
    handle: SensorHandle<TSensor>,
    poller: Poller<TDelay, TLine>,
    cancel: TCancel,
    pending_clear: bool,
    finished: bool,
}

impl<TSensor, TDelay, TLine, TCancel> Measurements<TSensor, TDelay, TLine, TCancel>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: InputPin,
    TCancel: Cancellation,
{
    pub fn handle(&self) -> &SensorHandle<TSensor> {
        &self.handle
    }

    pub fn poller(&self) -> &Poller<TDelay, TLine> {
        &self.poller
    }

    /// Whether the device has been put to sleep and no more items will be produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Stops sampling: clears a pending interrupt and puts the device to sleep.
    ///
    /// Dropping the iterator does the same, but can only log a failure.
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

    /// One poll cycle. `Ok(None)` means cancelled.
    fn cycle(&mut self) -> Result<Option<Measurement>, RunError<TSensor::BusError>> {
        if core::mem::take(&mut self.pending_clear) {
            self.poller
                .acknowledge(&mut self.handle)
                .map_err(|err| RunError::new(Operation::ClearInterrupt, err))?;
        }
        let status = match self.poller.wait_ready(&mut self.handle, &self.cancel) {
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

impl<TSensor, TDelay, TLine, TCancel> Iterator for Measurements<TSensor, TDelay, TLine, TCancel>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: InputPin,
    TCancel: Cancellation,
{
    type Item = Result<Measurement, RunError<TSensor::BusError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.cycle() {
            Ok(Some(measurement)) => {
                log::debug!("measurement: {}", measurement);
                Some(Ok(measurement))
            }
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
}

impl<TSensor, TDelay, TLine, TCancel> Drop for Measurements<TSensor, TDelay, TLine, TCancel>
where
    TSensor: Sensor,
    TDelay: DelayNs,
    TLine: InputPin,
    TCancel: Cancellation,
{
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            log::error!("shutdown: {}", err);
        }
    }
}
