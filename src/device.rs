use core::fmt::Debug;

use crate::{Error, InterruptStatus, Measurement};

/// The capabilities every interrupt-driven sensor family provides.
///
/// Implementations hold the family's register map and configuration cache. Most of them write the
/// cached configuration to the device when it wakes, so [`Sensor::configure`] and
/// [`Sensor::arm_interrupt`] are cheap and only validate their arguments.
///
/// Callers normally go through [`SensorHandle`], which enforces the order of operations.
pub trait Sensor {
    /// Error type of the underlying bus.
    type BusError: Debug;
    /// Sampling rate, resolution and similar settings.
    type Mode;
    /// Watermarks that gate the interrupt flags. `()` where the family has none.
    type Thresholds;
    /// Which interrupt sources to enable, and how they latch and clear.
    type InterruptConfig;

    /// The chip's part number, for logs.
    fn part_number(&self) -> &'static str;

    /// The 7-bit bus address.
    fn address(&self) -> u8;

    /// Checks the device identity. Families that need fixed setup do it here, leaving the device
    /// in low-power mode.
    fn init(&mut self) -> Result<(), Error<Self::BusError>>;

    fn configure(
        &mut self,
        mode: Self::Mode,
        thresholds: Option<Self::Thresholds>,
    ) -> Result<(), Error<Self::BusError>>;

    /// Enters (`true`) or leaves (`false`) low-power mode. Sleeping twice is allowed.
    fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<Self::BusError>>;

    fn arm_interrupt(&mut self, config: Self::InterruptConfig)
        -> Result<(), Error<Self::BusError>>;

    /// Reads the current flags. Only armed sources are reported.
    fn interrupt_status(&mut self) -> Result<InterruptStatus, Error<Self::BusError>>;

    /// Reads and decodes the sample the given flags announce.
    fn read(&mut self, status: InterruptStatus) -> Result<Measurement, Error<Self::BusError>>;

    /// Acknowledges the pending condition so the next one can be detected.
    ///
    /// Skipping this after a read leaves the status flags latched, and the next poll sees the same
    /// stale condition again.
    fn clear_interrupt(&mut self) -> Result<(), Error<Self::BusError>>;
}

/// An initialized sensor.
///
/// A handle only exists once [`Sensor::init`] succeeded. It tracks whether the device has been
/// configured, armed and woken, and rejects status queries and reads that would be meaningless:
///
/// * [`Error::InvalidConfig`] before [`SensorHandle::configure`] succeeded.
/// * [`Error::AlreadyAsleep`] while the device is in low-power mode.
///
/// All operations take `&mut self`, so only one read-and-clear cycle can be in flight.
#[derive(Debug)]
pub struct SensorHandle<TSensor> {
    device: TSensor,
    bus_id: u8,
    configured: bool,
    armed: bool,
    asleep: bool,
}

impl<TSensor> SensorHandle<TSensor>
where
    TSensor: Sensor,
{
    /// Initializes `device`, which sits on the bus identified by `bus_id`.
    ///
    /// On failure the device is dropped; there is nothing to put to sleep.
    pub fn init(
        bus_id: u8,
        mut device: TSensor,
    ) -> Result<SensorHandle<TSensor>, Error<TSensor::BusError>> {
        device.init()?;
        log::info!(
            "{} found at bus {} address 0x{:02x}",
            device.part_number(),
            bus_id,
            device.address()
        );
        Ok(SensorHandle {
            device,
            bus_id,
            configured: false,
            armed: false,
            asleep: true,
        })
    }

    pub fn bus_id(&self) -> u8 {
        self.bus_id
    }

    pub fn address(&self) -> u8 {
        self.device.address()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Borrows the family driver, for family-specific calls.
    pub fn device(&mut self) -> &mut TSensor {
        &mut self.device
    }

    pub fn configure(
        &mut self,
        mode: TSensor::Mode,
        thresholds: Option<TSensor::Thresholds>,
    ) -> Result<(), Error<TSensor::BusError>> {
        self.device.configure(mode, thresholds)?;
        self.configured = true;
        Ok(())
    }

    pub fn arm_interrupt(
        &mut self,
        config: TSensor::InterruptConfig,
    ) -> Result<(), Error<TSensor::BusError>> {
        if !self.configured {
            return Err(Error::InvalidConfig);
        }
        self.device.arm_interrupt(config)?;
        self.armed = true;
        Ok(())
    }

    /// Enters or leaves low-power mode.
    ///
    /// Sleeping is always permitted and is repeated on the device even if the handle already
    /// believes it is asleep. Waking requires a configuration.
    pub fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<TSensor::BusError>> {
        if !sleep && !self.configured {
            return Err(Error::InvalidConfig);
        }
        self.device.set_sleep(sleep)?;
        self.asleep = sleep;
        Ok(())
    }

    pub fn interrupt_status(&mut self) -> Result<InterruptStatus, Error<TSensor::BusError>> {
        self.check_sampling()?;
        self.device.interrupt_status()
    }

    /// Non-blocking ready check: returns the flags once any is set, and
    /// [`nb::Error::WouldBlock`] until then.
    ///
    /// `nb::block!(handle.try_ready())` spins on the bus without pause; prefer
    /// [`Poller`](crate::Poller) unless the caller throttles itself.
    pub fn try_ready(&mut self) -> nb::Result<InterruptStatus, Error<TSensor::BusError>> {
        let status = self.interrupt_status().map_err(nb::Error::Other)?;
        if status.any() {
            Ok(status)
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Reads the sample announced by `status`.
    pub fn read(
        &mut self,
        status: InterruptStatus,
    ) -> Result<Measurement, Error<TSensor::BusError>> {
        self.check_sampling()?;
        if !status.any() {
            return Err(Error::NotReady);
        }
        self.device.read(status)
    }

    pub fn clear_interrupt(&mut self) -> Result<(), Error<TSensor::BusError>> {
        self.device.clear_interrupt()
    }

    /// Gives the family driver back. Put the device to sleep first if it should stay quiet.
    pub fn release(self) -> TSensor {
        self.device
    }

    fn check_sampling(&self) -> Result<(), Error<TSensor::BusError>> {
        if !self.configured {
            return Err(Error::InvalidConfig);
        }
        if self.asleep {
            return Err(Error::AlreadyAsleep);
        }
        Ok(())
    }
}
