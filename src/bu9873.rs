use core::fmt;

use embedded_hal::i2c::I2c;

use crate::{Error, RegisterBus};

pub const DEFAULT_ADDRESS: u8 = 0x32;

/// CTRL2 in the chip's transfer format. A block transfer starting here wraps around to the
/// seconds register, so one 8-byte transfer covers the control byte and the whole date.
const REG_CTRL2: u8 = 0xf0;
const CTRL2_12_24: u8 = 0x20;
const HOURS_PM: u8 = 0x20;
const HOURS_12_MASK: u8 = 0x1f;

/// A calendar time as kept by the RTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcTime {
    pub seconds: u8,
    pub minutes: u8,
    /// 0 to 23, or 1 to 12 when `am_pm_mode` is set.
    pub hours: u8,
    /// 0 to 6. The chip only counts; which day is 0 is up to the caller.
    pub day_of_week: u8,
    pub day_of_month: u8,
    /// 1 to 12.
    pub month: u8,
    /// Years since 2000.
    pub year: u8,
    /// The hours register counts 1 to 12 with a PM flag.
    pub am_pm_mode: bool,
    /// Only meaningful with `am_pm_mode`.
    pub pm: bool,
}

impl RtcTime {
    /// The full year.
    pub fn year(&self) -> u16 {
        2000 + self.year as u16
    }

    pub fn is_valid(&self) -> bool {
        let hours_valid = if self.am_pm_mode {
            (1..=12).contains(&self.hours)
        } else {
            self.hours <= 23
        };
        self.seconds <= 59
            && self.minutes <= 59
            && hours_valid
            && self.day_of_week <= 6
            && (1..=31).contains(&self.day_of_month)
            && (1..=12).contains(&self.month)
            && self.year <= 99
    }

    fn decode(buffer: &[u8; 8]) -> RtcTime {
        let am_pm_mode = buffer[0] & CTRL2_12_24 != 0;
        let (hours, pm) = if am_pm_mode {
            (from_bcd(buffer[3] & HOURS_12_MASK), buffer[3] & HOURS_PM != 0)
        } else {
            (from_bcd(buffer[3]), false)
        };
        RtcTime {
            seconds: from_bcd(buffer[1]),
            minutes: from_bcd(buffer[2]),
            hours,
            day_of_week: from_bcd(buffer[4]),
            day_of_month: from_bcd(buffer[5]),
            month: from_bcd(buffer[6]),
            year: from_bcd(buffer[7]),
            am_pm_mode,
            pm,
        }
    }

    fn encode(&self) -> [u8; 8] {
        let mut hours = to_bcd(self.hours);
        if self.am_pm_mode && self.pm {
            hours |= HOURS_PM;
        }
        [
            if self.am_pm_mode { CTRL2_12_24 } else { 0 },
            to_bcd(self.seconds),
            to_bcd(self.minutes),
            hours,
            to_bcd(self.day_of_week),
            to_bcd(self.day_of_month),
            to_bcd(self.month),
            to_bcd(self.year),
        ]
    }
}

impl fmt::Display for RtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year(),
            self.month,
            self.day_of_month,
            self.hours,
            self.minutes,
            self.seconds
        )?;
        if self.am_pm_mode {
            f.write_str(if self.pm { " PM" } else { " AM" })?;
        }
        Ok(())
    }
}

/// Real-time clock. Unlike the sensors it has no interrupt cycle; the time is read or set in one
/// transfer.
#[derive(Debug)]
pub struct Bu9873<TI2c> {
    bus: RegisterBus<TI2c>,
}

impl<TI2c> Bu9873<TI2c>
where
    TI2c: I2c,
{
    pub fn new(i2c: TI2c, address: u8) -> Bu9873<TI2c> {
        Bu9873 {
            bus: RegisterBus::new(i2c, address),
        }
    }

    pub fn release(self) -> TI2c {
        self.bus.release()
    }

    /// Reads the current time.
    pub fn load_time(&mut self) -> Result<RtcTime, Error<TI2c::Error>> {
        let mut buffer = [0u8; 8];
        self.bus.read_regs(REG_CTRL2, &mut buffer)?;
        let time = RtcTime::decode(&buffer);
        log::debug!("RTC time {}", time);
        Ok(time)
    }

    /// Sets the clock, including its 12/24-hour mode.
    ///
    /// Returns [`Error::InvalidConfig`] if any field is out of range.
    pub fn set_time(&mut self, time: &RtcTime) -> Result<(), Error<TI2c::Error>> {
        if !time.is_valid() {
            log::error!("refusing to set invalid RTC time {:?}", time);
            return Err(Error::InvalidConfig);
        }
        self.bus.write_regs(REG_CTRL2, &time.encode())
    }
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0f)
}
