use embedded_hal::i2c::I2c;

use crate::{Error, InterruptStatus, Measurement, RegisterBus, Rgbc, Sensor};

/// The address the BH1745NUC answers on with ADDR tied low.
pub const DEFAULT_ADDRESS: u8 = 0x39;

const REG_SWRST: u8 = 0x40;
const REG_MODE1: u8 = 0x41;
const REG_MODE2: u8 = 0x42;
const REG_RED_L: u8 = 0x50;
const REG_INT: u8 = 0x60;
const REG_PERSISTENCE: u8 = 0x61;
const REG_TH_L: u8 = 0x62;
const REG_ID: u8 = 0x92;

const ID_VALUE: u8 = 0xe0;
const SWRST_INT: u8 = 0x40;
const MODE2_RGBC_EN: u8 = 0x10;
const INT_STATUS: u8 = 0x80;
const INT_EN: u8 = 0x01;
const INT_SOURCE_SHIFT: u8 = 2;

/// Measurement time per RGBC conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rate {
    #[default]
    Ms160 = 0,
    Ms320 = 1,
    Ms640 = 2,
    Ms1280 = 3,
    Ms2560 = 4,
    Ms5120 = 5,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    #[default]
    X1 = 0,
    X2 = 1,
    X16 = 2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mode {
    pub rate: Rate,
    pub gain: Gain,
}

/// Raw-count window for the interrupt source channel. The interrupt fires when the channel leaves
/// `low..=high`, subject to the persistence setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    pub high: u16,
    pub low: u16,
}

/// The channel compared against the thresholds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Source {
    Red = 0,
    Green = 1,
    Blue = 2,
    #[default]
    Clear = 3,
}

/// When the interrupt status is updated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Persistence {
    /// Toggles at the end of every measurement.
    #[default]
    EndOfMeasurement = 0,
    /// Updated at the end of every measurement.
    UpdateEveryMeasurement = 1,
    /// Updated after 4 consecutive out-of-window measurements.
    UpdateAfter4 = 2,
    /// Updated after 8 consecutive out-of-window measurements.
    UpdateAfter8 = 3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptConfig {
    pub enable: bool,
    pub source: Source,
    pub persistence: Persistence,
}

impl InterruptConfig {
    /// The default leaves the interrupt disabled, which cannot be armed.
    pub fn has_source(&self) -> bool {
        self.enable
    }
}

/// RGBC color sensor.
///
/// Configuration is cached and written when the device wakes.
#[derive(Debug)]
pub struct Bh1745nuc<TI2c> {
    bus: RegisterBus<TI2c>,
    mode: Mode,
    thresholds: Thresholds,
    interrupt: InterruptConfig,
}

impl<TI2c> Bh1745nuc<TI2c>
where
    TI2c: I2c,
{
    pub fn new(i2c: TI2c, address: u8) -> Bh1745nuc<TI2c> {
        Bh1745nuc {
            bus: RegisterBus::new(i2c, address),
            mode: Mode::default(),
            thresholds: Thresholds::default(),
            interrupt: InterruptConfig::default(),
        }
    }

    pub fn release(self) -> TI2c {
        self.bus.release()
    }
}

impl<TI2c> Sensor for Bh1745nuc<TI2c>
where
    TI2c: I2c,
{
    type BusError = TI2c::Error;
    type Mode = Mode;
    type Thresholds = Thresholds;
    type InterruptConfig = InterruptConfig;

    fn part_number(&self) -> &'static str {
        "BH1745NUC"
    }

    fn address(&self) -> u8 {
        self.bus.address()
    }

    fn init(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.verify_id(REG_ID, ID_VALUE)
    }

    fn configure(
        &mut self,
        mode: Mode,
        thresholds: Option<Thresholds>,
    ) -> Result<(), Error<Self::BusError>> {
        self.mode = mode;
        if let Some(thresholds) = thresholds {
            self.thresholds = thresholds;
        }
        Ok(())
    }

    fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<Self::BusError>> {
        if sleep {
            self.bus.write_reg(REG_SWRST, SWRST_INT)?;
            return self.bus.write_reg(REG_MODE2, 0);
        }
        let mut int = (self.interrupt.source as u8) << INT_SOURCE_SHIFT;
        if self.interrupt.enable {
            int |= INT_EN;
        }
        self.bus.write_reg(REG_INT, int)?;
        self.bus
            .write_reg(REG_PERSISTENCE, self.interrupt.persistence as u8)?;
        let [high_l, high_h] = self.thresholds.high.to_le_bytes();
        let [low_l, low_h] = self.thresholds.low.to_le_bytes();
        self.bus.write_regs(REG_TH_L, &[high_l, high_h, low_l, low_h])?;
        self.bus.write_reg(REG_MODE1, self.mode.rate as u8)?;
        self.bus
            .write_reg(REG_MODE2, MODE2_RGBC_EN | self.mode.gain as u8)
    }

    /// Fails with [`Error::InvalidConfig`] when `config` enables no source.
    fn arm_interrupt(&mut self, config: InterruptConfig) -> Result<(), Error<Self::BusError>> {
        if !config.has_source() {
            return Err(Error::InvalidConfig);
        }
        self.interrupt = config;
        Ok(())
    }

    fn interrupt_status(&mut self) -> Result<InterruptStatus, Error<Self::BusError>> {
        let int = self.bus.read_reg(REG_INT)?;
        Ok(InterruptStatus {
            data_ready: self.interrupt.enable && int & INT_STATUS != 0,
            ..InterruptStatus::default()
        })
    }

    fn read(&mut self, _status: InterruptStatus) -> Result<Measurement, Error<Self::BusError>> {
        let mut buffer = [0u8; 8];
        self.bus.read_regs(REG_RED_L, &mut buffer)?;
        Ok(Measurement::Color(decode(&buffer)))
    }

    fn clear_interrupt(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.write_reg(REG_SWRST, SWRST_INT)
    }
}

fn decode(buffer: &[u8; 8]) -> Rgbc {
    Rgbc {
        red: u16::from_le_bytes([buffer[0], buffer[1]]),
        green: u16::from_le_bytes([buffer[2], buffer[3]]),
        blue: u16::from_le_bytes([buffer[4], buffer[5]]),
        clear: u16::from_le_bytes([buffer[6], buffer[7]]),
    }
}
