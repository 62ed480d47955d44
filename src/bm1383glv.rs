use embedded_hal::i2c::I2c;

use crate::{Error, InterruptStatus, Measurement, RegisterBus, Sensor};

pub const DEFAULT_ADDRESS: u8 = 0x5d;

const REG_ID: u8 = 0x10;
const REG_SWRST: u8 = 0x11;
const REG_PWR: u8 = 0x12;
const REG_RST: u8 = 0x13;
const REG_MODE: u8 = 0x14;
const REG_PDTH_H_H: u8 = 0x15;
const REG_PDTH_L_H: u8 = 0x17;
const REG_INT: u8 = 0x19;
const REG_PRESS_H: u8 = 0x1c;

const ID_VALUE: u8 = 0x31;
const SWRST_INT: u8 = 0x40;
const PWR_ON: u8 = 0x01;
const RST_RSTB: u8 = 0x01;
const MODE_T_AVE: u8 = 0x08;
const AVER_SHIFT: u8 = 5;
const INT_H_STATUS: u8 = 0x80;
const INT_L_STATUS: u8 = 0x40;
const INT_H_EN: u8 = 0x20;
const INT_L_EN: u8 = 0x10;
const INT_PU_EN: u8 = 0x08;
const INT_EN: u8 = 0x01;

/// Watermark registers hold hPa in units of 1/32.
const WATERMARK_COUNTS_PER_HPA: f32 = 32.0;
const PRESSURE_COUNTS_PER_HPA: f32 = 2048.0;

/// Measurement rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rate {
    /// Stand-by.
    Off = 0,
    OneShot = 1,
    Hz20 = 2,
    #[default]
    Hz10 = 3,
    Hz5 = 4,
}

/// Number of pressure samples averaged into one measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Averaging {
    #[default]
    None = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mode {
    pub rate: Rate,
    pub averaging: Averaging,
    /// Average the temperature compensation as well.
    pub temperature_averaging: bool,
}

/// Pressure watermarks in hPa. Each must lie in `0.0..2048.0`.
///
/// A high watermark of 0 raises the high flag at the end of every measurement, which turns the
/// interrupt into a data-ready signal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    pub high: f32,
    pub low: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptConfig {
    pub high: bool,
    pub low: bool,
    /// Use the internal pull-up on the INT pin.
    pub pullup: bool,
}

pub const DEFAULT_INTERRUPT_CONFIG: InterruptConfig = InterruptConfig {
    high: true,
    low: false,
    pullup: true,
};

impl Default for InterruptConfig {
    fn default() -> InterruptConfig {
        DEFAULT_INTERRUPT_CONFIG
    }
}

impl InterruptConfig {
    pub fn has_source(&self) -> bool {
        self.high || self.low
    }
}

/// Barometric pressure sensor.
#[derive(Debug)]
pub struct Bm1383glv<TI2c> {
    bus: RegisterBus<TI2c>,
    mode: Mode,
    high: u16,
    low: u16,
    interrupt: InterruptConfig,
}

impl<TI2c> Bm1383glv<TI2c>
where
    TI2c: I2c,
{
    pub fn new(i2c: TI2c, address: u8) -> Bm1383glv<TI2c> {
        Bm1383glv {
            bus: RegisterBus::new(i2c, address),
            mode: Mode::default(),
            high: 0,
            low: 0,
            interrupt: DEFAULT_INTERRUPT_CONFIG,
        }
    }

    pub fn release(self) -> TI2c {
        self.bus.release()
    }
}

impl<TI2c> Sensor for Bm1383glv<TI2c>
where
    TI2c: I2c,
{
    type BusError = TI2c::Error;
    type Mode = Mode;
    type Thresholds = Thresholds;
    type InterruptConfig = InterruptConfig;

    fn part_number(&self) -> &'static str {
        "BM1383GLV"
    }

    fn address(&self) -> u8 {
        self.bus.address()
    }

    /// Checks the identity and powers the chip up. The measurement block stays in reset until the
    /// device wakes.
    fn init(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.verify_id(REG_ID, ID_VALUE)?;
        self.bus.write_reg(REG_PWR, PWR_ON)
    }

    fn configure(
        &mut self,
        mode: Mode,
        thresholds: Option<Thresholds>,
    ) -> Result<(), Error<Self::BusError>> {
        if let Some(thresholds) = thresholds {
            let high = watermark(thresholds.high)?;
            let low = watermark(thresholds.low)?;
            self.high = high;
            self.low = low;
        }
        self.mode = mode;
        Ok(())
    }

    fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<Self::BusError>> {
        if sleep {
            self.bus.write_reg(REG_SWRST, SWRST_INT)?;
            self.bus.write_reg(REG_MODE, 0)?;
            return self.bus.write_reg(REG_RST, 0);
        }
        self.bus.write_reg(REG_RST, RST_RSTB)?;
        if self.interrupt.high {
            self.bus
                .write_regs(REG_PDTH_H_H, &self.high.to_be_bytes())?;
        }
        if self.interrupt.low {
            self.bus.write_regs(REG_PDTH_L_H, &self.low.to_be_bytes())?;
        }
        self.bus.write_reg(REG_INT, int_value(&self.interrupt))?;
        let mut mode = ((self.mode.averaging as u8) << AVER_SHIFT) | self.mode.rate as u8;
        if self.mode.temperature_averaging {
            mode |= MODE_T_AVE;
        }
        self.bus.write_reg(REG_MODE, mode)
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
            high: self.interrupt.high && int & INT_H_STATUS != 0,
            low: self.interrupt.low && int & INT_L_STATUS != 0,
            ..InterruptStatus::default()
        })
    }

    fn read(&mut self, _status: InterruptStatus) -> Result<Measurement, Error<Self::BusError>> {
        let mut buffer = [0u8; 3];
        self.bus.read_regs(REG_PRESS_H, &mut buffer)?;
        Ok(Measurement::Pressure(pressure(&buffer)))
    }

    fn clear_interrupt(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.write_reg(REG_SWRST, SWRST_INT)
    }
}

fn watermark<E>(hpa: f32) -> Result<u16, Error<E>> {
    let counts = hpa * WATERMARK_COUNTS_PER_HPA;
    // Written this way round so NaN is rejected too.
    if !(counts >= 0.0 && counts < 65536.0) {
        log::error!("pressure watermark {} hPa out of range", hpa);
        return Err(Error::InvalidConfig);
    }
    Ok(counts as u16)
}

fn int_value(config: &InterruptConfig) -> u8 {
    let mut int = 0;
    if config.high {
        int |= INT_H_EN;
    }
    if config.low {
        int |= INT_L_EN;
    }
    if !config.pullup {
        int |= INT_PU_EN;
    }
    if config.high || config.low {
        int |= INT_EN;
    }
    int
}

fn pressure(buffer: &[u8; 3]) -> f32 {
    let raw = ((buffer[0] as u32) << 14) | ((buffer[1] as u32) << 6) | ((buffer[2] as u32) >> 2);
    raw as f32 / PRESSURE_COUNTS_PER_HPA
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_watermark {
        ($name:ident, $hpa:expr, $expected:expr) => {
            #[test]
            fn $name() {
                assert_eq!(watermark::<()>($hpa), $expected);
            }
        };
    }

    test_watermark!(zero_watermark, 0.0, Ok(0));
    test_watermark!(sea_level_watermark, 1013.25, Ok(32424));
    test_watermark!(top_of_range_watermark, 2047.96875, Ok(0xffff));
    test_watermark!(negative_watermark, -1.0, Err(Error::InvalidConfig));
    test_watermark!(watermark_past_range, 2048.0, Err(Error::InvalidConfig));
    test_watermark!(nan_watermark, f32::NAN, Err(Error::InvalidConfig));

    #[test]
    fn decodes_pressure() {
        // 1013.25 hPa * 2048 = 2075136 = 0x7e << 14 | 0xa8 << 6
        assert_eq!(pressure(&[0x7e, 0xa8, 0x00]), 1013.25);
    }

    #[test]
    fn pull_up_enable_bit_is_inverted() {
        let int = int_value(&InterruptConfig {
            pullup: false,
            ..DEFAULT_INTERRUPT_CONFIG
        });
        assert_eq!(int, INT_H_EN | INT_PU_EN | INT_EN);
    }

    #[test]
    fn no_sources_leaves_interrupt_disabled() {
        let int = int_value(&InterruptConfig {
            high: false,
            low: false,
            pullup: true,
        });
        assert_eq!(int, 0);
    }
}
