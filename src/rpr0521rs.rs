use embedded_hal::i2c::I2c;

use crate::{Error, InterruptStatus, Measurement, RegisterBus, Sensor};

pub const DEFAULT_ADDRESS: u8 = 0x38;

/// Proximity watermarks are 12-bit.
pub const MAX_PROXIMITY_WATERMARK: u16 = 0xfff;
/// The proximity offset is 10-bit.
pub const MAX_PROXIMITY_OFFSET: u16 = 0x3ff;

const REG_SWRST: u8 = 0x40;
const REG_MODE: u8 = 0x41;
const REG_ALS_CNTL: u8 = 0x42;
const REG_PS_CNTL: u8 = 0x43;
const REG_PS_DATA_L: u8 = 0x44;
const REG_ALS_DATA0_L: u8 = 0x46;
const REG_INT: u8 = 0x4a;
const REG_PS_TH_L: u8 = 0x4b;
const REG_ALS_TH_L: u8 = 0x4f;
const REG_PS_OFFSET_L: u8 = 0x53;
const REG_ID: u8 = 0x92;

const ID_VALUE: u8 = 0xe0;
const SWRST_INT: u8 = 0x40;
const MODE_ALS_EN: u8 = 0x80;
const MODE_PS_EN: u8 = 0x40;
const MODE_PS_PULSE: u8 = 0x20;
const MODE_PS_TWICE: u8 = 0x10;
const ALS_DATA0_GAIN_SHIFT: u8 = 4;
const ALS_DATA1_GAIN_SHIFT: u8 = 2;
const PS_GAIN_SHIFT: u8 = 4;
const INT_PS_STATUS: u8 = 0x80;
const INT_ALS_STATUS: u8 = 0x40;
const INT_ALS_EN: u8 = 0x02;
const INT_PS_EN: u8 = 0x01;
const INT_MODE_SHIFT: u8 = 4;

/// Ambient light and proximity measurement periods, ALS first. The discriminant is the MODE
/// register's rate field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rate {
    #[default]
    Off = 0,
    AlsOffPs100Hz = 1,
    AlsOffPs25Hz = 2,
    AlsOffPs10Hz = 3,
    AlsOffPs2_5Hz = 4,
    Als10HzPs20Hz = 5,
    Als10HzPs10Hz = 6,
    Als10HzPs2_5Hz = 7,
    Als2_5HzPs20Hz = 8,
    Als2_5HzPs10Hz = 9,
    Als2_5HzPsOff = 10,
    Als2_5HzPs2_5Hz = 11,
    /// ALS conversions are shortened to 50 ms; readings with bit 15 set saturate at 0x7fff.
    Als20HzPs20Hz = 12,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedCurrent {
    #[default]
    Ma25 = 0,
    Ma50 = 1,
    Ma100 = 2,
    Ma200 = 3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AmbientLightGain {
    #[default]
    X1 = 0,
    X2 = 1,
    X64 = 2,
    X128 = 3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProximityGain {
    #[default]
    X1 = 0,
    X2 = 1,
    X4 = 2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mode {
    pub ambient_light: bool,
    pub proximity: bool,
    /// Use the wide (330 us) LED pulse.
    pub wide_pulse: bool,
    /// Fire the LED twice per proximity measurement.
    pub twice: bool,
    pub led_current: LedCurrent,
    pub rate: Rate,
    /// Gain of the visible-light photodiode.
    pub visible_gain: AmbientLightGain,
    /// Gain of the infrared photodiode.
    pub infrared_gain: AmbientLightGain,
    pub proximity_gain: ProximityGain,
    /// Subtracted from proximity readings. At most [`MAX_PROXIMITY_OFFSET`].
    pub proximity_offset: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    /// At most [`MAX_PROXIMITY_WATERMARK`].
    pub proximity_high: u16,
    /// At most [`MAX_PROXIMITY_WATERMARK`].
    pub proximity_low: u16,
    pub ambient_light_high: u16,
    pub ambient_light_low: u16,
}

impl Thresholds {
    pub fn is_valid(&self) -> bool {
        self.proximity_high <= MAX_PROXIMITY_WATERMARK
            && self.proximity_low <= MAX_PROXIMITY_WATERMARK
    }
}

/// How a reading is compared against its watermarks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptMode {
    /// Fires above the high watermark.
    #[default]
    High = 0,
    /// Fires above the high watermark and releases below the low one.
    Hysteresis = 1,
    /// Fires outside `low..=high`.
    OutOfRange = 2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Persistence {
    /// Active at the end of every measurement.
    #[default]
    EndOfMeasurement = 0,
    /// Updated at the end of every measurement.
    UpdateEveryMeasurement = 1,
    /// Updated after two consecutive matching measurements.
    UpdateTwice = 2,
    /// Updated after more consecutive matching measurements.
    UpdatePersist = 3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptConfig {
    pub proximity: bool,
    pub ambient_light: bool,
    pub mode: InterruptMode,
    pub persistence: Persistence,
}

impl InterruptConfig {
    /// The default enables neither source, which cannot be armed.
    pub fn has_source(&self) -> bool {
        self.proximity || self.ambient_light
    }
}

/// Proximity and ambient light sensor.
///
/// When both events are pending, [`Sensor::read`] reports the proximity reading; the shared clear
/// then discards the ambient light event.
#[derive(Debug)]
pub struct Rpr0521rs<TI2c> {
    bus: RegisterBus<TI2c>,
    mode: Mode,
    thresholds: Thresholds,
    interrupt: InterruptConfig,
}

impl<TI2c> Rpr0521rs<TI2c>
where
    TI2c: I2c,
{
    pub fn new(i2c: TI2c, address: u8) -> Rpr0521rs<TI2c> {
        Rpr0521rs {
            bus: RegisterBus::new(i2c, address),
            mode: Mode::default(),
            thresholds: Thresholds::default(),
            interrupt: InterruptConfig::default(),
        }
    }

    pub fn release(self) -> TI2c {
        self.bus.release()
    }

    fn mode_value(&self) -> u8 {
        let mut mode = self.mode.rate as u8;
        if self.mode.ambient_light {
            mode |= MODE_ALS_EN;
        }
        if self.mode.proximity {
            mode |= MODE_PS_EN;
        }
        if self.mode.wide_pulse {
            mode |= MODE_PS_PULSE;
        }
        if self.mode.twice {
            mode |= MODE_PS_TWICE;
        }
        mode
    }
}

impl<TI2c> Sensor for Rpr0521rs<TI2c>
where
    TI2c: I2c,
{
    type BusError = TI2c::Error;
    type Mode = Mode;
    type Thresholds = Thresholds;
    type InterruptConfig = InterruptConfig;

    fn part_number(&self) -> &'static str {
        "RPR-0521RS"
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
        if mode.proximity_offset > MAX_PROXIMITY_OFFSET {
            log::error!("proximity offset 0x{:x} out of range", mode.proximity_offset);
            return Err(Error::InvalidConfig);
        }
        if let Some(thresholds) = thresholds {
            if !thresholds.is_valid() {
                log::error!("proximity watermarks out of range: {:?}", thresholds);
                return Err(Error::InvalidConfig);
            }
            self.thresholds = thresholds;
        }
        self.mode = mode;
        Ok(())
    }

    fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<Self::BusError>> {
        if sleep {
            self.bus.write_reg(REG_SWRST, SWRST_INT)?;
            return self.bus.write_reg(REG_MODE, 0);
        }
        let mut int = (self.interrupt.mode as u8) << INT_MODE_SHIFT;
        if self.interrupt.proximity {
            int |= INT_PS_EN;
        }
        if self.interrupt.ambient_light {
            int |= INT_ALS_EN;
        }
        self.bus.write_reg(REG_INT, int)?;
        self.bus.write_reg(
            REG_ALS_CNTL,
            ((self.mode.visible_gain as u8) << ALS_DATA0_GAIN_SHIFT)
                | ((self.mode.infrared_gain as u8) << ALS_DATA1_GAIN_SHIFT)
                | self.mode.led_current as u8,
        )?;
        self.bus.write_reg(
            REG_PS_CNTL,
            ((self.mode.proximity_gain as u8) << PS_GAIN_SHIFT)
                | self.interrupt.persistence as u8,
        )?;

        let t = &self.thresholds;
        let [als_high_l, als_high_h] = t.ambient_light_high.to_le_bytes();
        let [als_low_l, als_low_h] = t.ambient_light_low.to_le_bytes();
        self.bus
            .write_regs(REG_ALS_TH_L, &[als_high_l, als_high_h, als_low_l, als_low_h])?;
        let [ps_high_l, ps_high_h] = t.proximity_high.to_le_bytes();
        let [ps_low_l, ps_low_h] = t.proximity_low.to_le_bytes();
        self.bus
            .write_regs(REG_PS_TH_L, &[ps_high_l, ps_high_h, ps_low_l, ps_low_h])?;
        self.bus
            .write_word(REG_PS_OFFSET_L, self.mode.proximity_offset)?;

        let mode = self.mode_value();
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
            proximity: self.interrupt.proximity && int & INT_PS_STATUS != 0,
            ambient_light: self.interrupt.ambient_light && int & INT_ALS_STATUS != 0,
            ..InterruptStatus::default()
        })
    }

    fn read(&mut self, status: InterruptStatus) -> Result<Measurement, Error<Self::BusError>> {
        if status.proximity {
            let mut buffer = [0u8; 2];
            self.bus.read_regs(REG_PS_DATA_L, &mut buffer)?;
            return Ok(Measurement::Proximity(u16::from_le_bytes(buffer)));
        }
        if status.ambient_light {
            let mut buffer = [0u8; 4];
            self.bus.read_regs(REG_ALS_DATA0_L, &mut buffer)?;
            let saturate = self.mode.rate == Rate::Als20HzPs20Hz;
            return Ok(Measurement::AmbientLight {
                visible: ambient_light(u16::from_le_bytes([buffer[0], buffer[1]]), saturate),
                infrared: ambient_light(u16::from_le_bytes([buffer[2], buffer[3]]), saturate),
            });
        }
        Err(Error::NotReady)
    }

    fn clear_interrupt(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.write_reg(REG_SWRST, SWRST_INT)
    }
}

fn ambient_light(raw: u16, saturate: bool) -> u16 {
    if saturate && raw & 0x8000 != 0 {
        0x7fff
    } else {
        raw
    }
}
