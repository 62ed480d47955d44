use embedded_hal::i2c::I2c;

use crate::{Error, InterruptStatus, Measurement, RegisterBus, Sensor, Vector3};

pub const DEFAULT_ADDRESS: u8 = 0x0e;

const REG_WHO_AM_I: u8 = 0x0f;
const REG_DATAX_L: u8 = 0x10;
const REG_STA1: u8 = 0x18;
const REG_CNTL1: u8 = 0x1b;
const REG_CNTL2: u8 = 0x1c;
const REG_CNTL3: u8 = 0x1d;
const REG_AVER: u8 = 0x40;
const REG_CNTL4: u8 = 0x5c;
const REG_OFFX_L: u8 = 0x6c;
const REG_OFFY_L: u8 = 0x72;
const REG_OFFZ_L: u8 = 0x78;

const WHO_AM_I_VALUE: u8 = 0x41;
const STA1_DRDY: u8 = 0x40;
const CNTL1_PC1: u8 = 0x80;
const CNTL1_OUT_BIT: u8 = 0x40;
const CNTL1_RST_LV: u8 = 0x20;
const CNTL1_ODR1: u8 = 0x10;
const CNTL1_ODR0: u8 = 0x08;
const CNTL1_FS1: u8 = 0x02;
const CNTL2_DREN: u8 = 0x08;
const CNTL2_DRP: u8 = 0x04;
const CNTL3_FORCE: u8 = 0x40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Conversion {
    #[default]
    Continuous,
    /// One conversion per trigger. Clearing the interrupt triggers the next one.
    Single,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Precision {
    Bits12,
    #[default]
    Bits14,
}

impl Precision {
    /// Counts per µT.
    pub fn scale(&self) -> f32 {
        match self {
            Precision::Bits12 => 6.0,
            Precision::Bits14 => 24.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rate {
    #[default]
    Hz10,
    Hz20,
    Hz100,
    Hz1000,
}

impl Rate {
    fn odr(&self) -> u8 {
        match self {
            Rate::Hz10 => 0,
            Rate::Hz20 => CNTL1_ODR1,
            Rate::Hz100 => CNTL1_ODR0,
            Rate::Hz1000 => CNTL1_ODR1 | CNTL1_ODR0,
        }
    }
}

/// Samples averaged per conversion. The discriminant is the AVER register value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Averaging {
    X1 = 4,
    X2 = 8,
    #[default]
    X4 = 0,
    X8 = 12,
    X16 = 16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mode {
    pub conversion: Conversion,
    pub precision: Precision,
    pub rate: Rate,
    pub averaging: Averaging,
    /// Raw X, Y, Z offset register values. `None` leaves the factory values.
    pub offsets: Option<[u16; 3]>,
}

/// DRDY pin setup. The pin is always enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptConfig {
    /// Drive DRDY high on data ready instead of low.
    pub active_high: bool,
}

/// Three-axis magnetometer.
///
/// Reading the data registers releases DRDY, so in continuous mode there is nothing to clear.
#[derive(Debug)]
pub struct Bm1422gmv<TI2c> {
    bus: RegisterBus<TI2c>,
    mode: Mode,
    interrupt: InterruptConfig,
}

impl<TI2c> Bm1422gmv<TI2c>
where
    TI2c: I2c,
{
    pub fn new(i2c: TI2c, address: u8) -> Bm1422gmv<TI2c> {
        Bm1422gmv {
            bus: RegisterBus::new(i2c, address),
            mode: Mode::default(),
            interrupt: InterruptConfig::default(),
        }
    }

    pub fn release(self) -> TI2c {
        self.bus.release()
    }
}

impl<TI2c> Sensor for Bm1422gmv<TI2c>
where
    TI2c: I2c,
{
    type BusError = TI2c::Error;
    type Mode = Mode;
    type Thresholds = ();
    type InterruptConfig = InterruptConfig;

    fn part_number(&self) -> &'static str {
        "BM1422GMV"
    }

    fn address(&self) -> u8 {
        self.bus.address()
    }

    fn init(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.verify_id(REG_WHO_AM_I, WHO_AM_I_VALUE)
    }

    fn configure(
        &mut self,
        mode: Mode,
        _thresholds: Option<()>,
    ) -> Result<(), Error<Self::BusError>> {
        self.mode = mode;
        Ok(())
    }

    /// Sleeping keeps the chip powered but holds the measurement logic in reset.
    fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<Self::BusError>> {
        if sleep {
            return self.bus.write_reg(REG_CNTL1, CNTL1_PC1 | CNTL1_RST_LV);
        }
        let mut cntl1 = CNTL1_PC1 | self.mode.rate.odr();
        if self.mode.conversion == Conversion::Single {
            cntl1 |= CNTL1_FS1;
        }
        if self.mode.precision == Precision::Bits14 {
            cntl1 |= CNTL1_OUT_BIT;
        }
        self.bus.write_reg(REG_CNTL1, cntl1)?;
        self.bus.write_word(REG_CNTL4, 0)?;
        self.bus.write_reg(REG_AVER, self.mode.averaging as u8)?;

        let mut cntl2 = CNTL2_DREN;
        if self.interrupt.active_high {
            cntl2 |= CNTL2_DRP;
        }
        self.bus.write_reg(REG_CNTL2, cntl2)?;
        if let Some([x, y, z]) = self.mode.offsets {
            self.bus.write_word(REG_OFFX_L, x)?;
            self.bus.write_word(REG_OFFY_L, y)?;
            self.bus.write_word(REG_OFFZ_L, z)?;
        }
        self.bus.write_reg(REG_CNTL3, CNTL3_FORCE)
    }

    fn arm_interrupt(&mut self, config: InterruptConfig) -> Result<(), Error<Self::BusError>> {
        self.interrupt = config;
        Ok(())
    }

    fn interrupt_status(&mut self) -> Result<InterruptStatus, Error<Self::BusError>> {
        let sta1 = self.bus.read_reg(REG_STA1)?;
        Ok(InterruptStatus {
            data_ready: sta1 & STA1_DRDY != 0,
            ..InterruptStatus::default()
        })
    }

    fn read(&mut self, _status: InterruptStatus) -> Result<Measurement, Error<Self::BusError>> {
        let mut buffer = [0u8; 6];
        self.bus.read_regs(REG_DATAX_L, &mut buffer)?;
        Ok(Measurement::MagneticField(decode(
            &buffer,
            self.mode.precision.scale(),
        )))
    }

    fn clear_interrupt(&mut self) -> Result<(), Error<Self::BusError>> {
        match self.mode.conversion {
            Conversion::Single => self.bus.write_reg(REG_CNTL3, CNTL3_FORCE),
            Conversion::Continuous => Ok(()),
        }
    }
}

fn decode(buffer: &[u8; 6], scale: f32) -> Vector3 {
    Vector3 {
        x: i16::from_le_bytes([buffer[0], buffer[1]]) as f32 / scale,
        y: i16::from_le_bytes([buffer[2], buffer[3]]) as f32 / scale,
        z: i16::from_le_bytes([buffer[4], buffer[5]]) as f32 / scale,
    }
}
