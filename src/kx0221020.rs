use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::{Error, InterruptStatus, Measurement, RegisterBus, Sensor, Vector3, MAX_BATCH_SAMPLES};

pub const DEFAULT_ADDRESS: u8 = 0x1e;

/// The largest FIFO watermark, in samples, with 16-bit samples.
pub const MAX_WATERMARK: u8 = 41;

const REG_XOUT_L: u8 = 0x06;
const REG_WHO_AM_I: u8 = 0x0f;
const REG_INS2: u8 = 0x13;
const REG_INT_REL: u8 = 0x17;
const REG_CNTL1: u8 = 0x18;
const REG_ODCNTL: u8 = 0x1b;
const REG_INC1: u8 = 0x1c;
const REG_INC4: u8 = 0x1f;
const REG_BUF_CNTL1: u8 = 0x3a;
const REG_BUF_CNTL2: u8 = 0x3b;
const REG_BUF_STATUS_1: u8 = 0x3c;
const REG_BUF_CLEAR: u8 = 0x3e;
const REG_BUF_READ: u8 = 0x3f;

const WHO_AM_I_VALUE: u8 = 0x14;
const INS2_BFI: u8 = 0x40;
const INS2_WMI: u8 = 0x20;
const INS2_DRDY: u8 = 0x10;
const CNTL1_PC1: u8 = 0x80;
const CNTL1_RES: u8 = 0x40;
const CNTL1_DRDYE: u8 = 0x20;
const CNTL1_GSEL1: u8 = 0x10;
const CNTL1_GSEL0: u8 = 0x08;
const INC1_IEN1: u8 = 0x20;
const INC4_BFI1: u8 = 0x40;
const INC4_WMI1: u8 = 0x20;
const INC4_DRDYI1: u8 = 0x10;
const BUF_CNTL2_BFE: u8 = 0x80;
const BUF_CNTL2_BRES: u8 = 0x40;
const BUF_CNTL2_BFIE: u8 = 0x20;

const SAMPLE_BYTES: usize = 6;

/// Measurement range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    #[default]
    G2,
    G4,
    G8,
}

impl Range {
    fn gsel(&self) -> u8 {
        match self {
            Range::G2 => 0,
            Range::G4 => CNTL1_GSEL0,
            Range::G8 => CNTL1_GSEL1,
        }
    }

    /// Counts per g with 16-bit resolution.
    pub fn scale(&self) -> f32 {
        match self {
            Range::G2 => 16384.0,
            Range::G4 => 8192.0,
            Range::G8 => 4096.0,
        }
    }
}

/// Output data rate. The discriminant is the ODCNTL value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rate {
    Hz12_5 = 0,
    Hz25 = 1,
    #[default]
    Hz50 = 2,
    Hz100 = 3,
    Hz200 = 4,
    Hz400 = 5,
    Hz800 = 6,
    Hz1600 = 7,
    Hz0_781 = 8,
    Hz1_563 = 9,
    Hz3_125 = 10,
    Hz6_25 = 11,
}

impl Rate {
    pub fn hz(&self) -> f32 {
        match self {
            Rate::Hz12_5 => 12.5,
            Rate::Hz25 => 25.0,
            Rate::Hz50 => 50.0,
            Rate::Hz100 => 100.0,
            Rate::Hz200 => 200.0,
            Rate::Hz400 => 400.0,
            Rate::Hz800 => 800.0,
            Rate::Hz1600 => 1600.0,
            Rate::Hz0_781 => 0.781,
            Rate::Hz1_563 => 1.563,
            Rate::Hz3_125 => 3.125,
            Rate::Hz6_25 => 6.25,
        }
    }

    /// How long the device needs after a power-mode change: 1.2 / ODR.
    pub fn settle_time_us(&self) -> u32 {
        (1_200_000.0 / self.hz()) as u32
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mode {
    pub range: Range,
    pub rate: Rate,
}

/// FIFO watermark, in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    /// Must be in `1..=MAX_WATERMARK`.
    pub watermark: u8,
}

pub const DEFAULT_THRESHOLDS: Thresholds = Thresholds { watermark: 32 };

impl Default for Thresholds {
    fn default() -> Thresholds {
        DEFAULT_THRESHOLDS
    }
}

impl Thresholds {
    pub fn is_valid(&self) -> bool {
        (1..=MAX_WATERMARK).contains(&self.watermark)
    }
}

/// Interrupt sources routed to INT1, which is active low and latched until cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptConfig {
    pub data_ready: bool,
    pub watermark: bool,
    pub buffer_full: bool,
}

pub const DEFAULT_INTERRUPT_CONFIG: InterruptConfig = InterruptConfig {
    data_ready: true,
    watermark: true,
    buffer_full: true,
};

impl Default for InterruptConfig {
    fn default() -> InterruptConfig {
        DEFAULT_INTERRUPT_CONFIG
    }
}

impl InterruptConfig {
    pub fn has_source(&self) -> bool {
        self.data_ready || self.watermark || self.buffer_full
    }
}

/// Three-axis accelerometer with a sample buffer.
///
/// Control registers can only be written in stand-by, so the cached configuration is written
/// right before the device wakes. Every power-mode change waits 1.2 / ODR for the device to
/// settle, using `delay`.
#[derive(Debug)]
pub struct Kx0221020<TI2c, TDelay> {
    bus: RegisterBus<TI2c>,
    delay: TDelay,
    mode: Mode,
    thresholds: Thresholds,
    interrupt: InterruptConfig,
    asleep: bool,
}

impl<TI2c, TDelay> Kx0221020<TI2c, TDelay>
where
    TI2c: I2c,
    TDelay: DelayNs,
{
    pub fn new(i2c: TI2c, address: u8, delay: TDelay) -> Kx0221020<TI2c, TDelay> {
        Kx0221020 {
            bus: RegisterBus::new(i2c, address),
            delay,
            mode: Mode::default(),
            thresholds: DEFAULT_THRESHOLDS,
            interrupt: DEFAULT_INTERRUPT_CONFIG,
            asleep: true,
        }
    }

    pub fn release(self) -> (TI2c, TDelay) {
        (self.bus.release(), self.delay)
    }

    /// Writes every control register from the cache. The device must be in stand-by.
    fn write_config(&mut self) -> Result<(), Error<TI2c::Error>> {
        let mut cntl1 = CNTL1_RES | self.mode.range.gsel();
        if self.interrupt.data_ready {
            cntl1 |= CNTL1_DRDYE;
        }
        self.bus.write_reg(REG_CNTL1, cntl1)?;
        self.bus.write_reg(REG_ODCNTL, self.mode.rate as u8)?;
        self.bus.write_reg(REG_INC1, INC1_IEN1)?;

        let mut inc4 = 0;
        if self.interrupt.buffer_full {
            inc4 |= INC4_BFI1;
        }
        if self.interrupt.watermark {
            inc4 |= INC4_WMI1;
        }
        if self.interrupt.data_ready {
            inc4 |= INC4_DRDYI1;
        }
        self.bus.write_reg(REG_INC4, inc4)?;
        self.bus.write_reg(REG_BUF_CNTL1, self.thresholds.watermark)?;

        let mut buf_cntl2 = BUF_CNTL2_BFE | BUF_CNTL2_BRES;
        if self.interrupt.buffer_full {
            buf_cntl2 |= BUF_CNTL2_BFIE;
        }
        self.bus.write_reg(REG_BUF_CNTL2, buf_cntl2)?;
        self.bus.write_reg(REG_BUF_CLEAR, 0)?;
        self.bus.read_reg(REG_INT_REL)?;
        Ok(())
    }

    fn read_buffer(
        &mut self,
    ) -> Result<heapless::Vec<Vector3, MAX_BATCH_SAMPLES>, Error<TI2c::Error>> {
        let count = (self.bus.read_reg(REG_BUF_STATUS_1)? as usize / SAMPLE_BYTES)
            .min(MAX_BATCH_SAMPLES);
        let scale = self.mode.range.scale();
        if count == 0 {
            let mut raw = [0u8; SAMPLE_BYTES];
            self.bus.read_regs(REG_XOUT_L, &mut raw)?;
            return Ok(core::iter::once(decode(&raw, scale)).collect());
        }

        let mut raw = [0u8; SAMPLE_BYTES * MAX_BATCH_SAMPLES];
        let raw = &mut raw[..count * SAMPLE_BYTES];
        self.bus.read_regs(REG_BUF_READ, raw)?;
        // At most `MAX_BATCH_SAMPLES` chunks, so collecting cannot overflow the batch.
        Ok(raw
            .chunks_exact(SAMPLE_BYTES)
            .map(|chunk| {
                let mut sample = [0u8; SAMPLE_BYTES];
                sample.copy_from_slice(chunk);
                decode(&sample, scale)
            })
            .collect())
    }
}

impl<TI2c, TDelay> Sensor for Kx0221020<TI2c, TDelay>
where
    TI2c: I2c,
    TDelay: DelayNs,
{
    type BusError = TI2c::Error;
    type Mode = Mode;
    type Thresholds = Thresholds;
    type InterruptConfig = InterruptConfig;

    fn part_number(&self) -> &'static str {
        "KX022-1020"
    }

    fn address(&self) -> u8 {
        self.bus.address()
    }

    /// Checks WHO_AM_I, then sets up the 16-bit sample buffer and the latched INT1 pin in
    /// stand-by.
    fn init(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.verify_id(REG_WHO_AM_I, WHO_AM_I_VALUE)?;
        self.asleep = true;
        self.write_config()
    }

    fn configure(
        &mut self,
        mode: Mode,
        thresholds: Option<Thresholds>,
    ) -> Result<(), Error<Self::BusError>> {
        if let Some(thresholds) = thresholds {
            if !thresholds.is_valid() {
                log::error!(
                    "FIFO watermark {} outside 1..={}",
                    thresholds.watermark,
                    MAX_WATERMARK
                );
                return Err(Error::InvalidConfig);
            }
            self.thresholds = thresholds;
        }
        self.mode = mode;
        Ok(())
    }

    fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<Self::BusError>> {
        if self.asleep == sleep {
            return Ok(());
        }
        if !sleep {
            self.write_config()?;
        }
        let cntl1 = self.bus.read_reg(REG_CNTL1)?;
        let cntl1 = if sleep {
            cntl1 & !CNTL1_PC1
        } else {
            cntl1 | CNTL1_PC1
        };
        self.bus.write_reg(REG_CNTL1, cntl1)?;
        self.asleep = sleep;
        self.delay.delay_us(self.mode.rate.settle_time_us());
        Ok(())
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
        let ins2 = self.bus.read_reg(REG_INS2)?;
        Ok(InterruptStatus {
            data_ready: self.interrupt.data_ready && ins2 & INS2_DRDY != 0,
            watermark: self.interrupt.watermark && ins2 & INS2_WMI != 0,
            buffer_full: self.interrupt.buffer_full && ins2 & INS2_BFI != 0,
            ..InterruptStatus::default()
        })
    }

    /// Drains the sample buffer. With an empty buffer the current output registers are returned
    /// as a single sample.
    fn read(&mut self, _status: InterruptStatus) -> Result<Measurement, Error<Self::BusError>> {
        Ok(Measurement::Acceleration(self.read_buffer()?))
    }

    fn clear_interrupt(&mut self) -> Result<(), Error<Self::BusError>> {
        self.bus.read_reg(REG_INT_REL)?;
        Ok(())
    }
}

fn decode(raw: &[u8; SAMPLE_BYTES], scale: f32) -> Vector3 {
    Vector3 {
        x: i16::from_le_bytes([raw[0], raw[1]]) as f32 / scale,
        y: i16::from_le_bytes([raw[2], raw[3]]) as f32 / scale,
        z: i16::from_le_bytes([raw[4], raw[5]]) as f32 / scale,
    }
}
