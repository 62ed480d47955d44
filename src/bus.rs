use embedded_hal::i2c::I2c;

use crate::Error;

/// Register-level access to one device on an I2C bus.
///
/// All the supported parts use 8-bit register addresses with auto-increment on block reads.
#[derive(Debug)]
pub struct RegisterBus<TI2c> {
    i2c: TI2c,
    address: u8,
}

impl<TI2c, TBusError> RegisterBus<TI2c>
where
    TI2c: I2c<Error = TBusError>,
{
    pub fn new(i2c: TI2c, address: u8) -> RegisterBus<TI2c> {
        RegisterBus { i2c, address }
    }

    /// The 7-bit device address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Gives the I2C bus back.
    pub fn release(self) -> TI2c {
        self.i2c
    }

    pub fn read_reg(&mut self, reg: u8) -> Result<u8, Error<TBusError>> {
        let mut buffer = [0u8; 1];
        self.i2c.write_read(self.address, &[reg], &mut buffer)?;
        Ok(buffer[0])
    }

    /// Reads `buffer.len()` consecutive registers starting at `reg`.
    pub fn read_regs(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), Error<TBusError>> {
        self.i2c.write_read(self.address, &[reg], buffer)?;
        Ok(())
    }

    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<TBusError>> {
        self.i2c.write(self.address, &[reg, value])?;
        Ok(())
    }

    /// Writes a little-endian 16-bit value to `reg` and `reg + 1`.
    pub fn write_word(&mut self, reg: u8, value: u16) -> Result<(), Error<TBusError>> {
        let [low, high] = value.to_le_bytes();
        self.i2c.write(self.address, &[reg, low, high])?;
        Ok(())
    }

    /// Writes up to 8 consecutive registers starting at `reg` in one transaction.
    pub fn write_regs(&mut self, reg: u8, values: &[u8]) -> Result<(), Error<TBusError>> {
        let mut frame = [0u8; 9];
        if values.len() >= frame.len() {
            return Err(Error::InvalidConfig);
        }
        frame[0] = reg;
        frame[1..=values.len()].copy_from_slice(values);
        self.i2c.write(self.address, &frame[..=values.len()])?;
        Ok(())
    }

    /// Reads an identity register and fails with [`Error::NotFound`] if it does not hold
    /// `expected`.
    pub fn verify_id(&mut self, reg: u8, expected: u8) -> Result<(), Error<TBusError>> {
        let id = self.read_reg(reg)?;
        if id != expected {
            log::error!(
                "device 0x{:02x}: identity register 0x{:02x} reads 0x{:02x}, expected 0x{:02x}",
                self.address,
                reg,
                id,
                expected
            );
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
