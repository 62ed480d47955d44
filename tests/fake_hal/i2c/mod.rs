use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    Nack,
    ArbitrationLoss,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Error::ArbitrationLoss => ErrorKind::ArbitrationLoss,
        }
    }
}

#[derive(Debug)]
struct Device {
    address: u8,
    registers: [u8; 256],
    /// Values handed out, one per read, before falling back to `registers`.
    scripted: HashMap<u8, VecDeque<u8>>,
    /// Registers that keep the pointer in place during block transfers.
    fixed: HashSet<u8>,
    stride: u8,
    writes: Vec<(u8, u8)>,
    reads: Vec<u8>,
    failures: VecDeque<Error>,
}

/// One simulated register-mapped device.
///
/// The first byte of every write sets the register pointer; further bytes are stored at
/// successive registers. Reads continue from the pointer. Clones share the same device, so a test
/// can keep one to inspect what a driver did with the other.
#[derive(Clone, Debug)]
pub struct FakeI2c {
    device: Rc<RefCell<Device>>,
}

impl FakeI2c {
    pub fn new(address: u8) -> FakeI2c {
        FakeI2c {
            device: Rc::new(RefCell::new(Device {
                address,
                registers: [0; 256],
                scripted: HashMap::new(),
                fixed: HashSet::new(),
                stride: 1,
                writes: Vec::new(),
                reads: Vec::new(),
                failures: VecDeque::new(),
            })),
        }
    }

    pub fn set_register(&self, reg: u8, value: u8) {
        self.device.borrow_mut().registers[reg as usize] = value;
    }

    pub fn set_registers(&self, reg: u8, values: &[u8]) {
        for (offset, value) in values.iter().enumerate() {
            self.set_register(reg.wrapping_add(offset as u8), *value);
        }
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.device.borrow().registers[reg as usize]
    }

    /// Queues values the next reads of `reg` return, one each.
    pub fn script_reads(&self, reg: u8, values: &[u8]) {
        self.device
            .borrow_mut()
            .scripted
            .entry(reg)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Block transfers touching `reg` do not advance the pointer, like a FIFO data port.
    pub fn fix_pointer(&self, reg: u8) {
        self.device.borrow_mut().fixed.insert(reg);
    }

    /// The pointer advances by `stride` per byte, wrapping at 0xff.
    pub fn set_stride(&self, stride: u8) {
        self.device.borrow_mut().stride = stride;
    }

    /// The next transaction fails with `error`. Queued failures are used up in order.
    pub fn fail_next(&self, error: Error) {
        self.device.borrow_mut().failures.push_back(error);
    }

    /// Every register write so far, one entry per byte, in order.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.device.borrow().writes.clone()
    }

    /// Values written to `reg`, in order.
    pub fn writes_to(&self, reg: u8) -> Vec<u8> {
        self.device
            .borrow()
            .writes
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, value)| *value)
            .collect()
    }

    /// Every register read so far, one entry per byte.
    pub fn reads(&self) -> Vec<u8> {
        self.device.borrow().reads.clone()
    }

    pub fn reads_of(&self, reg: u8) -> usize {
        self.device
            .borrow()
            .reads
            .iter()
            .filter(|r| **r == reg)
            .count()
    }

    pub fn clear_log(&self) {
        let mut device = self.device.borrow_mut();
        device.writes.clear();
        device.reads.clear();
    }
}

impl Device {
    fn advance(&self, reg: u8) -> u8 {
        if self.fixed.contains(&reg) {
            reg
        } else {
            reg.wrapping_add(self.stride)
        }
    }

    fn read(&mut self, reg: u8) -> u8 {
        self.reads.push(reg);
        match self.scripted.get_mut(&reg).and_then(|queue| queue.pop_front()) {
            Some(value) => value,
            None => self.registers[reg as usize],
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        self.writes.push((reg, value));
        self.registers[reg as usize] = value;
    }
}

impl ErrorType for FakeI2c {
    type Error = Error;
}

impl I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut device = self.device.borrow_mut();
        if address != device.address {
            return Err(Error::Nack);
        }
        if let Some(error) = device.failures.pop_front() {
            return Err(error);
        }

        let mut pointer = None;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    let (first, rest) = match bytes.split_first() {
                        Some(split) => split,
                        None => continue,
                    };
                    let mut reg = *first;
                    for value in rest {
                        device.write(reg, *value);
                        reg = device.advance(reg);
                    }
                    pointer = Some(reg);
                }
                Operation::Read(buffer) => {
                    let mut reg = pointer.unwrap_or(0);
                    for byte in buffer.iter_mut() {
                        *byte = device.read(reg);
                        reg = device.advance(reg);
                    }
                    pointer = Some(reg);
                }
            }
        }
        Ok(())
    }
}
