use super::concurrent;
use super::i2c::Error as BusError;
use rohm_sensors::{CancelToken, Error, InterruptStatus, Measurement, Sensor, Vector3};
use std::collections::VecDeque;

/// A sensor that answers from a script and records every call in the named call log.
///
/// Status queries pop the script in order; once it runs out the device never becomes ready.
/// A read returns the raw triple as a magnetic field, unscaled.
pub struct FakeSensor {
    name: &'static str,
    statuses: VecDeque<Result<InterruptStatus, Error<BusError>>>,
    failures: Vec<(&'static str, Error<BusError>)>,
    raw: (i16, i16, i16),
    cancel_on_poll: Option<(usize, &'static CancelToken)>,
    polls: usize,
}

pub fn data_ready() -> InterruptStatus {
    InterruptStatus {
        data_ready: true,
        ..Default::default()
    }
}

pub fn idle() -> InterruptStatus {
    InterruptStatus::default()
}

impl FakeSensor {
    pub fn new(name: &'static str) -> FakeSensor {
        concurrent::reset_call_log(name);
        FakeSensor {
            name,
            statuses: VecDeque::new(),
            failures: Vec::new(),
            raw: (100, 200, 300),
            cancel_on_poll: None,
            polls: 0,
        }
    }

    /// Becomes ready on the `n`th status query and stays idle afterwards.
    pub fn ready_on_poll(name: &'static str, n: usize) -> FakeSensor {
        let mut sensor = FakeSensor::new(name);
        for _ in 1..n {
            sensor.push_status(idle());
        }
        sensor.push_status(data_ready());
        sensor
    }

    pub fn push_status(&mut self, status: InterruptStatus) {
        self.statuses.push_back(Ok(status));
    }

    pub fn push_status_error(&mut self, error: Error<BusError>) {
        self.statuses.push_back(Err(error));
    }

    /// The next call of `operation` fails with `error`.
    pub fn fail(&mut self, operation: &'static str, error: Error<BusError>) {
        self.failures.push((operation, error));
    }

    pub fn set_raw(&mut self, raw: (i16, i16, i16)) {
        self.raw = raw;
    }

    /// Raises `token` while answering the `n`th status query.
    pub fn cancel_on_poll(&mut self, n: usize, token: &'static CancelToken) {
        self.cancel_on_poll = Some((n, token));
    }

    fn call(&mut self, call: &str, operation: &'static str) -> Result<(), Error<BusError>> {
        concurrent::record_call(self.name, call.to_string());
        match self.failures.iter().position(|(op, _)| *op == operation) {
            Some(index) => Err(self.failures.remove(index).1),
            None => Ok(()),
        }
    }
}

impl Sensor for FakeSensor {
    type BusError = BusError;
    type Mode = ();
    type Thresholds = ();
    type InterruptConfig = ();

    fn part_number(&self) -> &'static str {
        "FAKE"
    }

    fn address(&self) -> u8 {
        0x42
    }

    fn init(&mut self) -> Result<(), Error<BusError>> {
        self.call("init", "init")
    }

    fn configure(&mut self, _mode: (), _thresholds: Option<()>) -> Result<(), Error<BusError>> {
        self.call("configure", "configure")
    }

    fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<BusError>> {
        self.call(&format!("set_sleep({})", sleep), "set_sleep")
    }

    fn arm_interrupt(&mut self, _config: ()) -> Result<(), Error<BusError>> {
        self.call("arm_interrupt", "arm_interrupt")
    }

    fn interrupt_status(&mut self) -> Result<InterruptStatus, Error<BusError>> {
        self.call("interrupt_status", "interrupt_status")?;
        self.polls += 1;
        if let Some((n, token)) = self.cancel_on_poll {
            if n == self.polls {
                token.cancel();
            }
        }
        self.statuses.pop_front().unwrap_or(Ok(idle()))
    }

    fn read(&mut self, _status: InterruptStatus) -> Result<Measurement, Error<BusError>> {
        self.call("read", "read")?;
        let (x, y, z) = self.raw;
        Ok(Measurement::MagneticField(Vector3 {
            x: x as f32,
            y: y as f32,
            z: z as f32,
        }))
    }

    fn clear_interrupt(&mut self) -> Result<(), Error<BusError>> {
        self.call("clear_interrupt", "clear_interrupt")
    }
}
