//! Drivers for interrupt-driven I2C sensors, and the loop that samples them.
//!
//! Every sensor family implements [`Sensor`]. [`run`] takes one through its whole lifecycle:
//! identity check, configuration, interrupt setup and wake-up, then one [`Measurement`] per ready
//! condition until cancelled, and back to sleep on every way out.
//!
//! ```ignore
//! let token = CancelToken::new();
//! let sensor = Bm1383glv::new(i2c, bm1383glv::DEFAULT_ADDRESS);
//! let config = RunConfig {
//!     thresholds: Some(bm1383glv::Thresholds { high: 0.0, low: 0.0 }),
//!     ..RunConfig::default()
//! };
//! for measurement in run(0, sensor, config, delay, &token)? {
//!     log::info!("{}", measurement?);
//! }
//! ```
#![no_std]

#[cfg(feature = "async")]
mod asynch;
mod bus;
mod cancel;
mod device;
mod error;
mod lifecycle;
mod measurement;
mod poller;

/// Driver for the BH1745NUC RGBC color sensor.
pub mod bh1745nuc;
/// Driver for the BM1383GLV barometric pressure sensor.
pub mod bm1383glv;
/// Driver for the BM1422GMV three-axis magnetometer.
pub mod bm1422gmv;
/// Driver for the BU9873 real-time clock.
pub mod bu9873;
/// Driver for the KX022-1020 three-axis accelerometer.
///
/// Refer to the KX022-1020 technical reference manual for the buffer and interrupt registers.
pub mod kx0221020;
/// Driver for the RPR-0521RS proximity and ambient light sensor.
pub mod rpr0521rs;

#[cfg(feature = "async")]
pub use asynch::{run_async, AsyncPoller, AsyncRun};
pub use bh1745nuc::Bh1745nuc;
pub use bm1383glv::Bm1383glv;
pub use bm1422gmv::Bm1422gmv;
pub use bu9873::{Bu9873, RtcTime};
pub use bus::RegisterBus;
pub use cancel::{CancelToken, Cancellation, Never};
pub use device::{Sensor, SensorHandle};
pub use error::{Error, Operation, RunError};
pub use kx0221020::Kx0221020;
pub use lifecycle::{run, run_with_line, Measurements, RunConfig};
pub use measurement::{InterruptStatus, Measurement, Rgbc, Vector3, MAX_BATCH_SAMPLES};
pub use poller::{
    NoLine, PollOptions, PollOutcome, PollState, Poller, DEFAULT_MAX_BUS_RETRIES,
    DEFAULT_POLL_INTERVAL, DEFAULT_POLL_OPTIONS, DEFAULT_POLL_TIMEOUT, MAX_POLL_INTERVAL,
};
pub use rpr0521rs::Rpr0521rs;
