#![allow(dead_code)]

pub mod concurrent;
pub mod delay;
pub mod digital;
pub mod i2c;
pub mod sensor;

/// Routes the drivers' log output to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
