use rohm_sensors::bh1745nuc::{self, Bh1745nuc};
use rohm_sensors::{run, Error, Measurement, Never, Operation, Rgbc, RunConfig, RunError, Sensor};

mod fake_hal;
use fake_hal::delay::Delay;
use fake_hal::i2c::{self as fake_i2c, FakeI2c};

type TestResult = Result<(), RunError<fake_i2c::Error>>;

const REG_SWRST: u8 = 0x40;
const REG_MODE1: u8 = 0x41;
const REG_MODE2: u8 = 0x42;
const REG_RED_L: u8 = 0x50;
const REG_INT: u8 = 0x60;
const REG_PERSISTENCE: u8 = 0x61;
const REG_ID: u8 = 0x92;

fn present_device() -> FakeI2c {
    let i2c = FakeI2c::new(bh1745nuc::DEFAULT_ADDRESS);
    i2c.set_register(REG_ID, 0xe0);
    i2c
}

fn sensor(i2c: &FakeI2c) -> Bh1745nuc<FakeI2c> {
    Bh1745nuc::new(i2c.clone(), bh1745nuc::DEFAULT_ADDRESS)
}

fn config() -> RunConfig<Bh1745nuc<FakeI2c>> {
    RunConfig {
        mode: bh1745nuc::Mode {
            rate: bh1745nuc::Rate::Ms640,
            gain: bh1745nuc::Gain::X16,
        },
        thresholds: Some(bh1745nuc::Thresholds {
            high: 0x1234,
            low: 0x0056,
        }),
        interrupt: bh1745nuc::InterruptConfig {
            enable: true,
            ..Default::default()
        },
        poll: Default::default(),
    }
}

#[test]
fn wrong_identity_is_not_found() {
    fake_hal::init_logging();
    let i2c = FakeI2c::new(bh1745nuc::DEFAULT_ADDRESS);
    i2c.set_register(REG_ID, 0x00);

    let result = run(0, sensor(&i2c), config(), Delay::new(), Never);

    assert_eq!(
        result.map(|_| ()).unwrap_err(),
        RunError::new(Operation::Init, Error::NotFound)
    );
    assert!(i2c.writes().is_empty());
}

#[test]
fn missing_device_is_a_bus_fault() {
    fake_hal::init_logging();
    let mut sensor = Bh1745nuc::new(FakeI2c::new(0x38), bh1745nuc::DEFAULT_ADDRESS);

    assert_eq!(sensor.init(), Err(Error::BusFault(fake_i2c::Error::Nack)));
}

#[test]
fn wake_writes_cached_configuration() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();

    let measurements = run(0, sensor(&i2c), config(), Delay::new(), Never)?;

    assert_eq!(
        i2c.writes(),
        vec![
            (REG_INT, 0x0d),
            (REG_PERSISTENCE, 0x00),
            (0x62, 0x34),
            (0x63, 0x12),
            (0x64, 0x56),
            (0x65, 0x00),
            (REG_MODE1, 0x02),
            (REG_MODE2, 0x12),
        ]
    );
    drop(measurements);
    Ok(())
}

#[test]
fn reads_color_once_the_status_bit_is_set() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();
    i2c.script_reads(REG_INT, &[0x0d, 0x8d]);
    i2c.set_registers(REG_RED_L, &[0x10, 0x00, 0x20, 0x00, 0x30, 0x00, 0x40, 0x01]);

    let mut measurements = run(0, sensor(&i2c), config(), Delay::new(), Never)?;
    let measurement = measurements.next().unwrap()?;

    assert_eq!(
        measurement,
        Measurement::Color(Rgbc {
            red: 0x10,
            green: 0x20,
            blue: 0x30,
            clear: 0x140,
        })
    );
    assert_eq!(measurements.poller().polls(), 2);
    Ok(())
}

#[test]
fn shutdown_clears_then_sleeps() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();
    i2c.script_reads(REG_INT, &[0x8d]);

    let mut measurements = run(0, sensor(&i2c), config(), Delay::new(), Never)?;
    measurements.next().unwrap()?;
    i2c.clear_log();
    measurements.shutdown()?;

    assert_eq!(
        i2c.writes(),
        vec![(REG_SWRST, 0x40), (REG_SWRST, 0x40), (REG_MODE2, 0x00)]
    );
    Ok(())
}

#[test]
fn disabled_interrupt_cannot_be_armed() {
    fake_hal::init_logging();
    let i2c = present_device();
    let mut sensor = Bh1745nuc::new(i2c, bh1745nuc::DEFAULT_ADDRESS);

    assert_eq!(
        sensor.arm_interrupt(bh1745nuc::InterruptConfig::default()),
        Err(Error::InvalidConfig)
    );
}

#[test]
fn default_run_config_fails_to_arm_and_sleeps() {
    fake_hal::init_logging();
    let i2c = present_device();

    let result = run(0, sensor(&i2c), RunConfig::default(), Delay::new(), Never);

    assert_eq!(
        result.map(|_| ()).unwrap_err(),
        RunError::new(Operation::ArmInterrupt, Error::InvalidConfig)
    );
    assert_eq!(i2c.writes_to(REG_MODE2), vec![0x00]);
    assert!(i2c.writes_to(REG_INT).is_empty());
}
