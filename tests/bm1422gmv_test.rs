use rohm_sensors::bm1422gmv::{self, Bm1422gmv};
use rohm_sensors::{run, Error, Measurement, Never, Operation, RunConfig, RunError, Vector3};

mod fake_hal;
use fake_hal::delay::Delay;
use fake_hal::i2c::{self as fake_i2c, FakeI2c};

type TestResult = Result<(), RunError<fake_i2c::Error>>;

const REG_WHO_AM_I: u8 = 0x0f;
const REG_DATAX_L: u8 = 0x10;
const REG_STA1: u8 = 0x18;
const REG_CNTL1: u8 = 0x1b;
const REG_CNTL2: u8 = 0x1c;
const REG_CNTL3: u8 = 0x1d;
const REG_AVER: u8 = 0x40;
const REG_CNTL4: u8 = 0x5c;

fn present_device() -> FakeI2c {
    let i2c = FakeI2c::new(bm1422gmv::DEFAULT_ADDRESS);
    i2c.set_register(REG_WHO_AM_I, 0x41);
    i2c
}

fn sensor(i2c: &FakeI2c) -> Bm1422gmv<FakeI2c> {
    Bm1422gmv::new(i2c.clone(), bm1422gmv::DEFAULT_ADDRESS)
}

fn single_conversion_config() -> RunConfig<Bm1422gmv<FakeI2c>> {
    RunConfig::new(
        bm1422gmv::Mode {
            conversion: bm1422gmv::Conversion::Single,
            precision: bm1422gmv::Precision::Bits12,
            rate: bm1422gmv::Rate::Hz100,
            averaging: bm1422gmv::Averaging::X16,
            offsets: Some([0x10, 0x20, 0x30]),
        },
        bm1422gmv::InterruptConfig { active_high: true },
    )
}

#[test]
fn wrong_identity_is_not_found() {
    fake_hal::init_logging();
    let i2c = FakeI2c::new(bm1422gmv::DEFAULT_ADDRESS);

    let result = run(0, sensor(&i2c), RunConfig::default(), Delay::new(), Never);

    assert_eq!(
        result.map(|_| ()).unwrap_err(),
        RunError::new(Operation::Init, Error::NotFound)
    );
}

#[test]
fn default_wake_starts_continuous_conversion() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();

    let measurements = run(0, sensor(&i2c), RunConfig::default(), Delay::new(), Never)?;

    assert_eq!(
        i2c.writes(),
        vec![
            (REG_CNTL1, 0xc0),
            (REG_CNTL4, 0x00),
            (REG_CNTL4 + 1, 0x00),
            (REG_AVER, 0x00),
            (REG_CNTL2, 0x08),
            (REG_CNTL3, 0x40),
        ]
    );
    drop(measurements);
    Ok(())
}

#[test]
fn single_conversion_wake_writes_offsets() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();

    let measurements = run(0, sensor(&i2c), single_conversion_config(), Delay::new(), Never)?;

    assert_eq!(
        i2c.writes(),
        vec![
            (REG_CNTL1, 0x8a),
            (REG_CNTL4, 0x00),
            (REG_CNTL4 + 1, 0x00),
            (REG_AVER, 16),
            (REG_CNTL2, 0x0c),
            (0x6c, 0x10),
            (0x6d, 0x00),
            (0x72, 0x20),
            (0x73, 0x00),
            (0x78, 0x30),
            (0x79, 0x00),
            (REG_CNTL3, 0x40),
        ]
    );
    drop(measurements);
    Ok(())
}

#[test]
fn reads_field_when_data_ready() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();
    i2c.script_reads(REG_STA1, &[0x00, 0x40]);
    i2c.set_registers(REG_DATAX_L, &[0x30, 0x00, 0xe8, 0xff, 0x00, 0x00]);

    let mut measurements = run(0, sensor(&i2c), RunConfig::default(), Delay::new(), Never)?;

    assert_eq!(
        measurements.next().unwrap()?,
        Measurement::MagneticField(Vector3 {
            x: 2.0,
            y: -1.0,
            z: 0.0,
        })
    );
    assert_eq!(measurements.poller().polls(), 2);
    Ok(())
}

#[test]
fn continuous_mode_clear_touches_nothing() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();
    i2c.script_reads(REG_STA1, &[0x40, 0x40]);

    let mut measurements = run(0, sensor(&i2c), RunConfig::default(), Delay::new(), Never)?;
    measurements.next().unwrap()?;
    i2c.clear_log();
    measurements.next().unwrap()?;

    assert!(i2c.writes().is_empty());
    Ok(())
}

#[test]
fn single_mode_clear_triggers_next_conversion() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();
    i2c.script_reads(REG_STA1, &[0x40, 0x40]);

    let mut measurements = run(0, sensor(&i2c), single_conversion_config(), Delay::new(), Never)?;
    measurements.next().unwrap()?;
    i2c.clear_log();
    measurements.next().unwrap()?;

    assert_eq!(i2c.writes(), vec![(REG_CNTL3, 0x40)]);
    Ok(())
}

#[test]
fn sleep_holds_measurement_in_reset() -> TestResult {
    fake_hal::init_logging();
    let i2c = present_device();

    let measurements = run(0, sensor(&i2c), RunConfig::default(), Delay::new(), Never)?;
    i2c.clear_log();
    measurements.shutdown()?;

    assert_eq!(i2c.writes(), vec![(REG_CNTL1, 0xa0)]);
    Ok(())
}
