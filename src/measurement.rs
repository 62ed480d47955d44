use core::fmt;

/// Upper bound on the samples one accelerometer FIFO drain can return. The byte count register
/// tops out at 255, which is 42 six-byte samples.
pub const MAX_BATCH_SAMPLES: usize = 42;

/// Interrupt flags read from a device's status register.
///
/// Drivers only report the flags of sources that were armed, so any flag being set means data is
/// waiting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptStatus {
    /// A new sample is available.
    pub data_ready: bool,
    /// The high watermark was crossed.
    pub high: bool,
    /// The low watermark was crossed.
    pub low: bool,
    /// A proximity event is pending.
    pub proximity: bool,
    /// An ambient-light event is pending.
    pub ambient_light: bool,
    /// The sample buffer is full.
    pub buffer_full: bool,
    /// The sample buffer reached its watermark.
    pub watermark: bool,
}

impl InterruptStatus {
    /// Whether any flag is set.
    pub fn any(&self) -> bool {
        self.data_ready
            || self.high
            || self.low
            || self.proximity
            || self.ambient_light
            || self.buffer_full
            || self.watermark
    }
}

/// Three-axis reading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Raw channel counts from an RGBC color sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgbc {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub clear: u16,
}

/// One decoded reading.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Measurement {
    /// Color channel counts.
    Color(Rgbc),
    /// Barometric pressure in hPa.
    Pressure(f32),
    /// Accelerations in g, oldest first, as drained from the sample buffer.
    Acceleration(heapless::Vec<Vector3, MAX_BATCH_SAMPLES>),
    /// Proximity sensor counts.
    Proximity(u16),
    /// Ambient light counts for the visible and infrared photodiodes.
    AmbientLight { visible: u16, infrared: u16 },
    /// Magnetic flux density in µT.
    MagneticField(Vector3),
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Color(c) => write!(
                f,
                "R: {} G: {} B: {} C: {}",
                c.red, c.green, c.blue, c.clear
            ),
            Measurement::Pressure(hpa) => write!(f, "{:.6} hPa", hpa),
            Measurement::Acceleration(samples) => {
                for (i, sample) in samples.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "X: {:.6} Y: {:.6} Z: {:.6}", sample.x, sample.y, sample.z)?;
                }
                Ok(())
            }
            Measurement::Proximity(counts) => write!(f, "PS: {}", counts),
            Measurement::AmbientLight { visible, infrared } => {
                write!(f, "ALS: {} IR: {}", visible, infrared)
            }
            Measurement::MagneticField(v) => {
                write!(f, "X: {:.4} Y: {:.4} Z: {:.4} \u{00B5}T", v.x, v.y, v.z)
            }
        }
    }
}
