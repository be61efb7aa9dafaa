use time::{Duration, OffsetDateTime};

/// Absolute UTC time.
pub type Timestamp = OffsetDateTime;

/// GPS fix.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GpsFix {
    #[default]
    NoLock,
    TwoD,
    ThreeD,
}

impl From<u32> for GpsFix {
    /// `2` and `3` are 2D and 3D lock,
    /// anything else counts as no lock.
    fn from(value: u32) -> Self {
        match value {
            2 => Self::TwoD,
            3 => Self::ThreeD,
            _ => Self::NoLock,
        }
    }
}

impl std::fmt::Display for GpsFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoLock => write!(f, "0"),
            Self::TwoD => write!(f, "2d"),
            Self::ThreeD => write!(f, "3d"),
        }
    }
}

/// Single GPS sample.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LocationSample {
    /// `None` if no `GPSU` timestamp preceded a `GPS5` record.
    pub time: Option<Timestamp>,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Altitude in meters.
    pub alt: f64,
    /// 2D speed in m/s.
    pub ground_speed: f64,
    /// 3D speed in m/s.
    pub virtual_speed: f64,
    /// Dilution of precision.
    /// Raw value (DOP x 100) for `GPS5`, scaled for `GPS9`.
    pub hdop: i32,
    pub fix: GpsFix,
}

/// Single orientation sample derived from the magnetometer.
/// Only yaw can be derived, pitch and roll are always `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeSample {
    /// Set once all payloads are decoded,
    /// `None` if there was no `GPSU` timestamp.
    pub time: Option<Timestamp>,
    /// Offset from the telemetry start time.
    pub offset_from_base: Duration,
    /// Yaw in degrees, `0.0..360.0`.
    pub yaw: Option<f64>,
    /// Pitch in degrees.
    pub pitch: Option<f64>,
    /// Roll in degrees.
    pub roll: Option<f64>,
}

impl Default for AttitudeSample {
    fn default() -> Self {
        Self {
            time: None,
            offset_from_base: Duration::ZERO,
            yaw: None,
            pitch: None,
            roll: None,
        }
    }
}
