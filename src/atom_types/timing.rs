//! Time fields shared by movie (`mvhd`) and media (`mdhd`) headers.

use binrw::BinRead;
use time::{Duration, OffsetDateTime};

use crate::consts::mp4_time_zero;

/// Creation/modification time, time scale and unscaled duration.
/// 32-bit fields for version 0, 64-bit (except time scale)
/// for version 1.
#[derive(Debug, Clone, Copy, BinRead)]
#[br(big, import(version: u8))]
pub enum HeaderTiming {
    #[br(pre_assert(version == 1))]
    Long {
        creation_time: u64,
        modification_time: u64,
        time_scale: u32,
        duration: u64,
    },
    #[br(pre_assert(version != 1))]
    Short {
        creation_time: u32,
        modification_time: u32,
        time_scale: u32,
        duration: u32,
    },
}

impl Default for HeaderTiming {
    fn default() -> Self {
        Self::Short {
            creation_time: 0,
            modification_time: 0,
            time_scale: 0,
            duration: 0,
        }
    }
}

impl HeaderTiming {
    /// Seconds since midnight, 1904-01-01 UTC
    pub fn creation_secs(&self) -> u64 {
        match self {
            Self::Long { creation_time, .. } => *creation_time,
            Self::Short { creation_time, .. } => *creation_time as u64,
        }
    }

    /// Seconds since midnight, 1904-01-01 UTC
    pub fn modification_secs(&self) -> u64 {
        match self {
            Self::Long { modification_time, .. } => *modification_time,
            Self::Short { modification_time, .. } => *modification_time as u64,
        }
    }

    /// Number of time units that pass in one second.
    pub fn time_scale(&self) -> u32 {
        match self {
            Self::Long { time_scale, .. } | Self::Short { time_scale, .. } => *time_scale,
        }
    }

    /// Unscaled duration, i.e. "ticks"
    /// that require dividing by time scale
    /// to derive a value in seconds.
    pub fn duration_unscaled(&self) -> u64 {
        match self {
            Self::Long { duration, .. } => *duration,
            Self::Short { duration, .. } => *duration as u64,
        }
    }

    /// Creation time as UTC datetime.
    /// May default to `1904-01-01 00:00:00`
    /// depending on device and settings.
    pub fn creation_time(&self) -> OffsetDateTime {
        since_mp4_time_zero(self.creation_secs())
    }

    /// Modification time as UTC datetime.
    pub fn modification_time(&self) -> OffsetDateTime {
        since_mp4_time_zero(self.modification_secs())
    }

    /// Duration in seconds. `Duration::ZERO` if time scale is 0.
    pub fn duration(&self) -> Duration {
        match self.time_scale() {
            0 => Duration::ZERO,
            ts => Duration::saturating_seconds_f64(self.duration_unscaled() as f64 / ts as f64),
        }
    }
}

/// Out of range values fall back to the epoch itself.
fn since_mp4_time_zero(secs: u64) -> OffsetDateTime {
    i64::try_from(secs).ok()
        .and_then(|secs| mp4_time_zero().checked_add(Duration::seconds(secs)))
        .unwrap_or_else(mp4_time_zero)
}
