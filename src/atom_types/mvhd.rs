//! Movie header atom (`mvhd`).
//!
//! Location: `moov/mvhd`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/movie_header_atom>

use binrw::BinRead;

use super::HeaderTiming;

/// Movie header atom (`mvhd`).
///
/// Only the fields up to and including duration are read.
/// The movie time scale is the clock base for edit list
/// segment durations.
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Mvhd {
    pub(crate) version: u8,
    _flags: [u8; 3],
    #[br(args(version))]
    pub(crate) timing: HeaderTiming,
}

impl Mvhd {
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn timing(&self) -> &HeaderTiming {
        &self.timing
    }

    /// Movie time scale.
    pub fn time_scale(&self) -> u32 {
        self.timing.time_scale()
    }

    /// Unscaled movie duration, corresponds to the longest track.
    pub fn duration_unscaled(&self) -> u64 {
        self.timing.duration_unscaled()
    }
}
