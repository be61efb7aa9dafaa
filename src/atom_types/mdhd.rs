//! Media header atom (`mdhd`).
//!
//! Similar to `mvhd`,
//! but only describes a single track (`trak`).
//!
//! Location: `moov/trak/mdia/mdhd`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/media_header_atom>

use binrw::BinRead;

use super::HeaderTiming;

/// Media header atom ('mdhd'). One per track (`trak`).
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Mdhd {
    pub(crate) version: u8,
    _flags: [u8; 3],
    #[br(args(version))]
    pub(crate) timing: HeaderTiming,
    /// Packed ISO-639-2/T language code, not decoded.
    _language: u16,
    _quality: u16,
}

impl Mdhd {
    pub fn timing(&self) -> &HeaderTiming {
        &self.timing
    }

    /// Track time scale.
    pub fn time_scale(&self) -> u32 {
        self.timing.time_scale()
    }

    pub fn duration_unscaled(&self) -> u64 {
        self.timing.duration_unscaled()
    }
}
