//! Sample description atom (`stsd`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stsd`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/sample_description_atom>

use binrw::BinRead;

use crate::support::string_from_bytes;

/// Sample description atom (`stsd`).
///
/// Only the data format for the first sample description
/// is read, e.g. `gpmd` for GoPro GPMF telemetry.
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Stsd {
    _version: u8,
    _flags: [u8; 3],
    pub(crate) no_of_entries: u32,
    /// Size of the first sample description.
    _description_size: u32,
    /// Data format of the first sample description.
    pub(crate) data_format: [u8; 4],
}

impl Stsd {
    pub fn no_of_entries(&self) -> u32 {
        self.no_of_entries
    }

    pub fn data_format(&self) -> [u8; 4] {
        self.data_format
    }

    /// Data format as single-byte chars.
    pub fn data_format_str(&self) -> String {
        string_from_bytes(&self.data_format, false)
    }
}
