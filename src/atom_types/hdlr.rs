//! Handler reference atom (`hdlr`).
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/handler_reference_atom>

use binrw::BinRead;

use crate::support::string_from_bytes;

/// Handler reference atom (`hdlr`).
///
/// The component name that follows is not read.
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Hdlr {
    _version: u8,
    _flags: [u8; 3],
    /// `mhlr`, `dhlr`, or `[0, 0, 0, 0]` for MP4.
    pub(crate) component_type: [u8; 4],
    /// Handler type, e.g. `vide`, `soun`, `meta`.
    pub(crate) handler_type: [u8; 4],
}

impl Hdlr {
    pub fn component_type(&self) -> [u8; 4] {
        self.component_type
    }

    pub fn handler_type(&self) -> [u8; 4] {
        self.handler_type
    }

    /// Handler type as single-byte chars.
    pub fn handler_type_str(&self) -> String {
        string_from_bytes(&self.handler_type, false)
    }
}
